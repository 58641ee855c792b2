use thiserror::Error;

/// Terminal pipeline failures. Per-row parse problems are recovered inline
/// (the row is dropped) and never surface here.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Every fetch attempt was exhausted. Carries the last observed HTTP
    /// status or transport error text.
    #[error("fetch failed after {attempts} attempts: {last}")]
    Fetch { attempts: u32, last: String },

    /// The page no longer contains a table matching the expected header set.
    /// Expected to happen on a source redesign — must stay distinguishable
    /// from a crash so callers can abort gracefully.
    #[error("no track stats table found in page (source layout may have changed)")]
    TableNotFound,

    /// Reading or writing an on-disk artifact failed. The run aborts before
    /// the total-history record is mutated.
    #[error("artifact persistence failed: {0}")]
    Persist(anyhow::Error),
}
