//! Retried HTTP fetch of the artist page.

use std::thread;
use std::time::Duration;

use log::warn;
use ureq::Agent;

use crate::config::FetchConfig;
use crate::error::PipelineError;

/// Build the blocking HTTP agent: per-attempt timeout plus the spoofed
/// User-Agent the source requires.
pub fn build_agent(config: &FetchConfig) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
        .user_agent(config.user_agent.as_str())
        .build()
        .new_agent()
}

/// Fetch raw markup with bounded retries and a fixed inter-attempt delay.
///
/// Any non-success HTTP status or transport error is retryable. Exhausting
/// the retry budget is a terminal failure carrying the last observed
/// status/exception text; there is no partial or cached fallback.
pub fn fetch_page(agent: &Agent, url: &str, config: &FetchConfig) -> Result<String, PipelineError> {
    let mut last = String::from("no attempts made");

    for attempt in 1..=config.retries {
        match agent.get(url).call() {
            Ok(mut response) => match response.body_mut().read_to_string() {
                Ok(body) => return Ok(body),
                Err(e) => last = format!("failed to read response body: {e}"),
            },
            // Covers both transport errors and non-2xx statuses.
            Err(e) => last = e.to_string(),
        }
        warn!("fetch attempt {attempt}/{} failed: {last}", config.retries);
        if attempt < config.retries {
            thread::sleep(Duration::from_secs(config.wait_secs));
        }
    }

    Err(PipelineError::Fetch { attempts: config.retries, last })
}
