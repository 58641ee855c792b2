pub mod config;
pub mod dedupe;
pub mod delta;
pub mod error;
pub mod fetch;
pub mod history;
pub mod model;
pub mod normalize;
pub mod page;
pub mod parse;
pub mod pipeline;
pub mod report;

/// Application name for XDG paths
pub const APP_NAME: &str = "streamvault";
