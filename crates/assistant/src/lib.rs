//! Chess assistant: turns board snapshots from a page shim into advisory
//! move suggestions.
//!
//! The pipeline is: feed (NDJSON snapshots and mutations) -> change
//! observation and stability settling (board-reader) -> session state and
//! scheduling -> advisory call -> tolerant parsing and plausibility vetting
//! -> broadcast to the rendering layer.

pub mod advisor;
pub mod config;
pub mod control;
pub mod error;
pub mod feed;
pub mod history;
pub mod parse;
pub mod scheduler;
pub mod session;

pub use config::Config;
pub use error::AssistantError;
