pub mod cli;
pub mod config;
pub mod docs;
pub mod flags;
pub mod generator;
pub mod link;

pub use config::Options;
pub use docs::{Dispatch, DocsCommand, DocsError, Outcome, Settings};
