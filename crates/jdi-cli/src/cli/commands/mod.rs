//! CLI command handlers, one file per command.

mod completions;
mod control;
mod formats;
mod get;
mod worker;

pub use completions::run_completions;
pub use control::run_control;
pub use formats::run_formats;
pub use get::run_get;
pub use worker::run_worker;

#[cfg(test)]
pub(crate) use get::media_request;
