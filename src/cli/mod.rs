mod args;
mod commands;
mod repl;
pub(crate) mod theme;
mod timeline;

pub use args::CliArgs;
pub use repl::{AppState, run_repl};
