pub mod args;
pub mod run;

pub use args::{CaptureArgs, CliError};
pub use run::run_capture_cli;
