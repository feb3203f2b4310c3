//! Command-line interface for pin-forge.
//!
//! Turns flags and interactive answers into a validated search configuration,
//! runs the search and prints the summary.

mod commands;
mod logging;
mod prompt;

pub use commands::{
    build_config, exit_code, parse_cli, render_banner, render_summary, run_with_cli,
    write_summary, Cli,
};
pub use logging::init_tracing;
pub use prompt::resolve_host_port;
