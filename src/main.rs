//! pin-forge CLI entry point.
//!
//! Initializes logging and delegates to the CLI module for command handling.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments first to get log_level
    let cli = pin_forge::cli::parse_cli();

    // Logs go to stderr so they stay off the stdout progress line.
    pin_forge::cli::init_tracing(&cli.log_level);

    let code = pin_forge::cli::run_with_cli(cli).await?;
    std::process::exit(code);
}
