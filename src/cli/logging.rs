//! Tracing setup for the binary.

use std::io::{self, IsTerminal};

use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the global subscriber on stderr.
///
/// Priority: `RUST_LOG` env var > `log_level` (the `--log-level` flag).
/// Colors only when stderr is a terminal.
pub fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    log_subscriber(filter, io::stderr, io::stderr().is_terminal()).init();
}

fn log_subscriber<W>(
    filter: EnvFilter,
    writer: W,
    ansi: bool,
) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(ansi))
        .with(filter)
}
