//! Log output for the `rekey` binary.
//!
//! Everything goes to stderr so that stdout stays free for piping. The level
//! is taken from `RUST_LOG` and defaults to `info`.

use std::io::{self, IsTerminal};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_telemetry() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_ids(true)
                .with_line_number(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                .with_ansi(io::stderr().is_terminal())
                .with_writer(io::stderr),
        )
        .try_init()?;

    Ok(())
}
