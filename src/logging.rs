use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install the tracing subscriber for the `bf` binary.
///
/// Does nothing unless `RUST_LOG` is set (e.g. `RUST_LOG=bf_tree=debug`).
/// Logs go to stderr so program output on stdout is untouched. Safe to call
/// more than once.
pub fn init() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_level(true),
                )
                .with(filter)
                .init();
        }
    });
}
