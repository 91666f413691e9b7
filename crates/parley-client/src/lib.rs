pub mod commands;
pub mod config;
pub mod conversation;
pub mod error;
pub mod events;
pub mod responder;
pub mod session;
pub mod state;

use tracing_subscriber::{fmt, EnvFilter};

pub use config::ClientConfig;
pub use error::ClientError;
pub use state::{AppState, SharedState};

/// Install the global tracing subscriber.  `RUST_LOG` overrides the default
/// filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("parley_client=debug,parley_store=info,warn")
    });

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}
