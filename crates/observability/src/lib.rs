//! `balcao-observability` — process-wide logging/tracing setup.

mod tracing;

pub use tracing::init;
