//! Shared tracing setup for the gateway binaries.

pub mod tracing;

pub use crate::tracing::LogFormat;

/// Initialize process-wide logging from `RUST_LOG` and `LOG_FORMAT`.
///
/// Safe to call multiple times; later calls are no-ops.
pub fn init() {
    tracing::init(LogFormat::from_env());
}
