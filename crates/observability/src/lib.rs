//! Process-wide tracing/logging setup shared by the binaries.

pub mod subscriber;

pub use subscriber::LogFormat;

/// Initialize JSON logging filtered by `RUST_LOG` (default `info`).
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    subscriber::init(LogFormat::Json);
}
