//! Tracing and logging setup shared by the binaries.

/// Initialize process-wide logging.
///
/// The format comes from `RETONE_LOG_FORMAT` (`json` by default, or
/// `pretty`); the filter from `RUST_LOG` (default `info`). Safe to call more
/// than once; later calls are no-ops.
pub fn init() {
    tracing::init(tracing::LogFormat::from_env());
}

/// Tracing configuration (filters, formats).
pub mod tracing;

pub use self::tracing::LogFormat;
