//! Process-wide log setup for the incident recorder.

mod subscriber;

pub use subscriber::{DEFAULT_FILTER, env_filter};

/// Install the JSON `tracing` subscriber.
///
/// Filtering comes from `RUST_LOG`, falling back to [`DEFAULT_FILTER`].
/// Calling this more than once is harmless; only the first call installs.
pub fn init() {
    subscriber::install(env_filter());
}
