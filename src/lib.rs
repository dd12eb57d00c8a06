#![warn(clippy::missing_docs_in_private_items)]
#![warn(rustdoc::missing_crate_level_docs)]
#![doc = include_str!("../README.md")]

pub mod config;
pub mod diagnostics;
pub mod editor;
pub mod hook;
pub mod instr;
pub mod matcher;
pub mod patch;
pub mod patches;

/// Test utilities for enabling logging in tests
#[cfg(test)]
pub mod test_utils {
    /// Installs a `tracing` subscriber that writes through the test harness. Safe to call from
    /// every test.
    pub fn init_test_logging() {
        use tracing_subscriber::{fmt, EnvFilter};

        // already installed by another test
        let _ = fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trace")),
            )
            .with_test_writer()
            .try_init();
    }
}
