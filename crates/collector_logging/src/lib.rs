#![deny(missing_docs)]
//! Shared logging utilities for the collector workspace.
//!
//! This crate provides the `collector_*` logging macros used across the
//! codebase and a minimal test initializer for the global logger. Every
//! message is prefixed with the current collection round so log lines from
//! concurrently running groups can be correlated.

use std::sync::atomic::{AtomicU64, Ordering};

/// Log target used by every `collector_*` macro.
pub const TARGET: &str = "collector";

static ROUND: AtomicU64 = AtomicU64::new(0);

/// Sets the collection round number reported in log lines.
/// The scheduler calls this once at the start of every round.
pub fn set_round(round: u64) {
    ROUND.store(round, Ordering::Relaxed);
}

/// Retrieves the current collection round number.
/// Returns 0 before the first round has started.
pub fn current_round() -> u64 {
    ROUND.load(Ordering::Relaxed)
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! collector_trace {
    ($($arg:tt)*) => {{
        log::trace!(target: $crate::TARGET, "[round {}] {}", $crate::current_round(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! collector_debug {
    ($($arg:tt)*) => {{
        log::debug!(target: $crate::TARGET, "[round {}] {}", $crate::current_round(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! collector_info {
    ($($arg:tt)*) => {{
        log::info!(target: $crate::TARGET, "[round {}] {}", $crate::current_round(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! collector_warn {
    ($($arg:tt)*) => {{
        log::warn!(target: $crate::TARGET, "[round {}] {}", $crate::current_round(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! collector_error {
    ($($arg:tt)*) => {{
        log::error!(target: $crate::TARGET, "[round {}] {}", $crate::current_round(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Never,
    )]);
}
