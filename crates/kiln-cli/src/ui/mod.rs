//! Terminal UI utilities for status messages and formatted output.
//!
//! Handles environment detection (CI, TTY) and degrades gracefully when
//! terminal features aren't available. All user-facing status output goes to
//! stderr; stdout is reserved for the command listing.

mod format;
mod messages;

pub use format::{format_duration, format_size, print_build_summary};
pub use messages::{error, info, success, warning};

/// Check if running in a CI environment.
///
/// Detects common CI environment variables from GitHub Actions, GitLab CI,
/// CircleCI, and Travis CI.
pub fn is_ci() -> bool {
    std::env::var("CI").is_ok()
        || std::env::var("GITHUB_ACTIONS").is_ok()
        || std::env::var("GITLAB_CI").is_ok()
        || std::env::var("CIRCLECI").is_ok()
        || std::env::var("TRAVIS").is_ok()
}

/// Check if color output should be enabled.
///
/// Respects NO_COLOR and FORCE_COLOR environment variables; CI logs get
/// plain text unless forced; otherwise falls back to terminal capability
/// detection.
pub fn should_use_color() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    if is_ci() {
        return false;
    }

    console::user_attended_stderr()
}

/// Initialize color support based on environment.
///
/// Should be called early in the application lifecycle. `owo-colors`
/// respects NO_COLOR and terminal capabilities on its own; this hook exists
/// for explicit initialization and future extension.
pub fn init_colors() {
    let _ = should_use_color();
}
