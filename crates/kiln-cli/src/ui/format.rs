//! Formatting utilities for sizes, durations, and the bundle summary.

use std::time::Duration;

use console::Term;
use owo_colors::OwoColorize;

/// Format file size in human-readable form.
///
/// # Examples
///
/// ```
/// use kiln_cli::ui::format_size;
///
/// assert_eq!(format_size(0), "0 B");
/// assert_eq!(format_size(500), "500 B");
/// assert_eq!(format_size(1024), "1.00 KB");
/// assert_eq!(format_size(1_048_576), "1.00 MB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

/// Format a duration in human-readable form.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use kiln_cli::ui::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();

    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        let mins = secs / 60;
        let secs = secs % 60;
        format!("{}m {}s", mins, secs)
    }
}

/// Print the bundle summary table to stderr.
///
/// One row per emitted file with its size, then a total line with the
/// compilation duration.
pub fn print_build_summary(entries: &[(String, u64)], duration: Duration) {
    let term = Term::stderr();
    let width = term.size().1 as usize;

    eprintln!("\n{}", "Bundle Summary".bold().underline());
    eprintln!("{}", "─".repeat(width.min(80)));

    for (name, size) in entries {
        eprintln!(
            "  {} {} {}",
            "▸".blue(),
            name.bright_white().bold(),
            format_size(*size).dimmed()
        );
    }

    eprintln!("{}", "─".repeat(width.min(80)));

    let total_size: u64 = entries.iter().map(|(_, s)| s).sum();

    eprintln!(
        "  {} {} in {}",
        "Total:".bold(),
        format_size(total_size).green(),
        format_duration(duration).green()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_bytes() {
        assert_eq!(format_size(1), "1 B");
        assert_eq!(format_size(1023), "1023 B");
    }

    #[test]
    fn size_kilobytes() {
        assert_eq!(format_size(1024), "1.00 KB");
        assert_eq!(format_size(1536), "1.50 KB");
    }

    #[test]
    fn size_megabytes_and_up() {
        assert_eq!(format_size(1_048_576), "1.00 MB");
        assert_eq!(format_size(1_073_741_824), "1.00 GB");
    }

    #[test]
    fn duration_milliseconds() {
        assert_eq!(format_duration(Duration::from_millis(0)), "0ms");
        assert_eq!(format_duration(Duration::from_millis(999)), "999ms");
    }

    #[test]
    fn duration_seconds() {
        assert_eq!(format_duration(Duration::from_millis(1000)), "1.00s");
        assert_eq!(format_duration(Duration::from_millis(59_999)), "60.00s");
    }

    #[test]
    fn duration_minutes() {
        assert_eq!(format_duration(Duration::from_secs(60)), "1m 0s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }

    #[test]
    fn summary_table_does_not_panic() {
        print_build_summary(
            &[
                ("bundle.a1b2c3d4.min.js".to_string(), 15_234),
                ("bundle.a1b2c3d4.min.css".to_string(), 4_567),
            ],
            Duration::from_millis(450),
        );
        print_build_summary(&[], Duration::ZERO);
    }
}
