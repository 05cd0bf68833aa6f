//! Durations and build summaries.

use std::path::Path;
use std::time::Duration;

use webdev_live::RebuildReport;

use super::messages;

/// Format a duration as `850ms`, `1.25s` or `2m 05s`.
///
/// ```
/// use std::time::Duration;
/// use webdev_cli::ui::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(850)), "850ms");
/// assert_eq!(format_duration(Duration::from_millis(1250)), "1.25s");
/// assert_eq!(format_duration(Duration::from_secs(125)), "2m 05s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1_000 {
        format!("{millis}ms")
    } else if millis < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {:02}s", secs / 60, secs % 60)
    }
}

/// Each compile failure as an error line.
pub fn print_failures(report: &RebuildReport) {
    for failure in &report.failures {
        messages::error(&failure.to_string());
    }
}

/// Counts of written and failed stylesheets, copied resources, removed outputs.
pub fn print_build_summary(report: &RebuildReport, elapsed: Duration, classes_dir: &Path) {
    let written = report.written.len();
    let deleted = report.deleted.len();
    let summary = format!(
        "{written} stylesheet{} written to {} in {}",
        plural(written),
        classes_dir.display(),
        format_duration(elapsed)
    );

    if report.is_success() {
        messages::success(&summary);
    } else {
        messages::warning(&format!(
            "{summary}, {} failed",
            report.failures.len()
        ));
    }
    let copied = report.copied.len();
    if copied > 0 {
        messages::info(&format!("{copied} resource{} copied", plural(copied)));
    }
    if deleted > 0 {
        messages::info(&format!("{deleted} stale output{} removed", plural(deleted)));
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration_boundaries() {
        assert_eq!(format_duration(Duration::ZERO), "0ms");
        assert_eq!(format_duration(Duration::from_millis(999)), "999ms");
        assert_eq!(format_duration(Duration::from_secs(1)), "1.00s");
        assert_eq!(format_duration(Duration::from_secs(60)), "1m 00s");
    }

    #[test]
    fn test_plural() {
        assert_eq!(plural(1), "");
        assert_eq!(plural(0), "s");
        assert_eq!(plural(3), "s");
    }
}
