//! The `run_info` block of the run report.

use chrono::{DateTime, Local};
use report_doc::{DocError, ReportBuilder};
use std::time::Duration;

/// Elapsed time split into calendar units, each below its unit boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Breakdown {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl Breakdown {
    /// Whole seconds only; the fractional part is dropped.
    pub fn from_duration(elapsed: Duration) -> Self {
        let total = elapsed.as_secs();
        let days = total / 86_400;
        let rest = total % 86_400;
        Self {
            days,
            hours: rest / 3_600,
            minutes: rest % 3_600 / 60,
            seconds: rest % 60,
        }
    }
}

impl std::fmt::Display for Breakdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.days > 0 {
            write!(f, "{}d ", self.days)?;
        }
        write!(f, "{:02}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}

/// Append `run_info` to the current node of `builder`.
///
/// ```text
/// <run_info days=".." hours=".." minutes=".." seconds="..">
///   <date>YYYY-MM-DD</date>
///   <time>HH:MM:SS</time>
///   <annotate>..</annotate>
/// </run_info>
/// ```
pub fn write_run_info(
    builder: &mut ReportBuilder,
    started: &DateTime<Local>,
    elapsed: Duration,
    annotate: Option<&str>,
) -> Result<(), DocError> {
    let b = Breakdown::from_duration(elapsed);
    builder.open_block_with(
        "run_info",
        [
            ("days", b.days.to_string()),
            ("hours", b.hours.to_string()),
            ("minutes", b.minutes.to_string()),
            ("seconds", b.seconds.to_string()),
        ],
    )?;
    builder.tagged_value("date", started.format("%Y-%m-%d").to_string())?;
    builder.tagged_value("time", started.format("%H:%M:%S").to_string())?;
    if let Some(note) = annotate.filter(|a| !a.is_empty()) {
        builder.tagged_value("annotate", note)?;
    }
    builder.close_block()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_breakdown() {
        let b = Breakdown::from_duration(Duration::from_secs(90_061));
        assert_eq!(
            b,
            Breakdown {
                days: 1,
                hours: 1,
                minutes: 1,
                seconds: 1
            }
        );
        assert_eq!(b.to_string(), "1d 01:01:01");

        let b = Breakdown::from_duration(Duration::from_millis(3_599_999));
        assert_eq!((b.days, b.hours, b.minutes, b.seconds), (0, 0, 59, 59));

        let b = Breakdown::from_duration(Duration::from_secs(86_400));
        assert_eq!((b.days, b.hours, b.minutes, b.seconds), (1, 0, 0, 0));
    }

    #[test]
    fn test_units_never_overflow() {
        for secs in (0..200_000).step_by(997) {
            let b = Breakdown::from_duration(Duration::from_secs(secs));
            assert!(b.hours < 24 && b.minutes < 60 && b.seconds < 60);
            assert_eq!(
                b.days * 86_400 + b.hours * 3_600 + b.minutes * 60 + b.seconds,
                secs
            );
        }
    }

    #[test]
    fn test_run_info_block() {
        let started = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 3).unwrap();
        let mut builder = ReportBuilder::new();
        builder
            .new_document("loadeval", [("version", "test")])
            .unwrap();
        write_run_info(&mut builder, &started, Duration::from_secs(3_725), Some("rt kernel")).unwrap();
        builder.close().unwrap();

        let root = builder.document().unwrap();
        let info = root.find("run_info").unwrap();
        assert_eq!(info.attribute("days"), Some("0"));
        assert_eq!(info.attribute("hours"), Some("1"));
        assert_eq!(info.attribute("minutes"), Some("2"));
        assert_eq!(info.attribute("seconds"), Some("5"));
        assert_eq!(info.find("date").unwrap().text(), Some("2024-03-09"));
        assert_eq!(info.find("time").unwrap().text(), Some("07:05:03"));
        assert_eq!(info.find("annotate").unwrap().text(), Some("rt kernel"));
    }

    #[test]
    fn test_annotate_is_optional() {
        let started = Local.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut builder = ReportBuilder::new();
        builder.new_document("loadeval", [("version", "test")]).unwrap();
        write_run_info(&mut builder, &started, Duration::ZERO, None).unwrap();
        builder.close().unwrap();
        let info = builder.document().unwrap().find("run_info").unwrap();
        assert!(info.find("annotate").is_none());
        assert_eq!(info.children().len(), 2);
    }
}
