//! Per-activity outcomes, progress events and the end-of-run summary.

use chrono::NaiveDate;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::FailureReason;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DownloadOutcome {
    Downloaded { path: PathBuf, bytes: u64 },
    SkippedExisting { path: PathBuf },
    Failed(FailureReason),
}

impl DownloadOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            DownloadOutcome::Downloaded { .. } => "downloaded",
            DownloadOutcome::SkippedExisting { .. } => "skipped",
            DownloadOutcome::Failed(_) => "failed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivityOutcome {
    pub activity_id: String,
    pub outcome: DownloadOutcome,
}

/// Emitted after each processed activity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Progress {
    pub index: usize,
    pub total: usize,
    pub activity_id: String,
    pub activity_name: String,
    pub start_date: Option<NaiveDate>,
    pub outcome: DownloadOutcome,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}] ", self.index, self.total)?;
        match &self.outcome {
            DownloadOutcome::Downloaded { path, bytes } => {
                let date = self
                    .start_date
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "unknown date".into());
                write!(
                    f,
                    "Downloaded: {} ({}) -> {} ({} bytes)",
                    self.activity_name,
                    date,
                    file_name(path),
                    bytes
                )
            }
            DownloadOutcome::SkippedExisting { path } => {
                write!(f, "Skipping (already exists): {}", file_name(path))
            }
            DownloadOutcome::Failed(reason) => write!(
                f,
                "Error downloading activity {} ({}): {}",
                self.activity_id, self.activity_name, reason
            ),
        }
    }
}

/// Aggregate result of one run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub output_dir: PathBuf,
    /// Activities in range before the limit was applied.
    pub total_in_range: usize,
    /// Activities selected for processing after the limit.
    pub selected: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub bytes_written: u64,
    /// Set when the service rate-limited the run and it stopped early.
    pub rate_limited: bool,
    pub outcomes: Vec<ActivityOutcome>,
}

impl RunSummary {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    pub fn record(&mut self, activity_id: impl Into<String>, outcome: DownloadOutcome) {
        match &outcome {
            DownloadOutcome::Downloaded { bytes, .. } => {
                self.downloaded += 1;
                self.bytes_written += bytes;
            }
            DownloadOutcome::SkippedExisting { .. } => self.skipped += 1,
            DownloadOutcome::Failed(_) => self.failed += 1,
        }
        self.outcomes.push(ActivityOutcome {
            activity_id: activity_id.into(),
            outcome,
        });
    }

    pub fn processed(&self) -> usize {
        self.outcomes.len()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        writeln!(f, "{rule}")?;
        writeln!(f, "Download Summary:")?;
        writeln!(f, "  Total activities: {}", self.selected)?;
        writeln!(f, "  Successfully downloaded: {}", self.downloaded)?;
        writeln!(f, "  Skipped (already exist): {}", self.skipped)?;
        writeln!(f, "  Errors: {}", self.failed)?;
        writeln!(f, "  Bytes written: {}", self.bytes_written)?;
        if self.rate_limited {
            writeln!(
                f,
                "  Download limit reached: stopped after {} of {} activities",
                self.processed(),
                self.selected
            )?;
        }
        writeln!(f, "  Output directory: {}", self.output_dir.display())?;
        write!(f, "{rule}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_counts_each_kind() {
        let mut s = RunSummary::new("out");
        s.record(
            "1",
            DownloadOutcome::Downloaded {
                path: "out/a.gpx".into(),
                bytes: 10,
            },
        );
        s.record(
            "2",
            DownloadOutcome::Downloaded {
                path: "out/b.gpx".into(),
                bytes: 5,
            },
        );
        s.record(
            "3",
            DownloadOutcome::SkippedExisting {
                path: "out/c.gpx".into(),
            },
        );
        s.record("4", DownloadOutcome::Failed(FailureReason::NotFound("x".into())));
        assert_eq!((s.downloaded, s.skipped, s.failed), (2, 1, 1));
        assert_eq!(s.bytes_written, 15);
        assert_eq!(s.processed(), 4);
        assert_eq!(s.outcomes[3].activity_id, "4");
    }

    #[test]
    fn display_mentions_rate_limit_only_when_set() {
        let mut s = RunSummary::new("out");
        s.selected = 3;
        assert!(!s.to_string().contains("Download limit reached"));
        s.rate_limited = true;
        let text = s.to_string();
        assert!(text.contains("Download limit reached: stopped after 0 of 3"));
        assert!(text.contains("Errors: 0"));
    }

    #[test]
    fn progress_line_shows_index_and_file() {
        let p = Progress {
            index: 2,
            total: 5,
            activity_id: "77".into(),
            activity_name: "Morning Run".into(),
            start_date: NaiveDate::from_ymd_opt(2023, 1, 20),
            outcome: DownloadOutcome::SkippedExisting {
                path: "/tmp/out/20230120_77_Morning_Run.gpx".into(),
            },
        };
        assert_eq!(
            p.to_string(),
            "[2/5] Skipping (already exists): 20230120_77_Morning_Run.gpx"
        );
    }
}
