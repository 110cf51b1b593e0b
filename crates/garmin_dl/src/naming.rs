//! Output filename convention: `{YYYYMMDD}_{activityId}_{sanitizedName}.{extension}`.
//!
//! `original` downloads live under `{stem}.original.{extension}` so they never
//! share a name with a `gpx`, `tcx` or `fit` download of the same activity.

use garmin_connect_client::{ActivityRecord, DownloadFormat};
use std::path::{Path, PathBuf};
use tracing::warn;

const UNKNOWN_DATE: &str = "unknown_date";
const ORIGINAL_MARKER: &str = "original";

/// Replace every character that is not alphanumeric, `-` or `_` with `_`,
/// collapse repeated underscores and trim them from both ends.
pub fn sanitize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let c = if c.is_alphanumeric() || c == '-' { c } else { '_' };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "Unnamed".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Extension used before any archive has been looked at.
pub fn default_extension(format: DownloadFormat) -> &'static str {
    match format {
        DownloadFormat::Gpx => "gpx",
        DownloadFormat::Tcx => "tcx",
        DownloadFormat::Fit => "fit",
        DownloadFormat::Original => "zip",
    }
}


/// Deterministic name of one activity's output file, minus the extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetName {
    stem: String,
}

impl TargetName {
    pub fn for_activity(activity: &ActivityRecord) -> Self {
        let date = activity
            .start_date()
            .map(|d| d.format("%Y%m%d").to_string())
            .unwrap_or_else(|| UNKNOWN_DATE.to_string());
        Self {
            stem: format!("{}_{}_{}", date, activity.id, sanitize_name(&activity.name)),
        }
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// File name for a download of `format` whose content carries `extension`.
    pub fn file_name(&self, format: DownloadFormat, extension: &str) -> String {
        match format {
            DownloadFormat::Original => {
                format!("{}.{}.{}", self.stem, ORIGINAL_MARKER, extension)
            }
            _ => format!("{}.{}", self.stem, extension),
        }
    }

    /// Already-downloaded file for this activity and `format` in `dir`, if any.
    ///
    /// An unreadable path or directory counts as absent; the error is logged.
    pub async fn existing_in(&self, dir: &Path, format: DownloadFormat) -> Option<PathBuf> {
        match format {
            DownloadFormat::Original => self.existing_original_in(dir).await,
            _ => {
                let path = dir.join(self.file_name(format, default_extension(format)));
                match tokio::fs::try_exists(&path).await {
                    Ok(true) => Some(path),
                    Ok(false) => None,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "could not check for existing file");
                        None
                    }
                }
            }
        }
    }

    /// The extension of an unwrapped `original` is only known after fetching,
    /// so look for any `{stem}.original.{ext}` entry.
    async fn existing_original_in(&self, dir: &Path) -> Option<PathBuf> {
        let prefix = format!("{}.{}.", self.stem, ORIGINAL_MARKER);
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "could not scan output directory");
                return None;
            }
        };
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let name = entry.file_name();
                    let Some(name) = name.to_str() else { continue };
                    let matches = name
                        .strip_prefix(&prefix)
                        .is_some_and(|ext| !ext.is_empty() && !ext.contains('.'));
                    if matches {
                        return Some(entry.path());
                    }
                }
                Ok(None) => return None,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "could not scan output directory");
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(id: &str, name: &str, date: Option<(i32, u32, u32)>) -> ActivityRecord {
        ActivityRecord {
            id: id.into(),
            name: name.into(),
            start_time: date.map(|(y, m, d)| {
                NaiveDate::from_ymd_opt(y, m, d)
                    .unwrap()
                    .and_hms_opt(7, 30, 0)
                    .unwrap()
            }),
            activity_type: "running".into(),
        }
    }

    #[test]
    fn sanitize_replaces_whitespace_and_unsafe_chars() {
        assert_eq!(sanitize_name("Morning Run"), "Morning_Run");
        assert_eq!(sanitize_name("a/b\\c:d*e?f"), "a_b_c_d_e_f");
        assert_eq!(sanitize_name("  Hill   repeats!! "), "Hill_repeats");
        assert_eq!(sanitize_name("Zürich - Lauf"), "Zürich_-_Lauf");
    }

    #[test]
    fn sanitize_empty_falls_back() {
        assert_eq!(sanitize_name(""), "Unnamed");
        assert_eq!(sanitize_name("///"), "Unnamed");
    }

    #[test]
    fn file_name_follows_convention() {
        let name = TargetName::for_activity(&record("123", "Evening Ride", Some((2023, 1, 5))));
        assert_eq!(
            name.file_name(DownloadFormat::Gpx, "gpx"),
            "20230105_123_Evening_Ride.gpx"
        );
    }

    #[test]
    fn file_name_without_start_time_uses_unknown_date() {
        let name = TargetName::for_activity(&record("9", "Swim", None));
        assert_eq!(name.stem(), "unknown_date_9_Swim");
    }

    #[test]
    fn file_name_is_deterministic() {
        let a = record("55", "Long Run", Some((2024, 6, 1)));
        let first = TargetName::for_activity(&a)
            .file_name(DownloadFormat::Tcx, default_extension(DownloadFormat::Tcx));
        let second = TargetName::for_activity(&a.clone()).file_name(DownloadFormat::Tcx, "tcx");
        assert_eq!(first, second);
    }

    #[test]
    fn original_names_cannot_collide_with_other_formats() {
        let name = TargetName::for_activity(&record("7", "Run", Some((2023, 1, 1))));
        assert_eq!(
            name.file_name(DownloadFormat::Original, "fit"),
            "20230101_7_Run.original.fit"
        );
        assert_eq!(name.file_name(DownloadFormat::Fit, "fit"), "20230101_7_Run.fit");
        assert_ne!(
            name.file_name(DownloadFormat::Original, "gpx"),
            name.file_name(DownloadFormat::Gpx, "gpx")
        );
    }

    #[tokio::test]
    async fn existing_in_finds_unwrapped_original_of_any_extension() {
        let dir = tempfile::tempdir().unwrap();
        let name = TargetName::for_activity(&record("1", "Run", Some((2023, 1, 1))));
        assert!(name.existing_in(dir.path(), DownloadFormat::Original).await.is_none());

        std::fs::write(dir.path().join("20230101_1_Run.original.kml"), b"kml").unwrap();
        let found = name.existing_in(dir.path(), DownloadFormat::Original).await;
        assert_eq!(found, Some(dir.path().join("20230101_1_Run.original.kml")));
        assert!(name.existing_in(dir.path(), DownloadFormat::Gpx).await.is_none());
    }

    #[tokio::test]
    async fn other_formats_do_not_satisfy_original() {
        let dir = tempfile::tempdir().unwrap();
        let name = TargetName::for_activity(&record("1", "Run", Some((2023, 1, 1))));
        for file in ["20230101_1_Run.gpx", "20230101_1_Run.fit", "20230101_1_Run.tcx"] {
            std::fs::write(dir.path().join(file), b"x").unwrap();
        }
        // A different activity whose stem extends this one.
        std::fs::write(dir.path().join("20230101_1_Run_2.original.fit"), b"x").unwrap();

        assert!(name.existing_in(dir.path(), DownloadFormat::Original).await.is_none());
        assert_eq!(
            name.existing_in(dir.path(), DownloadFormat::Fit).await,
            Some(dir.path().join("20230101_1_Run.fit"))
        );
    }

    #[tokio::test]
    async fn missing_output_dir_counts_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let name = TargetName::for_activity(&record("1", "Run", Some((2023, 1, 1))));
        assert!(name.existing_in(&missing, DownloadFormat::Original).await.is_none());
        assert!(name.existing_in(&missing, DownloadFormat::Tcx).await.is_none());
    }
}
