use chrono::{Days, NaiveDate};
use garmin_connect_client::DownloadFormat;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use crate::error::{DownloadError, DownloadResult};

pub const DEFAULT_OUTPUT_DIR: &str = "./garmin_activities";
/// Length of the default window ending at `end_date`.
pub const DEFAULT_RANGE_DAYS: u64 = 365;

/// Resolved parameters of one run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub format: DownloadFormat,
    pub output_dir: PathBuf,
    pub limit: Option<NonZeroUsize>,
}

impl DownloadRequest {
    /// Build a request, filling in the default date window.
    ///
    /// A missing `end` means `today`; a missing `start` means one year
    /// before the end date.
    pub fn new(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        today: NaiveDate,
        format: DownloadFormat,
        output_dir: impl Into<PathBuf>,
        limit: Option<NonZeroUsize>,
    ) -> DownloadResult<Self> {
        let end_date = end.unwrap_or(today);
        let start_date = match start {
            Some(s) => s,
            None => end_date
                .checked_sub_days(Days::new(DEFAULT_RANGE_DAYS))
                .ok_or_else(|| DownloadError::Configuration("end date out of range".into()))?,
        };
        let request = Self {
            start_date,
            end_date,
            format,
            output_dir: output_dir.into(),
            limit,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> DownloadResult<()> {
        if self.start_date > self.end_date {
            return Err(DownloadError::Configuration(format!(
                "start date {} is after end date {}",
                self.start_date, self.end_date
            )));
        }
        Ok(())
    }

    /// Whether `date` falls inside the inclusive range.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}
