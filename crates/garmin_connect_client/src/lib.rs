//! Garmin Connect collaborators: activity listing and activity file export.
//!
//! The [`ActivityLister`] and [`FileFetcher`] traits are the narrow seams the
//! downloader depends on; [`http_client::GarminSession`] implements both on top
//! of reqwest.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod config;
pub mod http_client;
pub mod utils;

#[derive(Debug, Error)]
pub enum GarminError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("configuration error: {0}")]
    Config(String),
}

impl GarminError {
    /// Map a non-success HTTP status to the matching error kind.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => GarminError::Auth(body),
            404 => GarminError::NotFound(body),
            429 => GarminError::RateLimited(body),
            _ => GarminError::Status { status, body },
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, GarminError::RateLimited(_))
    }
}

/// Export format requested for an activity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DownloadFormat {
    Gpx,
    Tcx,
    Fit,
    Original,
}

impl DownloadFormat {
    pub const ALL: [DownloadFormat; 4] = [
        DownloadFormat::Gpx,
        DownloadFormat::Tcx,
        DownloadFormat::Fit,
        DownloadFormat::Original,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DownloadFormat::Gpx => "gpx",
            DownloadFormat::Tcx => "tcx",
            DownloadFormat::Fit => "fit",
            DownloadFormat::Original => "original",
        }
    }
}

impl fmt::Display for DownloadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DownloadFormat {
    type Err = GarminError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        DownloadFormat::ALL
            .into_iter()
            .find(|f| f.as_str() == lowered)
            .ok_or_else(|| {
                GarminError::Config(format!(
                    "unknown format '{s}', expected one of gpx, tcx, fit, original"
                ))
            })
    }
}

/// One remote activity as seen by the downloader.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivityRecord {
    pub id: String,
    pub name: String,
    /// Local start time; `None` when the service sent nothing parseable.
    pub start_time: Option<NaiveDateTime>,
    pub activity_type: String,
}

impl ActivityRecord {
    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_time.map(|t| t.date())
    }
}

/// Activity entry as returned by the activity list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ActivityPayload {
    #[serde(deserialize_with = "deserialize_id")]
    activity_id: String,
    #[serde(default)]
    activity_name: Option<String>,
    #[serde(default)]
    start_time_local: Option<String>,
    #[serde(default)]
    activity_type: Option<ActivityTypePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivityTypePayload {
    #[serde(default)]
    type_key: Option<String>,
}

impl ActivityPayload {
    /// Convert the wire shape into the record the downloader works with.
    pub(crate) fn into_record(self) -> ActivityRecord {
        let name = self
            .activity_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "Unnamed".to_string());
        let start_time = self
            .start_time_local
            .as_deref()
            .and_then(utils::parse_start_time);
        let activity_type = self
            .activity_type
            .and_then(|t| t.type_key)
            .unwrap_or_else(|| "activity".to_string());
        ActivityRecord {
            id: self.activity_id,
            name,
            start_time,
            activity_type,
        }
    }
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!(
            "expected non-empty string or number, got {other}"
        ))),
    }
}

#[async_trait]
pub trait ActivityLister: Send + Sync {
    /// List activities started within `start..=end`, most recent first.
    async fn list_activities(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ActivityRecord>, GarminError>;
}

#[async_trait]
pub trait FileFetcher: Send + Sync {
    /// Fetch the raw export bytes for one activity.
    ///
    /// `Fit` and `Original` both return the stored original, which the
    /// service usually wraps in a ZIP archive.
    async fn fetch_activity(
        &self,
        activity_id: &str,
        format: DownloadFormat,
    ) -> Result<Vec<u8>, GarminError>;
}
