//! In-memory collaborators for orchestrator tests.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use garmin_connect_client::{
    ActivityLister, ActivityRecord, DownloadFormat, FileFetcher, GarminError,
};
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::Mutex;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn activity(id: &str, name: &str, day: NaiveDate) -> ActivityRecord {
    ActivityRecord {
        id: id.into(),
        name: name.into(),
        start_time: day.and_hms_opt(8, 0, 0),
        activity_type: "running".into(),
    }
}

pub fn zip_of(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        writer
            .start_file(*name, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(data.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

pub enum ListResponse {
    Activities(Vec<ActivityRecord>),
    AuthFailure,
}

pub struct FakeLister {
    response: ListResponse,
    pub calls: Mutex<u32>,
}

impl FakeLister {
    pub fn new(activities: Vec<ActivityRecord>) -> Self {
        Self {
            response: ListResponse::Activities(activities),
            calls: Mutex::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            response: ListResponse::AuthFailure,
            calls: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl ActivityLister for FakeLister {
    async fn list_activities(
        &self,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<Vec<ActivityRecord>, GarminError> {
        *self.calls.lock().unwrap() += 1;
        match &self.response {
            ListResponse::Activities(a) => Ok(a.clone()),
            ListResponse::AuthFailure => Err(GarminError::Auth("session expired".into())),
        }
    }
}

#[derive(Clone)]
pub enum FetchResponse {
    Bytes(Vec<u8>),
    NotFound,
    RateLimited,
    ServerError,
}

/// Serves canned responses per activity id; unknown ids get `default`.
pub struct FakeFetcher {
    responses: HashMap<String, FetchResponse>,
    default: FetchResponse,
    pub calls: Mutex<Vec<(String, DownloadFormat)>>,
}

impl FakeFetcher {
    pub fn serving(bytes: &[u8]) -> Self {
        Self {
            responses: HashMap::new(),
            default: FetchResponse::Bytes(bytes.to_vec()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with(mut self, id: &str, response: FetchResponse) -> Self {
        self.responses.insert(id.to_string(), response);
        self
    }

    pub fn fetched_ids(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }
}

#[async_trait]
impl FileFetcher for FakeFetcher {
    async fn fetch_activity(
        &self,
        activity_id: &str,
        format: DownloadFormat,
    ) -> Result<Vec<u8>, GarminError> {
        self.calls
            .lock()
            .unwrap()
            .push((activity_id.to_string(), format));
        let response = self
            .responses
            .get(activity_id)
            .cloned()
            .unwrap_or_else(|| self.default.clone());
        match response {
            FetchResponse::Bytes(b) => Ok(b),
            FetchResponse::NotFound => Err(GarminError::NotFound(activity_id.to_string())),
            FetchResponse::RateLimited => Err(GarminError::RateLimited("429".into())),
            FetchResponse::ServerError => Err(GarminError::Status {
                status: 500,
                body: "internal".into(),
            }),
        }
    }
}
