//! HTTP session for the Garmin Connect web service.
//!
//! [`GarminSession`] performs the SSO form login, keeps the resulting cookie
//! session and implements [`ActivityLister`](crate::ActivityLister) and
//! [`FileFetcher`](crate::FileFetcher) against the Connect proxy API.

use crate::config::{ClientConfig, Credentials};
use crate::{ActivityLister, ActivityPayload, ActivityRecord, DownloadFormat, FileFetcher, GarminError};
use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use secrecy::ExposeSecret;
use std::sync::LazyLock;
use tracing::{debug, info};

const USER_AGENT: &str = concat!("garmin-dl/", env!("CARGO_PKG_VERSION"));

static CSRF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"name="_csrf"\s+value="([^"]+)""#).expect("csrf regex is valid")
});
static TICKET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ticket=([A-Za-z0-9\-]+)").expect("ticket regex is valid"));

/// An authenticated Garmin Connect session.
///
/// Created with [`GarminSession::open`] and released with
/// [`GarminSession::close`]; nothing about the session is global.
#[derive(Debug)]
pub struct GarminSession {
    config: ClientConfig,
    client: reqwest::Client,
}

impl GarminSession {
    /// Log in and return a session ready for listing and fetching.
    pub async fn open(config: ClientConfig, credentials: &Credentials) -> Result<Self, GarminError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .build()?;
        let session = Self { config, client };
        session.login(credentials).await?;
        info!(username = %credentials.username, "garmin session opened");
        Ok(session)
    }

    /// Log out. Failures are only logged since the run is already over.
    pub async fn close(self) {
        let url = format!("{}/sso/logout", self.config.sso_url);
        match self.client.get(&url).send().await {
            Ok(resp) => debug!(status = resp.status().as_u16(), "garmin session closed"),
            Err(e) => debug!(error = %e, "logout request failed"),
        }
    }

    async fn login(&self, credentials: &Credentials) -> Result<(), GarminError> {
        let signin_url = format!("{}/sso/signin", self.config.sso_url);
        let params = self.signin_params();

        let page = self
            .execute_text(self.client.get(&signin_url).query(&params))
            .await?;
        let csrf = extract_csrf(&page).ok_or_else(|| {
            GarminError::Auth("sign-in page did not contain a CSRF token".into())
        })?;
        debug!("fetched sign-in form");

        let form = [
            ("username", credentials.username.as_str()),
            ("password", credentials.password.expose_secret()),
            ("embed", "true"),
            ("_csrf", csrf.as_str()),
        ];
        let body = self
            .execute_text(self.client.post(&signin_url).query(&params).form(&form))
            .await?;
        let ticket = extract_ticket(&body)
            .ok_or_else(|| GarminError::Auth("invalid username or password".into()))?;
        debug!("received service ticket");

        let url = format!("{}/modern/", self.config.connect_url);
        self.execute_text(self.client.get(&url).query(&[("ticket", ticket.as_str())]))
            .await?;
        Ok(())
    }

    fn signin_params(&self) -> Vec<(&'static str, String)> {
        let service = format!("{}/modern/", self.config.connect_url);
        vec![
            ("service", service.clone()),
            ("gauthHost", format!("{}/sso/embed", self.config.sso_url)),
            ("source", format!("{}/signin/", self.config.connect_url)),
            ("redirectAfterAccountLoginUrl", service.clone()),
            ("redirectAfterAccountCreationUrl", service),
            ("embedWidget", "true".into()),
        ]
    }

    fn proxy_url(&self, path: &str) -> String {
        format!("{}/modern/proxy/{}", self.config.connect_url, path)
    }

    /// Build a GET request against the Connect API.
    fn api_request(&self, url: &str) -> reqwest::RequestBuilder {
        self.client.get(url).header("NK", "NT")
    }

    async fn execute_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, GarminError> {
        let resp = request.send().await?;
        if !resp.status().is_success() {
            return Err(error_from_response(resp).await);
        }
        Ok(resp.json::<T>().await?)
    }

    async fn execute_text(&self, request: reqwest::RequestBuilder) -> Result<String, GarminError> {
        let resp = request.send().await?;
        if !resp.status().is_success() {
            return Err(error_from_response(resp).await);
        }
        Ok(resp.text().await?)
    }

    async fn execute_bytes(&self, request: reqwest::RequestBuilder) -> Result<Vec<u8>, GarminError> {
        let resp = request.send().await?;
        if !resp.status().is_success() {
            return Err(error_from_response(resp).await);
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

/// Extract error information from a failed response.
async fn error_from_response(resp: reqwest::Response) -> GarminError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    let body_snippet: String = body.chars().take(256).collect();
    GarminError::from_status(status, body_snippet)
}

fn extract_csrf(page: &str) -> Option<String> {
    CSRF_RE.captures(page).map(|c| c[1].to_string())
}

fn extract_ticket(page: &str) -> Option<String> {
    TICKET_RE.captures(page).map(|c| c[1].to_string())
}

fn export_path(activity_id: &str, format: DownloadFormat) -> String {
    match format {
        DownloadFormat::Gpx => format!("download-service/export/gpx/activity/{activity_id}"),
        DownloadFormat::Tcx => format!("download-service/export/tcx/activity/{activity_id}"),
        DownloadFormat::Fit | DownloadFormat::Original => {
            format!("download-service/files/activity/{activity_id}")
        }
    }
}

#[async_trait]
impl ActivityLister for GarminSession {
    async fn list_activities(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ActivityRecord>, GarminError> {
        let url = self.proxy_url("activitylist-service/activities/search/activities");
        let page_size = self.config.page_size.max(1);
        let mut activities = Vec::new();
        let mut offset: u32 = 0;

        loop {
            let pairs: Vec<(&str, String)> = vec![
                ("startDate", start.to_string()),
                ("endDate", end.to_string()),
                ("start", offset.to_string()),
                ("limit", page_size.to_string()),
            ];
            let page: Vec<ActivityPayload> =
                self.execute_json(self.api_request(&url).query(&pairs)).await?;
            let count = page.len();
            debug!(offset, count, "fetched activity page");
            activities.extend(page.into_iter().map(ActivityPayload::into_record));
            if count < page_size as usize {
                break;
            }
            offset += page_size;
        }

        Ok(activities)
    }
}

#[async_trait]
impl FileFetcher for GarminSession {
    async fn fetch_activity(
        &self,
        activity_id: &str,
        format: DownloadFormat,
    ) -> Result<Vec<u8>, GarminError> {
        let url = self.proxy_url(&export_path(activity_id, format));
        debug!(activity_id, %format, "fetching activity export");
        self.execute_bytes(self.api_request(&url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_csrf_reads_hidden_input() {
        let page = r#"<form><input type="hidden" name="_csrf" value="abc123DEF"/></form>"#;
        assert_eq!(extract_csrf(page).as_deref(), Some("abc123DEF"));
        assert!(extract_csrf("<form></form>").is_none());
    }

    #[test]
    fn extract_ticket_reads_service_ticket() {
        let page = r#"var response_url = "https://connect.garmin.com/modern/?ticket=ST-0123-abc-cas";"#;
        assert_eq!(extract_ticket(page).as_deref(), Some("ST-0123-abc-cas"));
        assert!(extract_ticket("Invalid sign in").is_none());
    }

    #[test]
    fn export_path_uses_original_for_fit() {
        assert_eq!(
            export_path("9", DownloadFormat::Fit),
            "download-service/files/activity/9"
        );
        assert_eq!(
            export_path("9", DownloadFormat::Tcx),
            "download-service/export/tcx/activity/9"
        );
    }
}
