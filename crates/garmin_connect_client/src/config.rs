use crate::GarminError;
use secrecy::SecretString;

pub const DEFAULT_SSO_URL: &str = "https://sso.garmin.com";
pub const DEFAULT_CONNECT_URL: &str = "https://connect.garmin.com";
pub const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub sso_url: String,
    pub connect_url: String,
    /// Activities requested per list page.
    pub page_size: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            sso_url: DEFAULT_SSO_URL.into(),
            connect_url: DEFAULT_CONNECT_URL.into(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, GarminError> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Testable helper that reads configuration values using the provided
    /// function instead of the process environment.
    pub fn from_env_with<F>(mut get: F) -> Result<Self, GarminError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let sso_url = get("GARMIN_SSO_URL").unwrap_or_else(|| DEFAULT_SSO_URL.into());
        let connect_url =
            get("GARMIN_CONNECT_URL").unwrap_or_else(|| DEFAULT_CONNECT_URL.into());
        let page_size = match get("GARMIN_PAGE_SIZE") {
            None => DEFAULT_PAGE_SIZE,
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    GarminError::Config(format!(
                        "GARMIN_PAGE_SIZE must be a positive integer, got '{raw}'"
                    ))
                })?,
        };
        Ok(Self {
            sso_url: sso_url.trim_end_matches('/').to_string(),
            connect_url: connect_url.trim_end_matches('/').to_string(),
            page_size,
        })
    }
}

/// Account credentials used for the login handshake.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}
