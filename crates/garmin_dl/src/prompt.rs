//! Credential resolution with an injectable password prompt.

use garmin_connect_client::config::Credentials;
use secrecy::{ExposeSecret, SecretString};
use std::io;

use crate::error::{DownloadError, DownloadResult};

/// Source of a password when none was given on the command line.
pub trait PasswordPrompt {
    fn prompt_password(&self, username: &str) -> io::Result<SecretString>;
}

/// Reads the password from the controlling terminal without echo.
pub struct TerminalPrompt;

impl PasswordPrompt for TerminalPrompt {
    fn prompt_password(&self, username: &str) -> io::Result<SecretString> {
        rpassword::prompt_password(format!("Enter password for {username}: "))
            .map(|p| SecretString::new(p.into()))
    }
}

pub fn resolve_credentials(
    username: &str,
    password: Option<String>,
    prompt: &dyn PasswordPrompt,
) -> DownloadResult<Credentials> {
    if username.trim().is_empty() {
        return Err(DownloadError::Configuration("username must not be empty".into()));
    }
    let password = match password.filter(|p| !p.is_empty()) {
        Some(p) => SecretString::new(p.into()),
        None => prompt
            .prompt_password(username)
            .map_err(|e| DownloadError::Configuration(format!("could not read password: {e}")))?,
    };
    if password.expose_secret().is_empty() {
        return Err(DownloadError::Configuration("password must not be empty".into()));
    }
    Ok(Credentials::new(username.trim(), password))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct FixedPrompt {
        answer: &'static str,
        calls: Cell<u32>,
    }

    impl PasswordPrompt for FixedPrompt {
        fn prompt_password(&self, _username: &str) -> io::Result<SecretString> {
            self.calls.set(self.calls.get() + 1);
            Ok(SecretString::new(self.answer.into()))
        }
    }

    fn prompt(answer: &'static str) -> FixedPrompt {
        FixedPrompt {
            answer,
            calls: Cell::new(0),
        }
    }

    #[test]
    fn given_password_skips_prompt() {
        let p = prompt("from-prompt");
        let creds = resolve_credentials("me@example.com", Some("given".into()), &p).unwrap();
        assert_eq!(creds.password.expose_secret(), "given");
        assert_eq!(p.calls.get(), 0);
    }

    #[test]
    fn missing_password_is_prompted() {
        let p = prompt("from-prompt");
        let creds = resolve_credentials("me@example.com", None, &p).unwrap();
        assert_eq!(creds.username, "me@example.com");
        assert_eq!(creds.password.expose_secret(), "from-prompt");
        assert_eq!(p.calls.get(), 1);
    }

    #[test]
    fn empty_prompt_answer_is_rejected() {
        let res = resolve_credentials("me@example.com", None, &prompt(""));
        assert!(matches!(res, Err(DownloadError::Configuration(_))));
    }

    #[test]
    fn blank_username_is_rejected() {
        let res = resolve_credentials("  ", Some("pw".into()), &prompt("x"));
        assert!(matches!(res, Err(DownloadError::Configuration(_))));
    }
}
