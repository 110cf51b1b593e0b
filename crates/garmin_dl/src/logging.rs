use tracing_subscriber::EnvFilter;

const QUIET_DEPS: &str = "reqwest=warn,hyper=warn,hyper_util=warn";

/// Filter directive from `GARMIN_DL_LOG_LEVEL`, then `RUST_LOG`, then `info`.
pub fn log_level_from<F>(mut get: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    get("GARMIN_DL_LOG_LEVEL")
        .or_else(|| get("RUST_LOG"))
        .unwrap_or_else(|| "info".to_string())
}

pub fn build_env_filter(log_env: &str) -> EnvFilter {
    EnvFilter::try_new(format!("{log_env},{QUIET_DEPS}"))
        .unwrap_or_else(|_| EnvFilter::new(format!("info,{QUIET_DEPS}")))
}

/// Install the global subscriber. Logs go to stderr so stdout stays for
/// progress and the summary.
pub fn init() {
    let log_env = log_level_from(|k| std::env::var(k).ok());
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(build_env_filter(&log_env))
        .init();
    tracing::debug!("log filter: {}", log_env);
}
