use chrono::NaiveDate;
use clap::Parser;
use garmin_connect_client::DownloadFormat;
use garmin_connect_client::utils::parse_date;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use crate::error::DownloadResult;
use crate::request::{DEFAULT_OUTPUT_DIR, DownloadRequest};

const EXAMPLES: &str = "\
Examples:
  # Download the last year of activities as GPX
  garmin-dl -u your@email.com

  # Download to a specific folder
  garmin-dl -u your@email.com -o ./garmin_activities

  # Download activities within a date range
  garmin-dl -u your@email.com -s 2024-01-01 -e 2024-12-31

  # Download original FIT files, newest 10 only
  garmin-dl -u your@email.com -f fit -l 10";

/// Download activities from Garmin Connect
#[derive(Parser, Debug)]
#[command(author, version, about, after_help = EXAMPLES)]
pub struct Cli {
    /// Garmin Connect username (email)
    #[arg(short, long)]
    pub username: String,

    /// Garmin Connect password (prompted for if not provided)
    #[arg(short, long, env = "GARMIN_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Output directory for downloaded files
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output: PathBuf,

    /// Start date for activities (YYYY-MM-DD) [default: one year before the end date]
    #[arg(short, long, value_parser = parse_date_arg)]
    pub start_date: Option<NaiveDate>,

    /// End date for activities (YYYY-MM-DD) [default: today]
    #[arg(short, long, value_parser = parse_date_arg)]
    pub end_date: Option<NaiveDate>,

    /// File format to download: gpx, tcx, fit or original
    #[arg(short, long, default_value = "gpx", value_parser = parse_format_arg)]
    pub format: DownloadFormat,

    /// Maximum number of activities to download, newest first
    #[arg(short, long, value_parser = parse_limit_arg)]
    pub limit: Option<NonZeroUsize>,
}

impl Cli {
    pub fn download_request(&self, today: NaiveDate) -> DownloadResult<DownloadRequest> {
        DownloadRequest::new(
            self.start_date,
            self.end_date,
            today,
            self.format,
            self.output.clone(),
            self.limit,
        )
    }
}

fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    parse_date(s).ok_or_else(|| format!("invalid date format: {s}. Use YYYY-MM-DD"))
}

fn parse_format_arg(s: &str) -> Result<DownloadFormat, String> {
    s.parse::<DownloadFormat>().map_err(|e| e.to_string())
}

fn parse_limit_arg(s: &str) -> Result<NonZeroUsize, String> {
    s.parse::<NonZeroUsize>()
        .map_err(|_| format!("limit must be a positive integer, got '{s}'"))
}
