use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use garmin_connect_client::config::ClientConfig;
use garmin_connect_client::http_client::GarminSession;
use tokio::sync::mpsc;

use garmin_dl::cli::Cli;
use garmin_dl::prompt::{self, TerminalPrompt};
use garmin_dl::{DownloadError, Orchestrator, Progress, RunSummary, logging};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init();

    let output_dir = cli.output.clone();
    match run(cli).await {
        Ok(summary) => {
            println!("\n{summary}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("\n{}", RunSummary::new(output_dir));
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<RunSummary> {
    let today = chrono::Local::now().date_naive();
    let request = cli.download_request(today)?;

    tokio::fs::create_dir_all(&request.output_dir)
        .await
        .map_err(|e| {
            DownloadError::Configuration(format!(
                "cannot create output directory {}: {e}",
                request.output_dir.display()
            ))
        })?;

    let credentials = prompt::resolve_credentials(&cli.username, cli.password, &TerminalPrompt)?;
    let config = ClientConfig::from_env().context("reading client configuration")?;

    println!("Logging into Garmin Connect as {}...", credentials.username);
    let session = GarminSession::open(config, &credentials)
        .await
        .map_err(DownloadError::Session)?;
    println!("Login successful!\n");
    println!(
        "Fetching activities from {} to {}...",
        request.start_date, request.end_date
    );

    let (tx, rx) = mpsc::channel::<Progress>(64);
    let printer = tokio::spawn(print_progress(rx));
    let result = {
        let orchestrator = Orchestrator::new(&session, &session).with_progress(tx);
        orchestrator.run(&request).await
    };
    let _ = printer.await;
    session.close().await;

    let summary = result?;
    if summary.total_in_range == 0 {
        println!("No activities found in the specified date range.");
    }
    if summary.rate_limited {
        println!("Download limit reached; run again later to continue where this run stopped.");
    }
    Ok(summary)
}

async fn print_progress(mut rx: mpsc::Receiver<Progress>) {
    while let Some(progress) = rx.recv().await {
        println!("{progress}");
    }
}
