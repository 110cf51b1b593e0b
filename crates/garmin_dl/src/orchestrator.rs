//! The download loop: list once, then fetch, unwrap and write each activity
//! in order, one at a time.

use garmin_connect_client::{ActivityLister, ActivityRecord, FileFetcher, GarminError};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::archive;
use crate::error::{DownloadError, DownloadResult, FailureReason};
use crate::naming::TargetName;
use crate::request::DownloadRequest;
use crate::summary::{DownloadOutcome, Progress, RunSummary};
use crate::writer;

/// Drives one run against a lister and a fetcher.
pub struct Orchestrator<'a> {
    lister: &'a dyn ActivityLister,
    fetcher: &'a dyn FileFetcher,
    progress_tx: Option<mpsc::Sender<Progress>>,
}

/// Run a download with no progress channel attached.
pub async fn run(
    request: &DownloadRequest,
    lister: &dyn ActivityLister,
    fetcher: &dyn FileFetcher,
) -> DownloadResult<RunSummary> {
    Orchestrator::new(lister, fetcher).run(request).await
}

impl<'a> Orchestrator<'a> {
    pub fn new(lister: &'a dyn ActivityLister, fetcher: &'a dyn FileFetcher) -> Self {
        Self {
            lister,
            fetcher,
            progress_tx: None,
        }
    }

    /// Send a [`Progress`] event after every processed activity.
    pub fn with_progress(mut self, tx: mpsc::Sender<Progress>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub async fn run(&self, request: &DownloadRequest) -> DownloadResult<RunSummary> {
        request.validate()?;

        info!(
            start = %request.start_date,
            end = %request.end_date,
            format = %request.format,
            "listing activities"
        );
        let listed = self
            .lister
            .list_activities(request.start_date, request.end_date)
            .await
            .map_err(DownloadError::Enumeration)?;

        let in_range: Vec<ActivityRecord> = listed
            .into_iter()
            .filter(|a| match a.start_date() {
                Some(date) if !request.contains(date) => {
                    debug!(activity_id = %a.id, %date, "dropping activity outside range");
                    false
                }
                _ => true,
            })
            .collect();

        let mut summary = RunSummary::new(request.output_dir.clone());
        summary.total_in_range = in_range.len();

        let selected: Vec<ActivityRecord> = match request.limit {
            Some(limit) => in_range.into_iter().take(limit.get()).collect(),
            None => in_range,
        };
        summary.selected = selected.len();
        info!(
            in_range = summary.total_in_range,
            selected = summary.selected,
            "activities to process"
        );

        let total = selected.len();
        for (i, activity) in selected.into_iter().enumerate() {
            let outcome = match self.process(request, &activity).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(activity_id = %activity.id, error = %e, "rate limited, stopping run");
                    summary.rate_limited = true;
                    break;
                }
            };

            metrics::counter!("garmin_dl_activities_total", "outcome" => outcome.kind())
                .increment(1);
            if let DownloadOutcome::Downloaded { bytes, .. } = &outcome {
                metrics::counter!("garmin_dl_bytes_written_total").increment(*bytes);
            }

            summary.record(activity.id.clone(), outcome.clone());
            self.notify(Progress {
                index: i + 1,
                total,
                activity_id: activity.id,
                activity_name: activity.name,
                start_date: activity.start_time.map(|t| t.date()),
                outcome,
            })
            .await;
        }

        info!(
            downloaded = summary.downloaded,
            skipped = summary.skipped,
            failed = summary.failed,
            bytes = summary.bytes_written,
            rate_limited = summary.rate_limited,
            "run finished"
        );
        Ok(summary)
    }

    /// Handle one activity. The only error is a rate limit, which ends the run.
    async fn process(
        &self,
        request: &DownloadRequest,
        activity: &ActivityRecord,
    ) -> Result<DownloadOutcome, GarminError> {
        let target = TargetName::for_activity(activity);
        if let Some(path) = target.existing_in(&request.output_dir, request.format).await {
            debug!(path = %path.display(), "already downloaded");
            return Ok(DownloadOutcome::SkippedExisting { path });
        }

        let raw = match self.fetcher.fetch_activity(&activity.id, request.format).await {
            Ok(bytes) => bytes,
            Err(e) if e.is_rate_limited() => return Err(e),
            Err(e) => {
                warn!(activity_id = %activity.id, error = %e, "fetch failed");
                return Ok(DownloadOutcome::Failed(FailureReason::from(e)));
            }
        };

        let payload = archive::prepare(request.format, raw);
        let file_name = target.file_name(request.format, &payload.extension);
        let bytes = payload.bytes.len() as u64;
        match writer::write_atomic_async(request.output_dir.clone(), file_name, payload.bytes).await
        {
            Ok(path) => Ok(DownloadOutcome::Downloaded { path, bytes }),
            Err(e) => {
                warn!(activity_id = %activity.id, error = %e, "write failed");
                Ok(DownloadOutcome::Failed(FailureReason::Write(e.to_string())))
            }
        }
    }

    async fn notify(&self, progress: Progress) {
        if let Some(tx) = &self.progress_tx {
            // A closed receiver only means nobody is watching.
            let _ = tx.send(progress).await;
        }
    }
}
