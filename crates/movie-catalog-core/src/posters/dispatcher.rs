use crate::posters::fetcher::PosterFetcher;
use crate::progress::ProgressReporter;
use futures::stream::{self, StreamExt};
use movie_catalog_models::{EnrichmentItem, OutcomeTally};
use serde::{Serialize, Serializer};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("poster worker failed: {0}")]
    WorkerFault(#[from] JoinError),
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub total: usize,
    pub completed: usize,
    pub tally: OutcomeTally,
    pub interrupted: bool,
    #[serde(rename = "elapsed_secs", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

fn serialize_secs<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64())
}

/// Runs the fetcher over a work list on at most `worker_count` concurrent
/// tasks.
pub struct PosterDispatcher {
    fetcher: PosterFetcher,
    worker_count: usize,
    progress_interval: usize,
}

impl PosterDispatcher {
    pub fn new(fetcher: PosterFetcher, worker_count: usize, progress_interval: usize) -> Self {
        Self {
            fetcher,
            worker_count: worker_count.max(1),
            progress_interval: progress_interval.max(1),
        }
    }

    /// Fetch every item. Returns early with `interrupted = true` once
    /// `cancel` fires; tasks already running are left to finish detached.
    pub async fn run(
        &self,
        items: Vec<EnrichmentItem>,
        cancel: CancellationToken,
        reporter: &dyn ProgressReporter,
    ) -> Result<DispatchReport, DispatchError> {
        let total = items.len();
        let start = Instant::now();
        reporter.start(total);

        let fetcher = self.fetcher.clone();
        // A task is spawned only when buffer_unordered pulls the next item,
        // which happens only after a slot frees up.
        let mut results = stream::iter(items)
            .map(move |item| {
                let fetcher = fetcher.clone();
                tokio::spawn(async move {
                    let outcome = fetcher.fetch(&item).await;
                    debug!(movie_id = item.movie.movie_id, outcome = %outcome, "Poster fetch finished");
                    outcome
                })
            })
            .buffer_unordered(self.worker_count);

        let mut tally = OutcomeTally::default();
        let mut completed = 0;
        let mut interrupted = false;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    interrupted = true;
                    break;
                }
                next = results.next() => match next {
                    Some(Ok(outcome)) => {
                        completed += 1;
                        tally.record(outcome);
                        if completed % self.progress_interval == 0 || completed == total {
                            reporter.progress(completed, total, &tally);
                        }
                    }
                    Some(Err(fault)) => {
                        reporter.finish(&DispatchReport {
                            total,
                            completed,
                            tally,
                            interrupted: false,
                            elapsed: start.elapsed(),
                        });
                        return Err(DispatchError::WorkerFault(fault));
                    }
                    None => break,
                }
            }
        }

        let report = DispatchReport {
            total,
            completed,
            tally,
            interrupted,
            elapsed: start.elapsed(),
        };
        reporter.finish(&report);
        Ok(report)
    }
}
