use crate::posters::DispatchReport;
use movie_catalog_models::OutcomeTally;
use std::fmt;
use std::time::Instant;
use tracing::info;

/// Row counter for streaming table imports where the total is unknown up
/// front. Logs a progress line every `interval` rows.
pub struct RowProgress {
    label: &'static str,
    interval: usize,
    rows: usize,
    start_time: Instant,
}

impl RowProgress {
    pub fn new(label: &'static str, interval: usize) -> Self {
        Self {
            label,
            interval: interval.max(1),
            rows: 0,
            start_time: Instant::now(),
        }
    }

    /// Count one processed row and return whether a progress line was
    /// logged. `counts` is only formatted when it is.
    pub fn advance(&mut self, counts: &dyn fmt::Display) -> bool {
        self.rows += 1;
        if self.rows % self.interval != 0 {
            return false;
        }
        let elapsed = self.start_time.elapsed().as_secs_f64();
        let rate = if elapsed > 0.0 { self.rows as f64 / elapsed } else { 0.0 };
        info!(
            "{}: {} rows processed ({:.1} rows/sec) | {}",
            self.label, self.rows, rate, counts
        );
        true
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }
}

/// Receives progress from the poster dispatcher.
///
/// Called only from the dispatcher's collector loop, so implementations see
/// completions in a single, monotonically increasing sequence.
pub trait ProgressReporter: Send + Sync {
    fn start(&self, _total: usize) {}

    fn progress(&self, completed: usize, total: usize, tally: &OutcomeTally);

    fn finish(&self, _report: &DispatchReport) {}
}

/// Default reporter: progress lines through `tracing`.
pub struct TracingReporter {
    start_time: Instant,
}

impl TracingReporter {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }
}

impl Default for TracingReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for TracingReporter {
    fn start(&self, total: usize) {
        info!("Fetching posters for {} movies", total);
    }

    fn progress(&self, completed: usize, total: usize, tally: &OutcomeTally) {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        let rate = if elapsed > 0.0 { completed as f64 / elapsed } else { 0.0 };
        info!(
            "Progress: {}/{} ({:.1} items/sec) | Downloaded: {} | Skipped: {} | Missing: {} | Timeout: {} | Error: {}",
            completed, total, rate,
            tally.downloaded, tally.skipped, tally.missing, tally.timeout, tally.error
        );
    }

    fn finish(&self, report: &DispatchReport) {
        if report.interrupted {
            info!(
                "Poster fetch interrupted after {}/{} in {:.1}s",
                report.completed,
                report.total,
                report.elapsed.as_secs_f64()
            );
        } else {
            info!(
                "Poster fetch completed: {} total in {:.1}s",
                report.total,
                report.elapsed.as_secs_f64()
            );
        }
    }
}
