use serde::{Deserialize, Serialize};
use std::fmt;

/// Result tag of a single poster fetch attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FetchOutcome {
    Skipped,
    Downloaded,
    Missing,
    Timeout,
    Error,
}

impl FetchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchOutcome::Skipped => "skipped",
            FetchOutcome::Downloaded => "downloaded",
            FetchOutcome::Missing => "missing",
            FetchOutcome::Timeout => "timeout",
            FetchOutcome::Error => "error",
        }
    }
}

impl fmt::Display for FetchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-outcome counts for a batch of fetches.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutcomeTally {
    pub skipped: usize,
    pub downloaded: usize,
    pub missing: usize,
    pub timeout: usize,
    pub error: usize,
}

impl OutcomeTally {
    pub fn record(&mut self, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::Skipped => self.skipped += 1,
            FetchOutcome::Downloaded => self.downloaded += 1,
            FetchOutcome::Missing => self.missing += 1,
            FetchOutcome::Timeout => self.timeout += 1,
            FetchOutcome::Error => self.error += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.skipped + self.downloaded + self.missing + self.timeout + self.error
    }
}

impl FromIterator<FetchOutcome> for OutcomeTally {
    fn from_iter<I: IntoIterator<Item = FetchOutcome>>(iter: I) -> Self {
        iter.into_iter().fold(OutcomeTally::default(), |mut tally, outcome| {
            tally.record(outcome);
            tally
        })
    }
}
