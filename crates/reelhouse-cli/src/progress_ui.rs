use crate::output::Output;
use indicatif::{ProgressBar, ProgressStyle};
use movie_catalog_core::{DispatchReport, ProgressReporter, TracingReporter};
use movie_catalog_models::OutcomeTally;
use std::io::IsTerminal;

/// Progress bar for the poster stage.
pub struct PosterProgressBar {
    bar: ProgressBar,
}

impl PosterProgressBar {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ");
        bar.set_style(style);
        Self { bar }
    }
}

impl ProgressReporter for PosterProgressBar {
    fn start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_message("Fetching posters...");
    }

    fn progress(&self, completed: usize, _total: usize, tally: &OutcomeTally) {
        self.bar.set_position(completed as u64);
        self.bar.set_message(format!(
            "downloaded {} | skipped {} | missing {} | timeout {} | error {}",
            tally.downloaded, tally.skipped, tally.missing, tally.timeout, tally.error
        ));
    }

    fn finish(&self, report: &DispatchReport) {
        if report.interrupted {
            self.bar.abandon_with_message("Interrupted");
        } else {
            self.bar.finish_with_message("Done");
        }
    }
}

pub fn is_interactive() -> bool {
    std::io::stdout().is_terminal() && std::io::stderr().is_terminal()
}

/// A bar for interactive human output, structured log lines otherwise.
pub fn poster_reporter(output: &Output) -> Box<dyn ProgressReporter> {
    if output.is_human() && !output.is_quiet() && is_interactive() {
        Box::new(PosterProgressBar::new())
    } else {
        tracing::info!(
            operation = "ui_init",
            mode = "non_interactive",
            "Progress bars disabled, using structured logging"
        );
        Box::new(TracingReporter::new())
    }
}
