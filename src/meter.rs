//! Per-stage accounting shared by every stage task.

use std::future::Future;

use tracing::Instrument;

use crate::error::Error;

/// Counts what a single stage task emits and reports it on exit.
pub(crate) struct Meter {
    stage: String,
    items: u64,
    faults: u64,
}

impl Meter {
    pub(crate) fn new(stage: &str) -> Self {
        Self {
            stage: stage.to_string(),
            items: 0,
            faults: 0,
        }
    }

    pub(crate) fn stage(&self) -> &str {
        &self.stage
    }

    /// Record one value handed to the outbound channel
    pub(crate) fn item(&mut self) {
        self.items += 1;
        tracing::trace!(stage = %self.stage, n = self.items, "emitted");

        #[cfg(feature = "metrics")]
        metrics::counter!("pipeweld_items_total", "stage" => self.stage.clone()).increment(1);
    }

    /// Record a fault caught at the stage boundary
    pub(crate) fn fault(&mut self, error: &Error) {
        self.faults += 1;
        tracing::warn!(stage = %self.stage, %error, "stage function failed");

        #[cfg(feature = "metrics")]
        metrics::counter!("pipeweld_faults_total", "stage" => self.stage.clone()).increment(1);
    }

    pub(crate) fn finish(self) {
        tracing::debug!(
            stage = %self.stage,
            items = self.items,
            faults = self.faults,
            "stage finished"
        );
    }
}

/// Spawn a stage task on the current tokio runtime inside a named span.
pub(crate) fn spawn_stage<F>(stage: &str, task: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    tracing::debug!(stage = %stage, "stage started");
    let span = tracing::debug_span!("stage", name = %stage);
    tokio::spawn(task.instrument(span));
}
