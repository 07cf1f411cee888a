//! Fire-and-forget logging of unexpected gateway failures.
//!
//! Unexpected failures are reported on a detached side-channel so that a
//! slow or broken logging path can never block an operation or alter its
//! outcome. `report` pushes onto an unbounded channel and returns
//! immediately; a detached task drains the channel into `tracing`.

use tokio::sync::mpsc;
use tracing::error;

/// One unexpected-failure report.
#[derive(Debug)]
struct FaultReport {
    operation: &'static str,
    detail: String,
}

/// Non-blocking side-channel for unexpected gateway failures.
///
/// Cloning is cheap; all clones feed the same drain task. Dropping every
/// clone closes the channel and lets the drain task finish.
#[derive(Clone, Debug)]
pub struct FaultLog {
    tx: mpsc::UnboundedSender<FaultReport>,
}

impl FaultLog {
    /// Starts the drain task and returns a handle.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime (the drain task must be
    /// spawned somewhere).
    #[must_use]
    pub fn spawn() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<FaultReport>();
        tokio::spawn(async move {
            while let Some(report) = rx.recv().await {
                error!(
                    operation = report.operation,
                    detail = %report.detail,
                    "gateway operation failed unexpectedly"
                );
            }
        });
        Self { tx }
    }

    /// Reports a failure without blocking.
    ///
    /// Send failures are deliberately ignored: if the drain task is gone,
    /// losing the report is preferable to surfacing a logging problem in
    /// the transaction path.
    pub fn report(&self, operation: &'static str, detail: impl Into<String>) {
        let _ = self.tx.send(FaultReport {
            operation,
            detail: detail.into(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn report_never_blocks_or_errors() {
        let log = FaultLog::spawn();
        for _ in 0..1_000 {
            log.report("test_op", "synthetic failure");
        }
        // Reporting after heavy load still returns immediately.
        log.report("test_op", "last one");
    }
}
