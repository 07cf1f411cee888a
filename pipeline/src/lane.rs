//! One operation kind's lane: bounded transform stage plus a single
//! consumer sink.
//!
//! A lane receives every broadcast trigger, draws random operands, calls
//! the gateway, and funnels each [`TransactionResult`] into its sink in
//! completion order (no ordering guarantee across concurrent workers).
//! The transform stage caps its own in-flight work with a semaphore —
//! this is the backpressure mechanism keeping the store below
//! `lanes × parallelism` simultaneous attempts.
//!
//! Cancellation is observed, never triggered, by worker code: the driver
//! checks the shared token before scheduling each unit, workers check it
//! again before starting, and only the lane's fault handler (the single
//! place that sees a `GatewayError` or a worker panic) trips it.

use ledgerflow_core::{Account, Money, Ticket, TransactionResult, TransactionStatus};
use ledgerflow_gateway::{BookingGateway, GatewayError};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// The five operation kinds, one lane each.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Branch deposit into a random account.
    Deposit,
    /// Branch withdrawal from a random account.
    Withdraw,
    /// Online transfer between two random accounts.
    Transfer,
    /// Ticket booking for a random account.
    BookTicket,
    /// Ticket unbooking by the reservation holder.
    UnbookTicket,
}

impl OperationKind {
    /// Every lane kind, in reporting order.
    pub const ALL: [Self; 5] = [
        Self::Deposit,
        Self::Withdraw,
        Self::Transfer,
        Self::BookTicket,
        Self::UnbookTicket,
    ];
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Deposit => "deposit",
            Self::Withdraw => "withdraw",
            Self::Transfer => "transfer",
            Self::BookTicket => "book-ticket",
            Self::UnbookTicket => "unbook-ticket",
        };
        write!(f, "{name}")
    }
}

/// Aggregated sink-side view of one lane's run.
#[derive(Clone, Debug)]
pub struct LaneReport {
    /// Which lane this report belongs to.
    pub kind: OperationKind,
    /// Results received by the sink (in completion order).
    pub completed: usize,
    /// How many of those carried the fault flag.
    pub faulted: usize,
    /// Tally per settled status.
    pub statuses: BTreeMap<TransactionStatus, usize>,
}

impl LaneReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new(kind: OperationKind) -> Self {
        Self {
            kind,
            completed: 0,
            faulted: 0,
            statuses: BTreeMap::new(),
        }
    }

    fn record<T>(&mut self, result: &TransactionResult<T>) {
        self.completed += 1;
        if result.is_faulted {
            self.faulted += 1;
        }
        *self.statuses.entry(result.status).or_insert(0) += 1;
    }

    /// How many results settled with `status`.
    #[must_use]
    pub fn count_of(&self, status: TransactionStatus) -> usize {
        self.statuses.get(&status).copied().unwrap_or(0)
    }

    /// How many results committed.
    #[must_use]
    pub fn successes(&self) -> usize {
        self.count_of(TransactionStatus::Success)
    }
}

/// What the sink needs to label a result's subject in its report line.
pub(crate) trait LaneSubject {
    fn subject(&self) -> String;
}

impl LaneSubject for Account {
    fn subject(&self) -> String {
        self.holder_name.clone()
    }
}

impl LaneSubject for Ticket {
    fn subject(&self) -> String {
        self.id.to_string()
    }
}

/// One lane's transform step: draw operands, call the gateway. Built by
/// the orchestrator; never touches the cancellation token itself.
pub(crate) type LaneOp<T> = Arc<
    dyn Fn(
            Arc<dyn BookingGateway>,
        )
            -> Pin<Box<dyn Future<Output = Result<TransactionResult<T>, GatewayError>> + Send>>
        + Send
        + Sync,
>;

/// Runs one lane to completion: `total` triggers through a
/// semaphore-bounded worker set into a single sink consumer.
pub(crate) async fn run_lane<T>(
    kind: OperationKind,
    gateway: Arc<dyn BookingGateway>,
    parallelism: usize,
    total: usize,
    cancel: CancellationToken,
    op: LaneOp<T>,
) -> LaneReport
where
    T: LaneSubject + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(parallelism.max(1)));
    let (tx, rx) = mpsc::channel::<TransactionResult<T>>(parallelism.max(1));
    let sink = tokio::spawn(drain(kind, rx));

    let mut workers: JoinSet<()> = JoinSet::new();
    for _ in 0..total {
        // Stop scheduling as soon as the shared signal trips, even while
        // waiting for a permit.
        let permit = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            acquired = semaphore.clone().acquire_owned() => match acquired {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let gateway = gateway.clone();
        let tx = tx.clone();
        let cancel = cancel.clone();
        let op = op.clone();
        workers.spawn(async move {
            let _permit = permit;
            // Scheduled but not yet started: abort cooperatively.
            if cancel.is_cancelled() {
                return;
            }
            let result = match op(gateway).await {
                Ok(result) => result,
                Err(error) => {
                    // The lane's fault handler: the one place that trips
                    // the shared signal.
                    warn!(lane = %kind, error = %error, "unexpected failure, cancelling the run");
                    cancel.cancel();
                    TransactionResult::faulted(None, Money::ZERO)
                }
            };
            let _ = tx.send(result).await;
        });
    }

    while let Some(joined) = workers.join_next().await {
        if joined.is_err() {
            warn!(lane = %kind, "worker panicked, cancelling the run");
            cancel.cancel();
            let _ = tx.send(TransactionResult::faulted(None, Money::ZERO)).await;
        }
    }

    drop(tx);
    sink.await.unwrap_or_else(|_| LaneReport::new(kind))
}

/// The lane's single consumer: reports every result and tallies it.
async fn drain<T: LaneSubject>(
    kind: OperationKind,
    mut rx: mpsc::Receiver<TransactionResult<T>>,
) -> LaneReport {
    let mut report = LaneReport::new(kind);
    while let Some(result) = rx.recv().await {
        let subject = result
            .data
            .as_ref()
            .map_or_else(|| "<none>".to_string(), LaneSubject::subject);
        info!(
            lane = %kind,
            subject = %subject,
            amount = %result.amount,
            status = %result.status,
            faulted = result.is_faulted,
            "operation settled"
        );
        report.record(&result);
    }
    report
}
