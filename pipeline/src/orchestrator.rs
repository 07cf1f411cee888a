//! The pipeline orchestrator: broadcast, lanes, drain.
//!
//! One shared gateway handle is broadcast to five independent lanes (one
//! per operation kind). Each lane gets the full trigger count and runs
//! its transform stage under its own parallelism cap; one cancellation
//! token is shared by every lane, so a single unexpected failure anywhere
//! fails the whole run fast. Business outcomes — insufficient funds,
//! stale versions, missing rows — never cancel anything.
//!
//! A pipeline run is terminal: [`Pipeline::run`] consumes the pipeline,
//! and a drained run cannot be restarted.

use crate::config::{AmountRange, PipelineConfig};
use crate::lane::{run_lane, LaneOp, LaneReport, OperationKind};
use ledgerflow_core::{Account, Money, Ticket, TransactionResult, TransactionStatus};
use ledgerflow_gateway::BookingGateway;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Outcome of one whole pipeline run.
#[derive(Clone, Debug)]
pub struct RunReport {
    /// Per-lane reports, in [`OperationKind::ALL`] order.
    pub lanes: Vec<LaneReport>,
    /// Whether the shared cancellation signal tripped during the run.
    pub cancelled: bool,
}

impl RunReport {
    /// Total results that reached any sink.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.lanes.iter().map(|lane| lane.completed).sum()
    }

    /// Total faulted results across all lanes.
    #[must_use]
    pub fn faulted(&self) -> usize {
        self.lanes.iter().map(|lane| lane.faulted).sum()
    }

    /// The report for one lane.
    #[must_use]
    pub fn lane(&self, kind: OperationKind) -> Option<&LaneReport> {
        self.lanes.iter().find(|lane| lane.kind == kind)
    }

    /// Logs a per-lane summary of the run.
    pub fn log_summary(&self) {
        for lane in &self.lanes {
            let tallies = lane
                .statuses
                .iter()
                .map(|(status, count)| format!("{status}={count}"))
                .collect::<Vec<_>>()
                .join(" ");
            info!(
                lane = %lane.kind,
                completed = lane.completed,
                faulted = lane.faulted,
                %tallies,
                "lane drained"
            );
        }
        info!(
            completed = self.completed(),
            cancelled = self.cancelled,
            "pipeline run finished"
        );
    }
}

/// The bounded-parallelism pipeline over one gateway handle.
pub struct Pipeline {
    gateway: Arc<dyn BookingGateway>,
    config: PipelineConfig,
}

impl Pipeline {
    /// Creates a pipeline broadcasting `gateway` to every lane.
    #[must_use]
    pub fn new(gateway: Arc<dyn BookingGateway>, config: PipelineConfig) -> Self {
        Self { gateway, config }
    }

    /// Posts the configured trigger count to every lane and waits until
    /// every sink has drained (or the run was cancelled). Consumes the
    /// pipeline: a drained run is not restartable.
    pub async fn run(self) -> RunReport {
        let cancel = CancellationToken::new();
        let total = self.config.total_operations;
        let parallelism = self.config.lane_parallelism;

        info!(
            total,
            parallelism,
            lanes = OperationKind::ALL.len(),
            "broadcasting operations"
        );

        let (deposit, withdraw, transfer, book, unbook) = tokio::join!(
            run_lane(
                OperationKind::Deposit,
                self.gateway.clone(),
                parallelism,
                total,
                cancel.clone(),
                deposit_op(self.config.deposit.clone()),
            ),
            run_lane(
                OperationKind::Withdraw,
                self.gateway.clone(),
                parallelism,
                total,
                cancel.clone(),
                withdraw_op(self.config.withdraw.clone()),
            ),
            run_lane(
                OperationKind::Transfer,
                self.gateway.clone(),
                parallelism,
                total,
                cancel.clone(),
                transfer_op(self.config.transfer.clone()),
            ),
            run_lane(
                OperationKind::BookTicket,
                self.gateway.clone(),
                parallelism,
                total,
                cancel.clone(),
                book_ticket_op(),
            ),
            run_lane(
                OperationKind::UnbookTicket,
                self.gateway.clone(),
                parallelism,
                total,
                cancel.clone(),
                unbook_ticket_op(),
            ),
        );

        RunReport {
            lanes: vec![deposit, withdraw, transfer, book, unbook],
            cancelled: cancel.is_cancelled(),
        }
    }
}

/// Draws an amount without holding the thread-local generator across an
/// await point.
fn draw(range: &AmountRange) -> Money {
    let mut rng = rand::thread_rng();
    range.sample(&mut rng)
}

fn deposit_op(range: AmountRange) -> LaneOp<Account> {
    Arc::new(move |gateway| {
        let range = range.clone();
        Box::pin(async move {
            let amount = draw(&range);
            let account = gateway.random_account().await?;
            Ok(gateway.deposit(account, amount).await)
        })
    })
}

fn withdraw_op(range: AmountRange) -> LaneOp<Account> {
    Arc::new(move |gateway| {
        let range = range.clone();
        Box::pin(async move {
            let amount = draw(&range);
            let account = gateway.random_account().await?;
            Ok(gateway.withdraw(account, amount).await)
        })
    })
}

fn transfer_op(range: AmountRange) -> LaneOp<Account> {
    Arc::new(move |gateway| {
        let range = range.clone();
        Box::pin(async move {
            let amount = draw(&range);
            let from = gateway.random_account().await?;
            // Drawing the same account twice is a legitimate outcome; the
            // gateway settles it as SameAccountRejection.
            let to = gateway.random_account().await?;
            Ok(gateway.transfer(from, to, amount).await)
        })
    })
}

fn book_ticket_op() -> LaneOp<Ticket> {
    Arc::new(|gateway| {
        Box::pin(async move {
            let account = gateway.random_account().await?;
            match gateway.random_ticket(Some(true)).await? {
                Some(ticket) => Ok(gateway.book_ticket(account, ticket).await),
                // An empty operand set is a business outcome, not a fault.
                None => Ok(TransactionResult::settled(
                    TransactionStatus::TicketNotFound,
                    None,
                    Money::ZERO,
                )),
            }
        })
    })
}

fn unbook_ticket_op() -> LaneOp<Ticket> {
    Arc::new(|gateway| {
        Box::pin(async move {
            let Some(ticket) = gateway.random_ticket(Some(false)).await? else {
                return Ok(TransactionResult::settled(
                    TransactionStatus::TicketNotFound,
                    None,
                    Money::ZERO,
                ));
            };
            let price = ticket.price;
            match gateway.ticket_owner(ticket.id).await? {
                Some(owner) => Ok(gateway.unbook_ticket(owner, ticket).await),
                None => Ok(TransactionResult::settled(
                    TransactionStatus::AccountNotFound,
                    Some(ticket),
                    price,
                )),
            }
        })
    })
}
