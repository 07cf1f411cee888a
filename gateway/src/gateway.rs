//! The transaction gateway: optimistic-write-then-resolve operations.
//!
//! Every mutating operation follows the same protocol: re-read the entity
//! by id, apply the business checks to the fresh row, build the updated
//! snapshot, and commit it conditionally on the version token the CALLER
//! supplied. A version conflict is handed to the resolver
//! ([`crate::resolver`]); anything unexpected is fault-logged and settles
//! as a faulted `Failure`. No operation holds a lock across a suspension
//! point, and no entity state is cached between calls — the store's
//! conditional write is the only serialization point.

use crate::error::GatewayError;
use crate::fault_log::FaultLog;
use crate::resolver::{self, Resolution};
use ledgerflow_core::{
    Account, AccountId, Clock, LedgerEntry, Money, Store, StoreError, Ticket, TicketId,
    TransactionResult, TransactionStatus, WriteBatch,
};
use rand::Rng;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::debug;

/// The gateway's operation surface.
///
/// Mutating operations settle infallibly into a
/// [`TransactionResult`] — business rejections, conflicts, and faulted
/// failures are all statuses. The read-only lookups return `Result`
/// because their failures are unexpected by definition (see
/// [`GatewayError`]).
///
/// # Dyn Compatibility
///
/// Explicit `Pin<Box<dyn Future>>` returns keep the trait usable as
/// `Arc<dyn BookingGateway>`, which is how the pipeline broadcasts one
/// handle to every lane.
pub trait BookingGateway: Send + Sync {
    /// Deposits `amount` into the account, conditional on the snapshot's
    /// version token.
    fn deposit(
        &self,
        account: Account,
        amount: Money,
    ) -> Pin<Box<dyn Future<Output = TransactionResult<Account>> + Send + '_>>;

    /// Withdraws `amount` from the account; rejects overdrafts before
    /// attempting any write.
    fn withdraw(
        &self,
        account: Account,
        amount: Money,
    ) -> Pin<Box<dyn Future<Output = TransactionResult<Account>> + Send + '_>>;

    /// Moves `amount` between two accounts in one conditional multi-row
    /// commit guarded by both version tokens.
    fn transfer(
        &self,
        from: Account,
        to: Account,
        amount: Money,
    ) -> Pin<Box<dyn Future<Output = TransactionResult<Account>> + Send + '_>>;

    /// Reserves the ticket for the account.
    fn book_ticket(
        &self,
        account: Account,
        ticket: Ticket,
    ) -> Pin<Box<dyn Future<Output = TransactionResult<Ticket>> + Send + '_>>;

    /// Releases the account's reservation on the ticket.
    fn unbook_ticket(
        &self,
        account: Account,
        ticket: Ticket,
    ) -> Pin<Box<dyn Future<Output = TransactionResult<Ticket>> + Send + '_>>;

    /// A uniformly random provisioned account, freshly read.
    ///
    /// Side-effect free; repeated calls always land on the fixed roster.
    ///
    /// # Errors
    ///
    /// [`GatewayError::EmptyRoster`] without provisioned accounts,
    /// [`GatewayError::MissingAccount`] if a roster account vanished, or
    /// a wrapped store failure.
    fn random_account(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Account, GatewayError>> + Send + '_>>;

    /// A uniformly random ticket matching the availability filter, or
    /// `None` when no ticket matches.
    ///
    /// # Errors
    ///
    /// A wrapped store failure.
    fn random_ticket(
        &self,
        available: Option<bool>,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Ticket>, GatewayError>> + Send + '_>>;

    /// The account currently holding the ticket's reservation, if any.
    ///
    /// # Errors
    ///
    /// A wrapped store failure.
    fn ticket_owner(
        &self,
        ticket_id: TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Account>, GatewayError>> + Send + '_>>;
}

/// The one gateway implementation, over any [`Store`].
///
/// Owns no shared mutable state: it operates purely on the versioned
/// snapshots passed in and on what the store returns.
pub struct StoreGateway {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    roster: Vec<AccountId>,
    faults: FaultLog,
}

impl StoreGateway {
    /// Creates a gateway over `store`.
    ///
    /// `roster` is the fixed set of provisioned account ids that
    /// [`BookingGateway::random_account`] draws from.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        roster: Vec<AccountId>,
        faults: FaultLog,
    ) -> Self {
        Self {
            store,
            clock,
            roster,
            faults,
        }
    }

    fn fault<T>(
        &self,
        operation: &'static str,
        error: &StoreError,
        data: Option<T>,
        amount: Money,
    ) -> TransactionResult<T> {
        self.faults.report(operation, error.to_string());
        TransactionResult::faulted(data, amount)
    }

    /// Shared tail of the single-account money operations: commit the
    /// updated snapshot plus its ledger row, then classify any conflict.
    async fn commit_account_update(
        &self,
        operation: &'static str,
        snapshot: Account,
        updated: Account,
        entry: LedgerEntry,
        amount: Money,
    ) -> TransactionResult<Account> {
        let expected = snapshot.version;
        let batch = WriteBatch::new()
            .with_account(updated, expected)
            .with_ledger(entry);

        match self.store.commit(batch).await {
            Ok(receipt) => TransactionResult::settled(
                TransactionStatus::Success,
                receipt.account(snapshot.id).cloned(),
                amount,
            ),
            Err(StoreError::VersionConflict { .. }) => {
                debug!(operation, account = %snapshot.id, "conditional write lost a race");
                self.resolve_account_conflict(
                    operation,
                    snapshot,
                    amount,
                    TransactionStatus::AccountNotFound,
                    TransactionStatus::OutdatedAccount,
                )
                .await
            }
            Err(error) => self.fault(operation, &error, Some(snapshot), amount),
        }
    }

    /// Re-reads the conflicting account row and maps the classification
    /// onto the operation's status codes.
    async fn resolve_account_conflict(
        &self,
        operation: &'static str,
        snapshot: Account,
        amount: Money,
        deleted: TransactionStatus,
        outdated: TransactionStatus,
    ) -> TransactionResult<Account> {
        match self.store.current_account(snapshot.id).await {
            Ok(current) => match resolver::resolve_account(&snapshot, current) {
                Resolution::Deleted => TransactionResult::settled(deleted, Some(snapshot), amount),
                Resolution::Refreshed(fresh) => {
                    TransactionResult::settled(outdated, Some(fresh), amount)
                }
                Resolution::TokenChurn => TransactionResult::settled(
                    TransactionStatus::Failure,
                    Some(snapshot),
                    amount,
                ),
            },
            Err(error) => self.fault(operation, &error, Some(snapshot), amount),
        }
    }

    /// Ticket counterpart of [`Self::resolve_account_conflict`].
    async fn resolve_ticket_conflict(
        &self,
        operation: &'static str,
        snapshot: Ticket,
        amount: Money,
    ) -> TransactionResult<Ticket> {
        match self.store.current_ticket(snapshot.id).await {
            Ok(current) => match resolver::resolve_ticket(&snapshot, current) {
                Resolution::Deleted => TransactionResult::settled(
                    TransactionStatus::TicketNotFound,
                    Some(snapshot),
                    amount,
                ),
                Resolution::Refreshed(fresh) => TransactionResult::settled(
                    TransactionStatus::OutdatedTicket,
                    Some(fresh),
                    amount,
                ),
                Resolution::TokenChurn => TransactionResult::settled(
                    TransactionStatus::Failure,
                    Some(snapshot),
                    amount,
                ),
            },
            Err(error) => self.fault(operation, &error, Some(snapshot), amount),
        }
    }

    async fn do_deposit(&self, account: Account, amount: Money) -> TransactionResult<Account> {
        let current = match self.store.fetch_account(account.id).await {
            Ok(Some(current)) => current,
            Ok(None) => {
                return TransactionResult::settled(
                    TransactionStatus::AccountNotFound,
                    Some(account),
                    amount,
                );
            }
            Err(error) => return self.fault("deposit", &error, Some(account), amount),
        };

        let new_balance = current.balance + amount;
        if new_balance.is_negative() {
            return TransactionResult::settled(
                TransactionStatus::InvalidBalance,
                Some(account),
                amount,
            );
        }

        let now = self.clock.now();
        let mut updated = current;
        updated.balance = new_balance;
        updated.last_transaction_at = Some(now);

        let entry = LedgerEntry::new(
            format!("Branch visit deposit: +{amount}"),
            amount,
            account.id,
            now,
        );
        self.commit_account_update("deposit", account, updated, entry, amount)
            .await
    }

    async fn do_withdraw(&self, account: Account, amount: Money) -> TransactionResult<Account> {
        let current = match self.store.fetch_account(account.id).await {
            Ok(Some(current)) => current,
            Ok(None) => {
                return TransactionResult::settled(
                    TransactionStatus::AccountNotFound,
                    Some(account),
                    amount,
                );
            }
            Err(error) => return self.fault("withdraw", &error, Some(account), amount),
        };

        if current.balance < amount {
            return TransactionResult::settled(
                TransactionStatus::InsufficientFunds,
                Some(account),
                amount,
            );
        }

        let now = self.clock.now();
        let mut updated = current;
        updated.balance = updated.balance - amount;
        updated.last_transaction_at = Some(now);

        let entry = LedgerEntry::new(
            format!("Branch visit withdraw: -{amount}"),
            -amount,
            account.id,
            now,
        );
        self.commit_account_update("withdraw", account, updated, entry, amount)
            .await
    }

    async fn do_transfer(
        &self,
        from: Account,
        to: Account,
        amount: Money,
    ) -> TransactionResult<Account> {
        if !amount.is_positive() {
            return TransactionResult::settled(TransactionStatus::BadInput, Some(from), amount);
        }
        if from.id == to.id {
            return TransactionResult::settled(
                TransactionStatus::SameAccountRejection,
                Some(from),
                amount,
            );
        }

        let from_current = match self.store.fetch_account(from.id).await {
            Ok(Some(current)) => current,
            Ok(None) => {
                return TransactionResult::settled(
                    TransactionStatus::FromAccountNotFound,
                    Some(from),
                    amount,
                );
            }
            Err(error) => return self.fault("transfer", &error, Some(from), amount),
        };
        if from_current.balance < amount {
            return TransactionResult::settled(
                TransactionStatus::FromAccountInsufficientFunds,
                Some(from),
                amount,
            );
        }

        let to_current = match self.store.fetch_account(to.id).await {
            Ok(Some(current)) => current,
            Ok(None) => {
                return TransactionResult::settled(
                    TransactionStatus::ToAccountNotFound,
                    Some(from),
                    amount,
                );
            }
            Err(error) => return self.fault("transfer", &error, Some(from), amount),
        };

        let now = self.clock.now();
        let mut debited = from_current;
        debited.balance = debited.balance - amount;
        debited.last_transaction_at = Some(now);
        let mut credited = to_current;
        credited.balance = credited.balance + amount;
        credited.last_transaction_at = Some(now);

        let batch = WriteBatch::new()
            .with_account(debited, from.version)
            .with_account(credited, to.version)
            .with_ledger(LedgerEntry::new(
                format!("Online transfer to {}: -{amount}", to.holder_name),
                -amount,
                from.id,
                now,
            ))
            .with_ledger(LedgerEntry::new(
                format!("Online transfer from {}: +{amount}", from.holder_name),
                amount,
                to.id,
                now,
            ));

        match self.store.commit(batch).await {
            Ok(receipt) => TransactionResult::settled(
                TransactionStatus::Success,
                receipt.account(from.id).cloned(),
                amount,
            ),
            Err(StoreError::VersionConflict { accounts, .. }) => {
                debug!(from = %from.id, to = %to.id, "transfer lost a race");
                self.resolve_transfer_conflict(from, to, amount, &accounts)
                    .await
            }
            Err(error) => self.fault("transfer", &error, Some(from), amount),
        }
    }

    /// Transfer conflicts resolve the from-side before the to-side; both
    /// may be stale at once but only the first identified status is
    /// returned. The order is a preserved convention, nothing more.
    async fn resolve_transfer_conflict(
        &self,
        from: Account,
        to: Account,
        amount: Money,
        conflicting: &[AccountId],
    ) -> TransactionResult<Account> {
        if conflicting.contains(&from.id) {
            match self.store.current_account(from.id).await {
                Ok(current) => match resolver::resolve_account(&from, current) {
                    Resolution::Deleted => {
                        return TransactionResult::settled(
                            TransactionStatus::FromAccountNotFound,
                            Some(from),
                            amount,
                        );
                    }
                    Resolution::Refreshed(fresh) => {
                        return TransactionResult::settled(
                            TransactionStatus::OutdatedFromAccount,
                            Some(fresh),
                            amount,
                        );
                    }
                    Resolution::TokenChurn => {}
                },
                Err(error) => return self.fault("transfer", &error, Some(from), amount),
            }
        }

        if conflicting.contains(&to.id) {
            match self.store.current_account(to.id).await {
                Ok(current) => match resolver::resolve_account(&to, current) {
                    Resolution::Deleted => {
                        return TransactionResult::settled(
                            TransactionStatus::ToAccountNotFound,
                            Some(to),
                            amount,
                        );
                    }
                    Resolution::Refreshed(fresh) => {
                        return TransactionResult::settled(
                            TransactionStatus::OutdatedToAccount,
                            Some(fresh),
                            amount,
                        );
                    }
                    Resolution::TokenChurn => {}
                },
                Err(error) => return self.fault("transfer", &error, Some(to), amount),
            }
        }

        // The conflicting row could not be identified as a business-level
        // change on either side.
        TransactionResult::settled(TransactionStatus::Failure, Some(from), amount)
    }

    async fn do_book_ticket(&self, account: Account, ticket: Ticket) -> TransactionResult<Ticket> {
        let current = match self.store.fetch_ticket(ticket.id).await {
            Ok(Some(current)) => current,
            Ok(None) => {
                let price = ticket.price;
                return TransactionResult::settled(
                    TransactionStatus::TicketNotFound,
                    Some(ticket),
                    price,
                );
            }
            Err(error) => {
                let price = ticket.price;
                return self.fault("book_ticket", &error, Some(ticket), price);
            }
        };

        let price = current.price;
        let now = self.clock.now();
        if current.ticket_date <= now {
            return TransactionResult::settled(
                TransactionStatus::TicketDatePassed,
                Some(current),
                price,
            );
        }
        if current.reserved_by.is_some() || !current.is_available {
            return TransactionResult::settled(
                TransactionStatus::TicketAlreadyBooked,
                Some(current),
                price,
            );
        }

        let updated = current.reserved(account.id, now);
        let batch = WriteBatch::new()
            .with_ticket(updated, ticket.version)
            .with_ledger(LedgerEntry::new(
                format!("Ticket booking for {}: -{price}", account.holder_name),
                -price,
                account.id,
                now,
            ));

        match self.store.commit(batch).await {
            Ok(receipt) => TransactionResult::settled(
                TransactionStatus::Success,
                receipt.ticket(ticket.id).cloned(),
                price,
            ),
            Err(StoreError::VersionConflict { .. }) => {
                debug!(ticket = %ticket.id, "ticket booking lost a race");
                self.resolve_ticket_conflict("book_ticket", ticket, price)
                    .await
            }
            Err(error) => self.fault("book_ticket", &error, Some(ticket), price),
        }
    }

    async fn do_unbook_ticket(
        &self,
        account: Account,
        ticket: Ticket,
    ) -> TransactionResult<Ticket> {
        let current = match self.store.fetch_ticket(ticket.id).await {
            Ok(Some(current)) => current,
            Ok(None) => {
                let price = ticket.price;
                return TransactionResult::settled(
                    TransactionStatus::TicketNotFound,
                    Some(ticket),
                    price,
                );
            }
            Err(error) => {
                let price = ticket.price;
                return self.fault("unbook_ticket", &error, Some(ticket), price);
            }
        };

        let price = current.price;
        let now = self.clock.now();
        if current.ticket_date <= now {
            return TransactionResult::settled(
                TransactionStatus::TicketDatePassed,
                Some(current),
                price,
            );
        }
        // Unbooking is only meaningful for the reservation holder.
        if current.reserved_by != Some(account.id) {
            return TransactionResult::settled(TransactionStatus::BadInput, Some(current), price);
        }

        let updated = current.released();
        let batch = WriteBatch::new()
            .with_ticket(updated, ticket.version)
            .with_ledger(LedgerEntry::new(
                format!("Ticket refund for {}: +{price}", account.holder_name),
                price,
                account.id,
                now,
            ));

        match self.store.commit(batch).await {
            Ok(receipt) => TransactionResult::settled(
                TransactionStatus::Success,
                receipt.ticket(ticket.id).cloned(),
                price,
            ),
            Err(StoreError::VersionConflict { .. }) => {
                debug!(ticket = %ticket.id, "ticket unbooking lost a race");
                self.resolve_ticket_conflict("unbook_ticket", ticket, price)
                    .await
            }
            Err(error) => self.fault("unbook_ticket", &error, Some(ticket), price),
        }
    }

    async fn do_random_account(&self) -> Result<Account, GatewayError> {
        if self.roster.is_empty() {
            return Err(GatewayError::EmptyRoster);
        }
        let id = {
            let mut rng = rand::thread_rng();
            self.roster[rng.gen_range(0..self.roster.len())]
        };
        self.store
            .fetch_account(id)
            .await?
            .ok_or(GatewayError::MissingAccount(id))
    }

    async fn do_random_ticket(
        &self,
        available: Option<bool>,
    ) -> Result<Option<Ticket>, GatewayError> {
        let ids = self.store.ticket_ids(available).await?;
        if ids.is_empty() {
            return Ok(None);
        }
        let id = {
            let mut rng = rand::thread_rng();
            ids[rng.gen_range(0..ids.len())]
        };
        Ok(self.store.fetch_ticket(id).await?)
    }

    async fn do_ticket_owner(&self, ticket_id: TicketId) -> Result<Option<Account>, GatewayError> {
        let Some(ticket) = self.store.fetch_ticket(ticket_id).await? else {
            return Ok(None);
        };
        let Some(owner) = ticket.reserved_by else {
            return Ok(None);
        };
        Ok(self.store.fetch_account(owner).await?)
    }
}

impl BookingGateway for StoreGateway {
    fn deposit(
        &self,
        account: Account,
        amount: Money,
    ) -> Pin<Box<dyn Future<Output = TransactionResult<Account>> + Send + '_>> {
        Box::pin(self.do_deposit(account, amount))
    }

    fn withdraw(
        &self,
        account: Account,
        amount: Money,
    ) -> Pin<Box<dyn Future<Output = TransactionResult<Account>> + Send + '_>> {
        Box::pin(self.do_withdraw(account, amount))
    }

    fn transfer(
        &self,
        from: Account,
        to: Account,
        amount: Money,
    ) -> Pin<Box<dyn Future<Output = TransactionResult<Account>> + Send + '_>> {
        Box::pin(self.do_transfer(from, to, amount))
    }

    fn book_ticket(
        &self,
        account: Account,
        ticket: Ticket,
    ) -> Pin<Box<dyn Future<Output = TransactionResult<Ticket>> + Send + '_>> {
        Box::pin(self.do_book_ticket(account, ticket))
    }

    fn unbook_ticket(
        &self,
        account: Account,
        ticket: Ticket,
    ) -> Pin<Box<dyn Future<Output = TransactionResult<Ticket>> + Send + '_>> {
        Box::pin(self.do_unbook_ticket(account, ticket))
    }

    fn random_account(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Account, GatewayError>> + Send + '_>> {
        Box::pin(self.do_random_account())
    }

    fn random_ticket(
        &self,
        available: Option<bool>,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Ticket>, GatewayError>> + Send + '_>> {
        Box::pin(self.do_random_ticket(available))
    }

    fn ticket_owner(
        &self,
        ticket_id: TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Account>, GatewayError>> + Send + '_>> {
        Box::pin(self.do_ticket_owner(ticket_id))
    }
}
