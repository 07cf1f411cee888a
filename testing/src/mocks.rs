//! Mock implementations of the Ledgerflow environment traits.

use chrono::{DateTime, Duration, Utc};
use ledgerflow_core::{
    Account, AccountId, Clock, LedgerEntry, Money, Store, StoreError, Ticket, TicketId,
    Versioned, VersionToken, WriteBatch, WriteReceipt,
};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Fixed clock for deterministic tests.
///
/// Always returns the same time, making tests reproducible.
#[derive(Debug, Clone)]
pub struct FixedClock {
    time: DateTime<Utc>,
}

impl FixedClock {
    /// Create a new fixed clock with the given time.
    #[must_use]
    pub const fn new(time: DateTime<Utc>) -> Self {
        Self { time }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.time
    }
}

/// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC).
///
/// # Panics
///
/// Panics if the hardcoded timestamp fails to parse, which should never
/// happen in practice.
#[must_use]
#[allow(clippy::expect_used)]
pub fn test_clock() -> FixedClock {
    FixedClock::new(
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .expect("hardcoded timestamp should always parse")
            .with_timezone(&Utc),
    )
}

#[derive(Default)]
struct StoreState {
    accounts: HashMap<AccountId, Account>,
    tickets: HashMap<TicketId, Ticket>,
    ledger: Vec<LedgerEntry>,
}

/// Ids of the writes whose expected token no longer matches the stored
/// row (a missing row matches no token).
fn stale_writes<'a, T, I>(rows: &HashMap<T::Id, T>, writes: I) -> Vec<T::Id>
where
    T: Versioned + 'a,
    I: Iterator<Item = (&'a T, VersionToken)>,
{
    writes
        .filter(|(row, expected)| {
            rows.get(&row.id())
                .is_none_or(|current| current.version() != *expected)
        })
        .map(|(row, _)| row.id())
        .collect()
}

/// Persists a row with a freshly regenerated token and returns it.
fn apply_write<T>(rows: &mut HashMap<T::Id, T>, mut row: T) -> T
where
    T: Versioned + Clone,
{
    row.set_version(VersionToken::fresh());
    rows.insert(row.id(), row.clone());
    row
}

/// In-memory [`Store`] with real conditional-write semantics.
///
/// A [`WriteBatch`] applies if and only if every row's expected token
/// matches the row's current token (a missing row matches nothing); on
/// success every written row receives a freshly regenerated
/// [`VersionToken`]. The whole batch is checked and applied under one
/// write lock, so commits are atomic — exactly the enforcement the
/// gateway relies on.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<StoreState>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an account row as-is (provisioning; keeps its token).
    pub async fn insert_account(&self, account: Account) {
        self.inner.write().await.accounts.insert(account.id, account);
    }

    /// Inserts a ticket row as-is (provisioning; keeps its token).
    pub async fn insert_ticket(&self, ticket: Ticket) {
        self.inner.write().await.tickets.insert(ticket.id, ticket);
    }

    /// Deletes an account row, simulating a concurrent delete.
    pub async fn remove_account(&self, id: AccountId) -> Option<Account> {
        self.inner.write().await.accounts.remove(&id)
    }

    /// Deletes a ticket row, simulating a concurrent delete.
    pub async fn remove_ticket(&self, id: TicketId) -> Option<Ticket> {
        self.inner.write().await.tickets.remove(&id)
    }

    /// Snapshot of every ledger row written so far, in commit order.
    pub async fn ledger_entries(&self) -> Vec<LedgerEntry> {
        self.inner.read().await.ledger.clone()
    }

    /// Ledger rows belonging to one account, in commit order.
    pub async fn ledger_for(&self, id: AccountId) -> Vec<LedgerEntry> {
        self.inner
            .read()
            .await
            .ledger
            .iter()
            .filter(|entry| entry.account_id == id)
            .cloned()
            .collect()
    }
}

impl Store for InMemoryStore {
    fn fetch_account(
        &self,
        id: AccountId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Account>, StoreError>> + Send + '_>> {
        Box::pin(async move { Ok(self.inner.read().await.accounts.get(&id).cloned()) })
    }

    fn fetch_ticket(
        &self,
        id: TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Ticket>, StoreError>> + Send + '_>> {
        Box::pin(async move { Ok(self.inner.read().await.tickets.get(&id).cloned()) })
    }

    fn commit(
        &self,
        batch: WriteBatch,
    ) -> Pin<Box<dyn Future<Output = Result<WriteReceipt, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut state = self.inner.write().await;

            let conflicting_accounts = stale_writes(
                &state.accounts,
                batch
                    .accounts
                    .iter()
                    .map(|write| (&write.account, write.expected)),
            );
            let conflicting_tickets = stale_writes(
                &state.tickets,
                batch
                    .tickets
                    .iter()
                    .map(|write| (&write.ticket, write.expected)),
            );

            if !conflicting_accounts.is_empty() || !conflicting_tickets.is_empty() {
                return Err(StoreError::VersionConflict {
                    accounts: conflicting_accounts,
                    tickets: conflicting_tickets,
                });
            }

            let mut receipt = WriteReceipt::default();
            for write in batch.accounts {
                receipt
                    .accounts
                    .push(apply_write(&mut state.accounts, write.account));
            }
            for write in batch.tickets {
                receipt
                    .tickets
                    .push(apply_write(&mut state.tickets, write.ticket));
            }
            state.ledger.extend(batch.ledger);

            Ok(receipt)
        })
    }

    fn current_account(
        &self,
        id: AccountId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Account>, StoreError>> + Send + '_>> {
        // No session caching to bypass in memory; same as a fetch.
        self.fetch_account(id)
    }

    fn current_ticket(
        &self,
        id: TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Ticket>, StoreError>> + Send + '_>> {
        self.fetch_ticket(id)
    }

    fn account_ids(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<AccountId>, StoreError>> + Send + '_>> {
        Box::pin(async move { Ok(self.inner.read().await.accounts.keys().copied().collect()) })
    }

    fn ticket_ids(
        &self,
        available: Option<bool>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<TicketId>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            Ok(self
                .inner
                .read()
                .await
                .tickets
                .values()
                .filter(|ticket| available.is_none_or(|wanted| ticket.is_available == wanted))
                .map(|ticket| ticket.id)
                .collect())
        })
    }
}

/// Seeds `count` accounts with the given starting balance and returns
/// their ids in insertion order.
pub async fn seed_accounts(store: &InMemoryStore, count: usize, balance: Money) -> Vec<AccountId> {
    let mut ids = Vec::with_capacity(count);
    for index in 0..count {
        let account = Account::new(AccountId::new(), format!("Holder {}", index + 1), balance);
        ids.push(account.id);
        store.insert_account(account).await;
    }
    ids
}

/// Seeds `count` unreserved tickets dated `days_ahead` days from `now`
/// and returns their ids in insertion order.
pub async fn seed_tickets(
    store: &InMemoryStore,
    count: usize,
    price: Money,
    now: DateTime<Utc>,
    days_ahead: i64,
) -> Vec<TicketId> {
    let mut ids = Vec::with_capacity(count);
    for _ in 0..count {
        let ticket = Ticket::new(TicketId::new(), now + Duration::days(days_ahead), price);
        ids.push(ticket.id);
        store.insert_ticket(ticket).await;
    }
    ids
}

/// Store wrapper that fails every call after the first `healthy_calls`.
///
/// Drives the fail-fast pipeline scenario: the wrapped store behaves
/// normally for a while, then every subsequent operation returns
/// [`StoreError::Backend`].
pub struct FailingStore {
    inner: Arc<dyn Store>,
    calls: AtomicUsize,
    healthy_calls: usize,
}

impl FailingStore {
    /// Wraps `inner`, allowing `healthy_calls` operations before failing.
    #[must_use]
    pub fn after(inner: Arc<dyn Store>, healthy_calls: usize) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
            healthy_calls,
        }
    }

    fn trip(&self) -> Result<(), StoreError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call >= self.healthy_calls {
            return Err(StoreError::Backend("injected store failure".to_string()));
        }
        Ok(())
    }
}

impl Store for FailingStore {
    fn fetch_account(
        &self,
        id: AccountId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Account>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            self.trip()?;
            self.inner.fetch_account(id).await
        })
    }

    fn fetch_ticket(
        &self,
        id: TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Ticket>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            self.trip()?;
            self.inner.fetch_ticket(id).await
        })
    }

    fn commit(
        &self,
        batch: WriteBatch,
    ) -> Pin<Box<dyn Future<Output = Result<WriteReceipt, StoreError>> + Send + '_>> {
        Box::pin(async move {
            self.trip()?;
            self.inner.commit(batch).await
        })
    }

    fn current_account(
        &self,
        id: AccountId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Account>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            self.trip()?;
            self.inner.current_account(id).await
        })
    }

    fn current_ticket(
        &self,
        id: TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Ticket>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            self.trip()?;
            self.inner.current_ticket(id).await
        })
    }

    fn account_ids(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<AccountId>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            self.trip()?;
            self.inner.account_ids().await
        })
    }

    fn ticket_ids(
        &self,
        available: Option<bool>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<TicketId>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            self.trip()?;
            self.inner.ticket_ids(available).await
        })
    }
}

/// Store wrapper that records how many operations run simultaneously.
///
/// Each wrapped call holds an in-flight slot for its whole duration (plus
/// a tiny pause so overlapping work is actually observable on fast
/// in-memory backends); [`max_in_flight`](ConcurrencyProbe::max_in_flight)
/// exposes the high-water mark for bounded-parallelism assertions.
pub struct ConcurrencyProbe {
    inner: Arc<dyn Store>,
    current: AtomicUsize,
    max: AtomicUsize,
}

struct InFlightSlot<'a>(&'a ConcurrencyProbe);

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ConcurrencyProbe {
    /// Wraps `inner` with in-flight tracking.
    #[must_use]
    pub fn wrap(inner: Arc<dyn Store>) -> Self {
        Self {
            inner,
            current: AtomicUsize::new(0),
            max: AtomicUsize::new(0),
        }
    }

    /// The highest number of simultaneously in-flight store operations
    /// observed so far.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> InFlightSlot<'_> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
        // Stretch the operation so concurrent callers overlap.
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        InFlightSlot(self)
    }
}

impl Store for ConcurrencyProbe {
    fn fetch_account(
        &self,
        id: AccountId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Account>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let _slot = self.enter().await;
            self.inner.fetch_account(id).await
        })
    }

    fn fetch_ticket(
        &self,
        id: TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Ticket>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let _slot = self.enter().await;
            self.inner.fetch_ticket(id).await
        })
    }

    fn commit(
        &self,
        batch: WriteBatch,
    ) -> Pin<Box<dyn Future<Output = Result<WriteReceipt, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let _slot = self.enter().await;
            self.inner.commit(batch).await
        })
    }

    fn current_account(
        &self,
        id: AccountId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Account>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let _slot = self.enter().await;
            self.inner.current_account(id).await
        })
    }

    fn current_ticket(
        &self,
        id: TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Ticket>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let _slot = self.enter().await;
            self.inner.current_ticket(id).await
        })
    }

    fn account_ids(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<AccountId>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let _slot = self.enter().await;
            self.inner.account_ids().await
        })
    }

    fn ticket_ids(
        &self,
        available: Option<bool>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<TicketId>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let _slot = self.enter().await;
            self.inner.ticket_ids(available).await
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::panic)]

    use super::*;
    use ledgerflow_core::WriteBatch;

    fn account(balance: Money) -> Account {
        Account::new(AccountId::new(), "Probe", balance)
    }

    #[test]
    fn fixed_clock_is_fixed() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
    }

    #[tokio::test]
    async fn commit_regenerates_tokens() {
        let store = InMemoryStore::new();
        let row = account(Money::from_dollars(10));
        let id = row.id;
        let v0 = row.version;
        store.insert_account(row.clone()).await;

        let mut updated = row;
        updated.balance = Money::from_dollars(15);
        let receipt = store
            .commit(WriteBatch::new().with_account(updated, v0))
            .await
            .unwrap();

        let written = receipt.account(id).unwrap();
        assert_ne!(written.version, v0);
        assert_eq!(written.balance, Money::from_dollars(15));

        let fetched = store.fetch_account(id).await.unwrap().unwrap();
        assert_eq!(fetched.version, written.version);
    }

    #[tokio::test]
    async fn stale_token_rejects_whole_batch() {
        let store = InMemoryStore::new();
        let first = account(Money::from_dollars(10));
        let second = account(Money::from_dollars(10));
        let stale = VersionToken::fresh();
        store.insert_account(first.clone()).await;
        store.insert_account(second.clone()).await;

        let mut debit = first.clone();
        debit.balance = Money::from_dollars(5);
        let mut credit = second.clone();
        credit.balance = Money::from_dollars(15);

        let error = store
            .commit(
                WriteBatch::new()
                    .with_account(debit, stale)
                    .with_account(credit, second.version)
                    .with_ledger(LedgerEntry::new(
                        "should not land",
                        Money::from_dollars(5),
                        first.id,
                        Utc::now(),
                    )),
            )
            .await
            .unwrap_err();

        match error {
            StoreError::VersionConflict { accounts, tickets } => {
                assert_eq!(accounts, vec![first.id]);
                assert!(tickets.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }

        // Nothing applied: balances and ledger untouched.
        let untouched = store.fetch_account(second.id).await.unwrap().unwrap();
        assert_eq!(untouched.balance, Money::from_dollars(10));
        assert!(store.ledger_entries().await.is_empty());
    }

    #[tokio::test]
    async fn deleted_row_counts_as_conflict() {
        let store = InMemoryStore::new();
        let row = account(Money::from_dollars(10));
        let id = row.id;
        let token = row.version;
        store.insert_account(row.clone()).await;
        store.remove_account(id).await;

        let error = store
            .commit(WriteBatch::new().with_account(row, token))
            .await
            .unwrap_err();
        assert!(error.is_conflict());
    }

    #[tokio::test]
    async fn ticket_filter_matches_availability() {
        let store = InMemoryStore::new();
        let now = test_clock().now();
        let ids = seed_tickets(&store, 3, Money::from_dollars(20), now, 30).await;

        let reserved = store
            .fetch_ticket(ids[0])
            .await
            .unwrap()
            .unwrap()
            .reserved(AccountId::new(), now);
        let token = reserved.version;
        store
            .commit(WriteBatch::new().with_ticket(reserved, token))
            .await
            .unwrap();

        assert_eq!(store.ticket_ids(Some(true)).await.unwrap().len(), 2);
        assert_eq!(store.ticket_ids(Some(false)).await.unwrap().len(), 1);
        assert_eq!(store.ticket_ids(None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn failing_store_trips_after_threshold() {
        let inner = Arc::new(InMemoryStore::new());
        seed_accounts(&inner, 1, Money::from_dollars(10)).await;
        let flaky = FailingStore::after(inner, 2);

        assert!(flaky.account_ids().await.is_ok());
        assert!(flaky.account_ids().await.is_ok());
        let error = flaky.account_ids().await.unwrap_err();
        assert!(!error.is_conflict());
    }
}
