//! Race-condition tests: concurrent writers against single rows.
//!
//! The store is wrapped in a [`ConcurrencyProbe`], whose per-operation
//! pause forces the contenders to interleave at the suspension points —
//! every contender reads before any of them commits, so the conditional
//! write is what decides the race.
//!
//! Run with: `cargo test --test concurrency_test`

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use futures::future::join_all;
use ledgerflow_core::{Clock, Money, Store, TransactionStatus};
use ledgerflow_gateway::{BookingGateway, FaultLog, StoreGateway};
use ledgerflow_testing::{seed_accounts, seed_tickets, test_clock, ConcurrencyProbe, InMemoryStore};
use std::sync::Arc;

#[tokio::test]
async fn racing_transfers_have_exactly_one_winner() {
    let backing = Arc::new(InMemoryStore::new());
    let roster = seed_accounts(&backing, 2, Money::from_dollars(1000)).await;
    let probe = Arc::new(ConcurrencyProbe::wrap(backing.clone()));
    let gateway = StoreGateway::new(
        probe,
        Arc::new(test_clock()),
        roster.clone(),
        FaultLog::spawn(),
    );

    // Both contenders hold the same stale snapshots.
    let from = backing.fetch_account(roster[0]).await.unwrap().unwrap();
    let to = backing.fetch_account(roster[1]).await.unwrap().unwrap();

    let (first, second) = tokio::join!(
        gateway.transfer(from.clone(), to.clone(), Money::from_dollars(600)),
        gateway.transfer(from.clone(), to.clone(), Money::from_dollars(600)),
    );

    let successes = [&first, &second]
        .iter()
        .filter(|result| result.status == TransactionStatus::Success)
        .count();
    assert_eq!(successes, 1, "at most one racing writer may commit");

    let loser = if first.status == TransactionStatus::Success {
        &second
    } else {
        &first
    };
    assert!(
        matches!(
            loser.status,
            TransactionStatus::OutdatedFromAccount
                | TransactionStatus::FromAccountInsufficientFunds
        ),
        "loser settled as {}",
        loser.status
    );

    // Conservation: exactly one transfer moved money.
    let from_after = backing.fetch_account(roster[0]).await.unwrap().unwrap();
    let to_after = backing.fetch_account(roster[1]).await.unwrap().unwrap();
    assert_eq!(from_after.balance, Money::from_dollars(400));
    assert_eq!(to_after.balance, Money::from_dollars(1600));

    // A refreshed loser snapshot carries the committed state.
    if loser.status == TransactionStatus::OutdatedFromAccount {
        let refreshed = loser.data.as_ref().expect("outdated carries the fresh row");
        assert_eq!(refreshed.balance, Money::from_dollars(400));
        assert_eq!(refreshed.version, from_after.version);
    }
}

#[tokio::test]
async fn racing_deposits_refresh_the_loser() {
    let backing = Arc::new(InMemoryStore::new());
    let roster = seed_accounts(&backing, 1, Money::from_dollars(1000)).await;
    let probe = Arc::new(ConcurrencyProbe::wrap(backing.clone()));
    let gateway = StoreGateway::new(
        probe,
        Arc::new(test_clock()),
        roster.clone(),
        FaultLog::spawn(),
    );

    let snapshot = backing.fetch_account(roster[0]).await.unwrap().unwrap();

    let (first, second) = tokio::join!(
        gateway.deposit(snapshot.clone(), Money::from_dollars(200)),
        gateway.deposit(snapshot.clone(), Money::from_dollars(500)),
    );

    let statuses = [first.status, second.status];
    assert!(statuses.contains(&TransactionStatus::Success));
    assert!(statuses.contains(&TransactionStatus::OutdatedAccount));

    // Only the winning deposit landed.
    let after = backing.fetch_account(roster[0]).await.unwrap().unwrap();
    assert!(
        after.balance == Money::from_dollars(1200) || after.balance == Money::from_dollars(1500)
    );

    let loser = if first.status == TransactionStatus::OutdatedAccount {
        &first
    } else {
        &second
    };
    let refreshed = loser.data.as_ref().expect("outdated carries the fresh row");
    assert_eq!(refreshed.balance, after.balance);
    assert_eq!(refreshed.version, after.version);
}

#[tokio::test]
async fn ticket_booking_is_exclusive_under_contention() {
    let backing = Arc::new(InMemoryStore::new());
    let roster = seed_accounts(&backing, 5, Money::from_dollars(1000)).await;
    let now = test_clock().now();
    let tickets = seed_tickets(&backing, 1, Money::from_dollars(25), now, 30).await;
    let probe = Arc::new(ConcurrencyProbe::wrap(backing.clone()));
    let gateway = StoreGateway::new(
        probe,
        Arc::new(test_clock()),
        roster.clone(),
        FaultLog::spawn(),
    );

    let ticket = backing.fetch_ticket(tickets[0]).await.unwrap().unwrap();
    let mut contenders = Vec::new();
    for id in &roster {
        let holder = backing.fetch_account(*id).await.unwrap().unwrap();
        contenders.push(gateway.book_ticket(holder, ticket.clone()));
    }

    let results = join_all(contenders).await;

    let successes = results
        .iter()
        .filter(|result| result.status == TransactionStatus::Success)
        .count();
    assert_eq!(successes, 1, "a ticket can be booked exactly once");

    for result in results
        .iter()
        .filter(|result| result.status != TransactionStatus::Success)
    {
        assert!(
            matches!(
                result.status,
                TransactionStatus::TicketAlreadyBooked | TransactionStatus::OutdatedTicket
            ),
            "loser settled as {}",
            result.status
        );
    }

    let final_state = backing.fetch_ticket(tickets[0]).await.unwrap().unwrap();
    assert!(!final_state.is_available);
    assert!(final_state.reserved_by.is_some());
    // One booking, one charge.
    assert_eq!(backing.ledger_entries().await.len(), 1);
}
