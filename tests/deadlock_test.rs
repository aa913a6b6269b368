// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Deadlock detection tests using parking_lot's built-in deadlock detector.
//!
//! Multi-account commits take one row lock per affected account, so the
//! dangerous shape is two commits locking overlapping account sets in
//! different orders. These tests hammer that shape and let the
//! `deadlock_detection` feature flag any cycle in the lock graph.

use chrono::NaiveDate;
use ledger_poster_rs::{
    Account, AccountId, AccountType, EntryDraft, EntryReference, JournalLine, LedgerPoster,
    MemoryLedger,
};
use parking_lot::deadlock;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

// === Deadlock Detection Infrastructure ===

/// Starts a background thread that checks for deadlocks.
/// Returns a handle to stop the detector.
fn start_deadlock_detector() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();

    thread::spawn(move || {
        while running_clone.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(100));
            let deadlocks = deadlock::check_deadlock();
            if !deadlocks.is_empty() {
                eprintln!("\n=== DEADLOCK DETECTED ===");
                for (i, threads) in deadlocks.iter().enumerate() {
                    eprintln!("\nDeadlock #{}", i + 1);
                    for t in threads {
                        eprintln!("Thread ID: {:?}", t.thread_id());
                        eprintln!("Backtrace:\n{:#?}", t.backtrace());
                    }
                }
                panic!("Deadlock detected! See output above for details.");
            }
        }
    });

    running
}

/// Stops the deadlock detector.
fn stop_deadlock_detector(running: Arc<AtomicBool>) {
    running.store(false, Ordering::SeqCst);
    thread::sleep(Duration::from_millis(150)); // Let detector thread exit
}

// === Helpers ===

const NUM_ACCOUNTS: u32 = 10;

/// A ring of asset accounts plus one revenue account at the end.
fn ring_chart() -> MemoryLedger {
    let ledger = MemoryLedger::new();
    for i in 1..=NUM_ACCOUNTS {
        ledger
            .add_account(Account::new(
                AccountId(i),
                format!("10{i:02}"),
                format!("Asset {i}"),
                AccountType::Asset,
            ))
            .unwrap();
    }
    ledger
        .add_account(Account::new(
            AccountId(NUM_ACCOUNTS + 1),
            "4000",
            "Sales Revenue",
            AccountType::Income,
        ))
        .unwrap();
    ledger
}

fn draft(lines: Vec<JournalLine>) -> EntryDraft {
    EntryDraft {
        date: NaiveDate::from_ymd_opt(2026, 8, 6).unwrap(),
        description: "stress entry".to_string(),
        reference: EntryReference::Journal,
        created_by: "tests".to_string(),
        lines,
    }
}

// === Tests ===

/// Test high contention on a single account pair with many threads.
#[test]
fn no_deadlock_high_contention_single_pair() {
    let detector = start_deadlock_detector();
    let ledger = ring_chart();
    let poster = LedgerPoster::new(&ledger);

    const NUM_THREADS: usize = 50;
    const OPS_PER_THREAD: usize = 40;

    let cash = AccountId(1);
    let revenue = AccountId(NUM_ACCOUNTS + 1);

    thread::scope(|s| {
        for _ in 0..NUM_THREADS {
            s.spawn(|| {
                for i in 0..OPS_PER_THREAD {
                    if i % 3 == 2 {
                        // Read operations interleaved with commits
                        let _ = ledger.account(cash);
                        let _ = ledger.accounts();
                    } else {
                        poster
                            .post(draft(vec![
                                JournalLine::debit(cash, dec!(10.00)),
                                JournalLine::credit(revenue, dec!(10.00)),
                            ]))
                            .unwrap();
                    }
                }
            });
        }
    });

    stop_deadlock_detector(detector);

    // Verify final state is consistent
    let posted = ledger.entries().len();
    assert_eq!(
        ledger.account(cash).unwrap().balance,
        Decimal::from(posted as u64 * 10)
    );
    println!(
        "High contention test passed: {} threads × {} ops",
        NUM_THREADS, OPS_PER_THREAD
    );
}

/// Test entries whose lock sets overlap in shifting, opposing orders.
#[test]
fn no_deadlock_cross_account_entries() {
    let detector = start_deadlock_detector();
    let ledger = ring_chart();
    let poster = LedgerPoster::new(&ledger);

    const NUM_THREADS: usize = 20;
    const OPS_PER_THREAD: usize = 50;

    thread::scope(|s| {
        for thread_id in 0..NUM_THREADS {
            let poster = &poster;
            s.spawn(move || {
                for i in 0..OPS_PER_THREAD {
                    // Each thread walks the account ring at its own offset,
                    // and odd threads list their lines in reverse order.
                    let a = AccountId(((thread_id + i) % NUM_ACCOUNTS as usize) as u32 + 1);
                    let b = AccountId(((thread_id + i + 1) % NUM_ACCOUNTS as usize) as u32 + 1);

                    let mut lines = vec![
                        JournalLine::debit(a, dec!(5.00)),
                        JournalLine::credit(b, dec!(5.00)),
                    ];
                    if thread_id % 2 == 1 {
                        lines.reverse();
                    }

                    poster.post(draft(lines)).unwrap();
                }
            });
        }
    });

    stop_deadlock_detector(detector);

    // Transfers around the ring conserve the total.
    let total: Decimal = ledger.accounts().iter().map(|a| a.balance).sum();
    assert_eq!(total, Decimal::ZERO);
    assert_eq!(ledger.entries().len(), NUM_THREADS * OPS_PER_THREAD);
}

/// Test posting and reversing concurrently against shared accounts.
#[test]
fn no_deadlock_post_and_reverse_interleaved() {
    let detector = start_deadlock_detector();
    let ledger = ring_chart();
    let poster = LedgerPoster::new(&ledger);

    const NUM_THREADS: usize = 10;
    const OPS_PER_THREAD: usize = 30;

    let cash = AccountId(1);
    let revenue = AccountId(NUM_ACCOUNTS + 1);

    thread::scope(|s| {
        for _ in 0..NUM_THREADS {
            s.spawn(|| {
                for i in 0..OPS_PER_THREAD {
                    let id = poster
                        .post(draft(vec![
                            JournalLine::debit(cash, dec!(7.00)),
                            JournalLine::credit(revenue, dec!(7.00)),
                        ]))
                        .unwrap();

                    // Immediately reverse every other posting.
                    if i % 2 == 0 {
                        poster.reverse(id).unwrap();
                    }
                }
            });
        }
    });

    stop_deadlock_detector(detector);

    let surviving = ledger.entries().len();
    assert_eq!(surviving, NUM_THREADS * OPS_PER_THREAD / 2);
    assert_eq!(
        ledger.account(cash).unwrap().balance,
        Decimal::from(surviving as u64 * 7)
    );
}
