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

//! Ledger persistence.
//!
//! [`LedgerStore`] is the transaction boundary the poster runs against: an
//! explicit session object, injected per call site rather than reached
//! through a global connection. [`MemoryLedger`] implements it with
//! per-account row locks.
//!
//! # Atomicity
//!
//! `commit` and `remove` are all-or-nothing. Row locks for every affected
//! account are acquired in ascending account-ID order (consistent global
//! order, no deadlock), the active flag is re-checked inside the critical
//! section, and the entry registration happens before the first balance
//! write. Every fallible step precedes the first mutation, so a failure
//! leaves no trace.

use crate::account::Account;
use crate::base::{AccountId, EntryId};
use crate::entry::{is_balanced, JournalEntry};
use crate::error::LedgerError;
use crate::registry::EntryRegistry;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Signed running-balance adjustment for one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountDelta {
    pub account_id: AccountId,
    pub amount: Decimal,
}

impl AccountDelta {
    pub fn new(account_id: AccountId, amount: Decimal) -> Self {
        Self { account_id, amount }
    }

    /// The delta that undoes this one.
    pub fn inverse(&self) -> Self {
        Self {
            account_id: self.account_id,
            amount: -self.amount,
        }
    }
}

/// Transactional persistence boundary for the poster.
///
/// `commit` and `remove` are the atomic units: header, lines, and balance
/// deltas land together or not at all. Implementations over a real
/// database map them onto one transaction with row locks on the account
/// balance rows.
pub trait LedgerStore {
    /// Snapshot of an account, if it exists.
    fn account(&self, id: AccountId) -> Option<Account>;

    /// Snapshot of a posted entry, if it exists.
    fn entry(&self, id: EntryId) -> Option<JournalEntry>;

    /// Allocates the next entry ID. Monotonic, never reused.
    fn next_entry_id(&self) -> EntryId;

    /// Atomically persists `entry` and applies `deltas`.
    fn commit(&self, entry: JournalEntry, deltas: &[AccountDelta]) -> Result<(), LedgerError>;

    /// Atomically removes the entry and applies `deltas` (the inverse of
    /// the ones committed with it).
    fn remove(&self, id: EntryId, deltas: &[AccountDelta]) -> Result<(), LedgerError>;
}

impl<S: LedgerStore + ?Sized> LedgerStore for &S {
    fn account(&self, id: AccountId) -> Option<Account> {
        (**self).account(id)
    }

    fn entry(&self, id: EntryId) -> Option<JournalEntry> {
        (**self).entry(id)
    }

    fn next_entry_id(&self) -> EntryId {
        (**self).next_entry_id()
    }

    fn commit(&self, entry: JournalEntry, deltas: &[AccountDelta]) -> Result<(), LedgerError> {
        (**self).commit(entry, deltas)
    }

    fn remove(&self, id: EntryId, deltas: &[AccountDelta]) -> Result<(), LedgerError> {
        (**self).remove(id, deltas)
    }
}

/// In-memory transactional ledger store.
///
/// Account rows live behind individual [`Mutex`]es inside a [`DashMap`],
/// mirroring row-level locking: concurrent commits touching disjoint
/// accounts proceed in parallel, commits sharing an account serialize.
pub struct MemoryLedger {
    /// Account rows indexed by account ID.
    accounts: DashMap<AccountId, Arc<Mutex<Account>>>,
    /// Posted entries with ID/number duplicate detection.
    registry: EntryRegistry,
    /// Entry ID allocator.
    next_id: AtomicU64,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            registry: EntryRegistry::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers an account in the chart of accounts.
    ///
    /// # Errors
    ///
    /// [`LedgerError::DuplicateAccount`] if the ID is already registered.
    pub fn add_account(&self, account: Account) -> Result<(), LedgerError> {
        match self.accounts.entry(account.id) {
            Entry::Occupied(_) => Err(LedgerError::DuplicateAccount(account.id)),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(account)));
                Ok(())
            }
        }
    }

    /// Activates or deactivates an account. Accounts are never deleted;
    /// deactivation only blocks new postings.
    pub fn set_active(&self, id: AccountId, active: bool) -> Result<(), LedgerError> {
        let row = self.row(id)?;
        row.lock().active = active;
        Ok(())
    }

    /// Snapshot of one account.
    pub fn account(&self, id: AccountId) -> Option<Account> {
        let row = self.row(id).ok()?;
        let snapshot = row.lock().clone();
        Some(snapshot)
    }

    /// Snapshots of all accounts, sorted by ID.
    pub fn accounts(&self) -> Vec<Account> {
        let rows: Vec<Arc<Mutex<Account>>> =
            self.accounts.iter().map(|r| Arc::clone(r.value())).collect();
        let mut all: Vec<Account> = rows.iter().map(|row| row.lock().clone()).collect();
        all.sort_by_key(|a| a.id);
        all
    }

    /// Snapshot of one posted entry.
    pub fn entry(&self, id: EntryId) -> Option<JournalEntry> {
        self.registry.get(id)
    }

    /// All posted entries in posting order.
    pub fn entries(&self) -> Vec<JournalEntry> {
        self.registry.sorted()
    }

    /// Post-hoc audit query: recomputes the balance invariant from stored
    /// lines and returns the IDs of any entries that fail it.
    pub fn unbalanced_entries(&self) -> Vec<EntryId> {
        self.registry
            .sorted()
            .into_iter()
            .filter(|e| !is_balanced(&e.lines))
            .map(|e| e.id)
            .collect()
    }

    fn row(&self, id: AccountId) -> Result<Arc<Mutex<Account>>, LedgerError> {
        self.accounts
            .get(&id)
            .map(|r| Arc::clone(r.value()))
            .ok_or(LedgerError::AccountNotFound(id))
    }

    /// Row handles for every account in `deltas`, deduplicated and sorted
    /// by account ID. All commits lock rows in this order.
    fn rows_for(
        &self,
        deltas: &[AccountDelta],
    ) -> Result<Vec<(AccountId, Arc<Mutex<Account>>)>, LedgerError> {
        let mut ids: Vec<AccountId> = deltas.iter().map(|d| d.account_id).collect();
        ids.sort();
        ids.dedup();
        ids.into_iter()
            .map(|id| self.row(id).map(|row| (id, row)))
            .collect()
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerStore for MemoryLedger {
    fn account(&self, id: AccountId) -> Option<Account> {
        MemoryLedger::account(self, id)
    }

    fn entry(&self, id: EntryId) -> Option<JournalEntry> {
        MemoryLedger::entry(self, id)
    }

    fn next_entry_id(&self) -> EntryId {
        EntryId(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn commit(&self, entry: JournalEntry, deltas: &[AccountDelta]) -> Result<(), LedgerError> {
        let rows = self.rows_for(deltas)?;
        let mut guards: Vec<(AccountId, MutexGuard<'_, Account>)> =
            rows.iter().map(|(id, row)| (*id, row.lock())).collect();

        // Re-check the active flag under the row locks; the snapshot the
        // caller validated against may be stale by now.
        for (id, guard) in &guards {
            if !guard.active {
                return Err(LedgerError::AccountInactive(*id));
            }
        }

        // Registration is the last fallible step; balances are untouched
        // if the ID or number turns out to be a duplicate.
        self.registry.push(entry)?;

        for delta in deltas {
            // rows_for covered every delta account, so the guard exists.
            let (_, guard) = guards
                .iter_mut()
                .find(|(id, _)| *id == delta.account_id)
                .unwrap();
            guard.balance += delta.amount;
        }

        Ok(())
    }

    fn remove(&self, id: EntryId, deltas: &[AccountDelta]) -> Result<(), LedgerError> {
        let rows = self.rows_for(deltas)?;
        let mut guards: Vec<(AccountId, MutexGuard<'_, Account>)> =
            rows.iter().map(|(id, row)| (*id, row.lock())).collect();

        // The registry removal decides which of two concurrent reversals
        // wins; the loser sees EntryNotFound and applies nothing.
        self.registry
            .remove(id)
            .ok_or(LedgerError::EntryNotFound(id))?;

        for delta in deltas {
            let (_, guard) = guards
                .iter_mut()
                .find(|(id, _)| *id == delta.account_id)
                .unwrap();
            guard.balance += delta.amount;
        }

        Ok(())
    }
}
