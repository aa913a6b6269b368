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

//! Journal posting engine.
//!
//! The [`LedgerPoster`] is the central component: it validates a proposed
//! journal entry, turns its lines into signed balance deltas, and commits
//! header + lines + deltas through the store as one atomic unit.
//!
//! # Posting
//!
//! - **Validate**: line shape, line count, balance invariant, account
//!   existence and active flag. Fails fast with no writes.
//! - **Number**: the injected [`EntrySequence`] produces a unique,
//!   date-based entry number.
//! - **Commit**: the store applies everything under row locks; a failure
//!   rolls the whole posting back.
//! - **Audit**: an optional hook fires after a successful commit only,
//!   outside the atomic unit.
//!
//! # Concurrency
//!
//! The poster itself is stateless apart from its collaborators; posting
//! the same accounts from multiple threads is serialized by the store's
//! row locks.

use crate::base::EntryId;
use crate::entry::{
    validate_lines, EntryDraft, EntryReference, JournalEntry, BALANCE_TOLERANCE,
};
use crate::error::LedgerError;
use crate::sequence::{DateSequence, EntrySequence};
use crate::store::{AccountDelta, LedgerStore};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Activity-log callback, invoked after a successful post.
pub type AuditHook = Box<dyn Fn(EntryId, &PostSummary) + Send + Sync>;

/// What the audit hook learns about a posted entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostSummary {
    pub number: crate::base::EntryNumber,
    pub date: NaiveDate,
    pub description: String,
    pub reference: EntryReference,
    /// Total debits (== total credits within tolerance).
    pub amount: Decimal,
    pub line_count: usize,
}

/// Double-entry journal poster.
///
/// Generic over the persistence boundary and the entry-number source so
/// both can be injected; `&MemoryLedger` works directly as the store.
///
/// # Invariants
///
/// - A posted entry always satisfies the balance invariant.
/// - Balances change only through `post` and `reverse`, by exactly the
///   signed delta each line implies for its account's normal side.
/// - No partially posted entry is ever observable; failures leave the
///   ledger untouched.
pub struct LedgerPoster<S, Q = DateSequence> {
    store: S,
    sequence: Q,
    tolerance: Decimal,
    on_posted: Option<AuditHook>,
}

impl<S: LedgerStore> LedgerPoster<S> {
    /// Creates a poster over `store` with date-based numbering and the
    /// default balance tolerance.
    pub fn new(store: S) -> Self {
        LedgerPoster {
            store,
            sequence: DateSequence::new(),
            tolerance: BALANCE_TOLERANCE,
            on_posted: None,
        }
    }
}

impl<S: LedgerStore, Q: EntrySequence> LedgerPoster<S, Q> {
    /// Replaces the entry-number source.
    pub fn with_sequence<Q2: EntrySequence>(self, sequence: Q2) -> LedgerPoster<S, Q2> {
        LedgerPoster {
            store: self.store,
            sequence,
            tolerance: self.tolerance,
            on_posted: self.on_posted,
        }
    }

    /// Overrides the balance tolerance (e.g. zero for integer-cent
    /// ledgers).
    pub fn with_tolerance(mut self, tolerance: Decimal) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Installs an activity-log hook, fired after each successful post.
    /// Not part of the atomic unit: a posting is durable before the hook
    /// runs, and reversals do not fire it.
    pub fn with_audit_hook(
        mut self,
        hook: impl Fn(EntryId, &PostSummary) + Send + Sync + 'static,
    ) -> Self {
        self.on_posted = Some(Box::new(hook));
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Posts a journal entry.
    ///
    /// Validates the draft, generates an entry number and ID, computes one
    /// signed balance delta per line, and commits everything atomically.
    /// On any error nothing is persisted and no balance changes.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::TooFewLines`] - fewer than two lines.
    /// - [`LedgerError::MissingAmount`] / [`LedgerError::DebitAndCredit`] /
    ///   [`LedgerError::InvalidAmount`] - malformed line.
    /// - [`LedgerError::Unbalanced`] - debits and credits differ beyond the
    ///   tolerance.
    /// - [`LedgerError::AccountNotFound`] / [`LedgerError::AccountInactive`] -
    ///   a line references a missing or inactive account.
    /// - [`LedgerError::DuplicateEntry`] / [`LedgerError::DuplicateEntryNumber`] -
    ///   commit-time collision; nothing was written.
    pub fn post(&self, draft: EntryDraft) -> Result<EntryId, LedgerError> {
        validate_lines(&draft.lines, self.tolerance)?;

        // Resolve each line against the chart of accounts and compute the
        // signed delta its account's polarity implies.
        let mut deltas = Vec::with_capacity(draft.lines.len());
        for line in &draft.lines {
            let account = self
                .store
                .account(line.account_id)
                .ok_or(LedgerError::AccountNotFound(line.account_id))?;
            if !account.active {
                return Err(LedgerError::AccountInactive(line.account_id));
            }
            deltas.push(AccountDelta::new(
                line.account_id,
                account.kind.delta(line.debit, line.credit),
            ));
        }

        let number = self.sequence.next(draft.date);
        let id = self.store.next_entry_id();

        let entry = JournalEntry {
            id,
            number,
            date: draft.date,
            description: draft.description,
            reference: draft.reference,
            created_by: draft.created_by,
            created_at: Utc::now(),
            lines: draft.lines,
        };

        let summary = PostSummary {
            number: entry.number.clone(),
            date: entry.date,
            description: entry.description.clone(),
            reference: entry.reference,
            amount: entry.total_debits(),
            line_count: entry.lines.len(),
        };

        self.store.commit(entry, &deltas)?;

        if let Some(hook) = &self.on_posted {
            hook(id, &summary);
        }

        Ok(id)
    }

    /// Reverses a manually created entry: applies the inverse balance
    /// deltas and deletes the entry, atomically.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::EntryNotFound`] - no such entry (or already
    ///   reversed).
    /// - [`LedgerError::NotReversible`] - the entry was spawned by another
    ///   document and must stay.
    pub fn reverse(&self, id: EntryId) -> Result<(), LedgerError> {
        let entry = self.store.entry(id).ok_or(LedgerError::EntryNotFound(id))?;
        if !entry.reference.is_manual() {
            return Err(LedgerError::NotReversible(id));
        }

        // Swapping the debit/credit roles yields the inverse delta.
        // Deactivated accounts still take the adjustment; the active flag
        // gates new postings only.
        let mut deltas = Vec::with_capacity(entry.lines.len());
        for line in &entry.lines {
            let account = self
                .store
                .account(line.account_id)
                .ok_or(LedgerError::AccountNotFound(line.account_id))?;
            deltas.push(AccountDelta::new(
                line.account_id,
                account.kind.delta(line.credit, line.debit),
            ));
        }

        self.store.remove(id, &deltas)
    }
}
