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

//! Journal entries and lines.
//!
//! An entry has exactly two externally visible states:
//! - Posted: header + lines persisted, balances adjusted
//! - Reversed: removed entirely, balances restored (manual entries only)
//!
//! The balance invariant lives here as [`is_balanced`] so posting-time
//! validation and any later recomputation from stored lines share one
//! definition.

use crate::base::{AccountId, EntryId, EntryNumber};
use crate::error::LedgerError;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Maximum tolerated difference between total debits and total credits,
/// in currency units.
pub const BALANCE_TOLERANCE: Decimal = dec!(0.01);

/// What a journal entry was created from.
///
/// `Journal` marks a manually entered adjustment; only those may be
/// reversed. The other variants link the entry to the upstream document
/// that spawned it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryReference {
    Journal,
    Invoice(u64),
    Payment(u64),
    Expense(u64),
    RentPayment(u64),
}

impl EntryReference {
    /// Manually created entries are the only reversible ones.
    pub fn is_manual(&self) -> bool {
        matches!(self, EntryReference::Journal)
    }
}

/// One side of a journal entry.
///
/// Exactly one of `debit`/`credit` must be positive; the other stays zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalLine {
    pub account_id: AccountId,
    pub debit: Decimal,
    pub credit: Decimal,
    pub description: Option<String>,
}

impl JournalLine {
    /// A debit line against `account_id`.
    pub fn debit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            debit: amount,
            credit: Decimal::ZERO,
            description: None,
        }
    }

    /// A credit line against `account_id`.
    pub fn credit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            debit: Decimal::ZERO,
            credit: amount,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Checks the one-sided shape of the line.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] - a negative debit or credit.
    /// - [`LedgerError::DebitAndCredit`] - both sides positive.
    /// - [`LedgerError::MissingAmount`] - neither side positive.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.debit < Decimal::ZERO || self.credit < Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }
        match (self.debit > Decimal::ZERO, self.credit > Decimal::ZERO) {
            (true, true) => Err(LedgerError::DebitAndCredit),
            (false, false) => Err(LedgerError::MissingAmount),
            _ => Ok(()),
        }
    }
}

/// A proposed journal entry, before posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDraft {
    pub date: NaiveDate,
    pub description: String,
    pub reference: EntryReference,
    pub created_by: String,
    pub lines: Vec<JournalLine>,
}

impl EntryDraft {
    pub fn new(
        date: NaiveDate,
        description: impl Into<String>,
        reference: EntryReference,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            date,
            description: description.into(),
            reference,
            created_by: created_by.into(),
            lines: Vec::new(),
        }
    }

    pub fn with_line(mut self, line: JournalLine) -> Self {
        self.lines.push(line);
        self
    }
}

/// A posted journal entry. Immutable once persisted; the only way out of
/// the ledger is a full reversal of a manual entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: EntryId,
    pub number: EntryNumber,
    pub date: NaiveDate,
    pub description: String,
    pub reference: EntryReference,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<JournalLine>,
}

impl JournalEntry {
    pub fn total_debits(&self) -> Decimal {
        totals(&self.lines).0
    }

    pub fn total_credits(&self) -> Decimal {
        totals(&self.lines).1
    }
}

/// Sums `(total_debits, total_credits)` over a set of lines.
pub fn totals(lines: &[JournalLine]) -> (Decimal, Decimal) {
    lines.iter().fold(
        (Decimal::ZERO, Decimal::ZERO),
        |(debits, credits), line| (debits + line.debit, credits + line.credit),
    )
}

/// The double-entry invariant with the default [`BALANCE_TOLERANCE`].
pub fn is_balanced(lines: &[JournalLine]) -> bool {
    is_balanced_within(lines, BALANCE_TOLERANCE)
}

/// The double-entry invariant with an explicit tolerance.
pub fn is_balanced_within(lines: &[JournalLine], tolerance: Decimal) -> bool {
    let (debits, credits) = totals(lines);
    (debits - credits).abs() <= tolerance
}

/// Full pre-posting validation of a line set: count, per-line shape, and
/// the balance invariant. Pure; safe to call repeatedly.
///
/// # Errors
///
/// - [`LedgerError::TooFewLines`] - fewer than two lines.
/// - [`LedgerError::Unbalanced`] - debits and credits differ beyond
///   `tolerance`.
/// - Any per-line error from [`JournalLine::validate`].
pub fn validate_lines(lines: &[JournalLine], tolerance: Decimal) -> Result<(), LedgerError> {
    if lines.len() < 2 {
        return Err(LedgerError::TooFewLines);
    }
    for line in lines {
        line.validate()?;
    }
    let (debits, credits) = totals(lines);
    if (debits - credits).abs() > tolerance {
        return Err(LedgerError::Unbalanced { debits, credits });
    }
    Ok(())
}
