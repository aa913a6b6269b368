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

//! Error types for journal posting.

use crate::base::{AccountId, EntryId, EntryNumber};
use rust_decimal::Decimal;
use thiserror::Error;

/// Journal posting errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Line has neither a debit nor a credit amount
    #[error("line must carry a debit or a credit amount")]
    MissingAmount,

    /// Line has both a debit and a credit amount
    #[error("line cannot carry both a debit and a credit amount")]
    DebitAndCredit,

    /// Debit or credit amount is negative
    #[error("invalid amount (must not be negative)")]
    InvalidAmount,

    /// Journal entry has fewer than two lines
    #[error("journal entry requires at least two lines")]
    TooFewLines,

    /// Total debits and total credits differ beyond the tolerance
    #[error("journal entry is out of balance (debits {debits}, credits {credits})")]
    Unbalanced { debits: Decimal, credits: Decimal },

    /// Referenced account does not exist
    #[error("account {0} not found")]
    AccountNotFound(AccountId),

    /// Referenced account exists but is inactive
    #[error("account {0} is inactive")]
    AccountInactive(AccountId),

    /// Account ID is already registered in the chart of accounts
    #[error("duplicate account {0}")]
    DuplicateAccount(AccountId),

    /// Entry ID is already present in the ledger
    #[error("duplicate journal entry {0}")]
    DuplicateEntry(EntryId),

    /// Entry number is already present in the ledger
    #[error("duplicate entry number {0}")]
    DuplicateEntryNumber(EntryNumber),

    /// Referenced journal entry does not exist
    #[error("journal entry {0} not found")]
    EntryNotFound(EntryId),

    /// Entry was not created manually and cannot be reversed
    #[error("journal entry {0} was not created manually and cannot be reversed")]
    NotReversible(EntryId),
}
