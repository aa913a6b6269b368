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

//! # Ledger Poster
//!
//! This library provides a double-entry journal posting engine: balanced
//! sets of debit/credit lines are validated, persisted, and applied to
//! account running balances as one atomic unit. Manually created entries
//! can be reversed, restoring every affected balance exactly.
//!
//! ## Core Components
//!
//! - [`LedgerPoster`]: Posts and reverses journal entries
//! - [`MemoryLedger`]: Transactional in-memory store with per-account row
//!   locks (implements [`LedgerStore`])
//! - [`Account`] / [`AccountType`]: Chart of accounts with normal-side
//!   balance polarity
//! - [`EntryDraft`] / [`JournalEntry`]: Proposed and posted entries
//! - [`LedgerError`]: Error types for validation, persistence, and reversal
//!   failures
//!
//! ## Example
//!
//! ```
//! use ledger_poster_rs::{
//!     Account, AccountId, AccountType, EntryDraft, EntryReference, JournalLine, LedgerPoster,
//!     MemoryLedger,
//! };
//! use chrono::NaiveDate;
//! use rust_decimal_macros::dec;
//!
//! let ledger = MemoryLedger::new();
//! ledger
//!     .add_account(Account::new(AccountId(1), "1000", "Cash", AccountType::Asset))
//!     .unwrap();
//! ledger
//!     .add_account(Account::new(AccountId(2), "4000", "Sales Revenue", AccountType::Income))
//!     .unwrap();
//!
//! let poster = LedgerPoster::new(&ledger);
//! let draft = EntryDraft::new(
//!     NaiveDate::from_ymd_opt(2026, 8, 6).unwrap(),
//!     "Cash sale",
//!     EntryReference::Journal,
//!     "admin",
//! )
//! .with_line(JournalLine::debit(AccountId(1), dec!(100.00)))
//! .with_line(JournalLine::credit(AccountId(2), dec!(100.00)));
//!
//! poster.post(draft).unwrap();
//!
//! // Each balance moved by its own polarity: debit-normal Cash up by the
//! // debit, credit-normal Revenue up by the credit.
//! assert_eq!(ledger.account(AccountId(1)).unwrap().balance, dec!(100.00));
//! assert_eq!(ledger.account(AccountId(2)).unwrap().balance, dec!(100.00));
//! ```
//!
//! ## Thread Safety
//!
//! [`MemoryLedger`] serializes concurrent postings to the same account via
//! per-account locks while postings to disjoint accounts proceed in
//! parallel. Multi-account commits acquire their locks in ascending account
//! ID order.

pub mod account;
mod base;
pub mod entry;
pub mod error;
mod poster;
mod registry;
mod sequence;
mod store;

pub use account::{Account, AccountType, NormalSide};
pub use base::{AccountId, EntryId, EntryNumber};
pub use entry::{
    is_balanced, is_balanced_within, totals, validate_lines, EntryDraft, EntryReference,
    JournalEntry, JournalLine, BALANCE_TOLERANCE,
};
pub use error::LedgerError;
pub use poster::{AuditHook, LedgerPoster, PostSummary};
pub use registry::EntryRegistry;
pub use sequence::{DateSequence, EntrySequence};
pub use store::{AccountDelta, LedgerStore, MemoryLedger};
