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

//! Chart-of-accounts types and balance polarity math.
//!
//! Every account type has a normal balance side. A posted debit or credit
//! moves the running balance by a signed delta determined by that side:
//!
//!   Asset, Expense            (debit-normal)   balance += debit - credit
//!   Liability, Equity, Income (credit-normal)  balance += credit - debit
//!
//! # Example
//!
//! ```
//! use ledger_poster_rs::{Account, AccountId, AccountType};
//! use rust_decimal::Decimal;
//!
//! let cash = Account::new(AccountId(1), "1000", "Cash", AccountType::Asset);
//! assert_eq!(cash.balance, Decimal::ZERO);
//! assert!(cash.active);
//! ```

use crate::base::AccountId;
use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// The side on which an account type's balance normally increases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalSide {
    Debit,
    Credit,
}

/// High-level account classification; determines the normal balance side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Asset,
    Liability,
    Equity,
    Income,
    Expense,
}

impl AccountType {
    /// Returns the side on which this account type's balance increases.
    pub fn normal_side(&self) -> NormalSide {
        match self {
            AccountType::Asset | AccountType::Expense => NormalSide::Debit,
            AccountType::Liability | AccountType::Equity | AccountType::Income => {
                NormalSide::Credit
            }
        }
    }

    /// Signed running-balance change implied by a `(debit, credit)` pair.
    ///
    /// Debit-normal accounts grow with debits, credit-normal accounts grow
    /// with credits. The result may be negative.
    pub fn delta(&self, debit: Decimal, credit: Decimal) -> Decimal {
        match self.normal_side() {
            NormalSide::Debit => debit - credit,
            NormalSide::Credit => credit - debit,
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccountType::Asset => "asset",
            AccountType::Liability => "liability",
            AccountType::Equity => "equity",
            AccountType::Income => "income",
            AccountType::Expense => "expense",
        };
        f.write_str(name)
    }
}

impl FromStr for AccountType {
    type Err = String;

    /// Case-insensitive parse. Accepts `revenue` as an alias for `income`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asset" => Ok(AccountType::Asset),
            "liability" => Ok(AccountType::Liability),
            "equity" => Ok(AccountType::Equity),
            "income" | "revenue" => Ok(AccountType::Income),
            "expense" => Ok(AccountType::Expense),
            other => Err(format!("unknown account type '{other}'")),
        }
    }
}

/// A chart-of-accounts entry with its running balance.
///
/// This is a plain value: the store keeps the authoritative copy behind a
/// per-account lock and hands out snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub code: String,
    pub name: String,
    pub kind: AccountType,
    /// Signed running balance, relative to the account's normal side.
    pub balance: Decimal,
    /// Inactive accounts reject new postings but keep their balance.
    pub active: bool,
}

impl Account {
    const DECIMAL_PRECISION: u32 = 2;

    pub fn new(
        id: AccountId,
        code: impl Into<String>,
        name: impl Into<String>,
        kind: AccountType,
    ) -> Self {
        Self {
            id,
            code: code.into(),
            name: name.into(),
            kind,
            balance: Decimal::ZERO,
            active: true,
        }
    }

    /// Same as [`Account::new`] but with an opening balance.
    pub fn with_balance(
        id: AccountId,
        code: impl Into<String>,
        name: impl Into<String>,
        kind: AccountType,
        balance: Decimal,
    ) -> Self {
        Self {
            balance,
            ..Self::new(id, code, name, kind)
        }
    }
}

impl Serialize for Account {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Account", 6)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("code", &self.code)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("type", &self.kind)?;
        state.serialize_field("balance", &self.balance.round_dp(Account::DECIMAL_PRECISION))?;
        state.serialize_field("active", &self.active)?;
        state.end()
    }
}
