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

//! Entry number generation.

use crate::base::EntryNumber;
use chrono::NaiveDate;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, Ordering};

/// Source of unique journal entry numbers.
///
/// Injected into the poster so callers can supply their own numbering
/// scheme (e.g. one backed by a database sequence).
pub trait EntrySequence {
    /// Returns the next entry number for `date`. Must never repeat.
    fn next(&self, date: NaiveDate) -> EntryNumber;
}

/// Date-based sequence: `JE-YYYYMMDD-NNNN`.
///
/// Keeps one atomic counter per calendar date, so numbers are unique and
/// monotonically increasing within a date even under concurrent posting.
#[derive(Debug, Default)]
pub struct DateSequence {
    counters: DashMap<NaiveDate, AtomicU32>,
}

impl DateSequence {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntrySequence for DateSequence {
    fn next(&self, date: NaiveDate) -> EntryNumber {
        let counter = self.counters.entry(date).or_default();
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        EntryNumber(format!("JE-{}-{:04}", date.format("%Y%m%d"), n))
    }
}
