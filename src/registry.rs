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

//! Thread-safe registry of posted journal entries with duplicate detection.
//!
//! Uniqueness is enforced on both the entry ID and the entry number.
//! Entry IDs are allocated monotonically, so sorting by ID reproduces
//! posting order without a separate queue.

use crate::base::{EntryId, EntryNumber};
use crate::entry::JournalEntry;
use crate::error::LedgerError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Concurrent posted-entry registry.
///
/// Combines a [`DashMap`] keyed by entry ID with a number-to-ID index for
/// O(1) duplicate checks. Inserts use the entry API for atomic
/// check-and-insert.
#[derive(Debug, Default)]
pub struct EntryRegistry {
    /// Posted entries indexed by ID.
    entries: DashMap<EntryId, JournalEntry>,

    /// Entry-number index enforcing number uniqueness.
    numbers: DashMap<EntryNumber, EntryId>,
}

impl EntryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a posted entry to the registry.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::DuplicateEntryNumber`] - the entry number is taken.
    /// - [`LedgerError::DuplicateEntry`] - the entry ID is taken.
    pub fn push(&self, entry: JournalEntry) -> Result<(), LedgerError> {
        // Claim the number first so a duplicate ID can release it again.
        match self.numbers.entry(entry.number.clone()) {
            Entry::Occupied(_) => {
                return Err(LedgerError::DuplicateEntryNumber(entry.number));
            }
            Entry::Vacant(slot) => {
                slot.insert(entry.id);
            }
        }

        match self.entries.entry(entry.id) {
            Entry::Occupied(_) => {
                self.numbers.remove(&entry.number);
                Err(LedgerError::DuplicateEntry(entry.id))
            }
            Entry::Vacant(slot) => {
                slot.insert(entry);
                Ok(())
            }
        }
    }

    /// Returns a snapshot of the entry, if present.
    pub fn get(&self, id: EntryId) -> Option<JournalEntry> {
        self.entries.get(&id).map(|e| e.value().clone())
    }

    /// Removes and returns the entry, releasing its number.
    ///
    /// The removal from the ID map is the atomic decision point; two
    /// concurrent removals of the same entry cannot both succeed.
    pub fn remove(&self, id: EntryId) -> Option<JournalEntry> {
        let (_, entry) = self.entries.remove(&id)?;
        self.numbers.remove(&entry.number);
        Some(entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, sorted by ID (posting order).
    pub fn sorted(&self) -> Vec<JournalEntry> {
        let mut all: Vec<JournalEntry> = self.entries.iter().map(|e| e.value().clone()).collect();
        all.sort_by_key(|e| e.id);
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::AccountId;
    use crate::entry::{EntryReference, JournalLine};
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;

    fn entry(id: u64, number: &str) -> JournalEntry {
        JournalEntry {
            id: EntryId(id),
            number: EntryNumber::from(number),
            date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            description: "test".to_string(),
            reference: EntryReference::Journal,
            created_by: "tests".to_string(),
            created_at: Utc::now(),
            lines: vec![
                JournalLine::debit(AccountId(1), dec!(10.00)),
                JournalLine::credit(AccountId(2), dec!(10.00)),
            ],
        }
    }

    #[test]
    fn push_and_get() {
        let registry = EntryRegistry::new();
        registry.push(entry(1, "JE-20260301-0001")).unwrap();

        let found = registry.get(EntryId(1)).unwrap();
        assert_eq!(found.number, EntryNumber::from("JE-20260301-0001"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let registry = EntryRegistry::new();
        registry.push(entry(1, "JE-20260301-0001")).unwrap();

        let result = registry.push(entry(1, "JE-20260301-0002"));
        assert_eq!(result, Err(LedgerError::DuplicateEntry(EntryId(1))));

        // The rejected entry's number must not stay claimed.
        registry.push(entry(2, "JE-20260301-0002")).unwrap();
    }

    #[test]
    fn duplicate_number_is_rejected() {
        let registry = EntryRegistry::new();
        registry.push(entry(1, "JE-20260301-0001")).unwrap();

        let result = registry.push(entry(2, "JE-20260301-0001"));
        assert_eq!(
            result,
            Err(LedgerError::DuplicateEntryNumber(EntryNumber::from(
                "JE-20260301-0001"
            )))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_releases_number() {
        let registry = EntryRegistry::new();
        registry.push(entry(1, "JE-20260301-0001")).unwrap();

        let removed = registry.remove(EntryId(1)).unwrap();
        assert_eq!(removed.id, EntryId(1));
        assert!(registry.get(EntryId(1)).is_none());
        assert!(registry.is_empty());

        // Number is free again after removal.
        registry.push(entry(2, "JE-20260301-0001")).unwrap();
    }

    #[test]
    fn remove_missing_returns_none() {
        let registry = EntryRegistry::new();
        assert!(registry.remove(EntryId(42)).is_none());
    }

    #[test]
    fn sorted_returns_posting_order() {
        let registry = EntryRegistry::new();
        registry.push(entry(3, "JE-20260301-0003")).unwrap();
        registry.push(entry(1, "JE-20260301-0001")).unwrap();
        registry.push(entry(2, "JE-20260301-0002")).unwrap();

        let ids: Vec<EntryId> = registry.sorted().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![EntryId(1), EntryId(2), EntryId(3)]);
    }
}
