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

use chrono::NaiveDate;
use clap::Parser;
use csv::{ReaderBuilder, Trim, Writer};
use ledger_poster_rs::{
    Account, AccountId, AccountType, EntryDraft, EntryReference, JournalLine, LedgerPoster,
    MemoryLedger,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;

/// Ledger Poster - Batch-post journal entries from CSV files
///
/// Loads a chart of accounts, posts the journal entries, and writes the
/// resulting account balances to stdout. Entries that fail validation
/// (imbalance, unknown accounts, malformed rows) are skipped.
#[derive(Parser, Debug)]
#[command(name = "ledger-poster-rs")]
#[command(about = "Posts double-entry journal CSVs against a chart of accounts", long_about = None)]
struct Args {
    /// Path to the chart-of-accounts CSV
    ///
    /// Expected format: code,name,type[,balance]
    /// Types: asset, liability, equity, income, expense
    #[arg(value_name = "ACCOUNTS")]
    accounts: PathBuf,

    /// Path to the journal CSV
    ///
    /// Expected format: entry,date,description,account,debit,credit
    /// Consecutive rows sharing an entry key form one journal entry.
    #[arg(value_name = "JOURNAL")]
    journal: PathBuf,
}

fn main() {
    let args = Args::parse();

    let accounts_file = match File::open(&args.accounts) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", args.accounts.display(), e);
            process::exit(1);
        }
    };

    let (ledger, codes) = match load_accounts(BufReader::new(accounts_file)) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error loading chart of accounts: {}", e);
            process::exit(1);
        }
    };

    let journal_file = match File::open(&args.journal) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", args.journal.display(), e);
            process::exit(1);
        }
    };

    if let Err(e) = post_journal(BufReader::new(journal_file), &ledger, &codes) {
        eprintln!("Error posting journal: {}", e);
        process::exit(1);
    }

    if let Err(e) = write_accounts(&ledger, std::io::stdout()) {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

/// Attribution recorded on entries posted by this tool.
const CREATED_BY: &str = "csv-import";

/// Raw chart-of-accounts record.
///
/// Fields: `code, name, type[, balance]`
#[derive(Debug, Deserialize)]
struct AccountRecord {
    code: String,
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    balance: Option<Decimal>,
}

/// Raw journal line record.
///
/// Fields: `entry, date, description, account, debit, credit`
#[derive(Debug, Deserialize)]
struct JournalRecord {
    entry: String,
    date: String,
    description: String,
    account: String,
    #[serde(deserialize_with = "csv::invalid_option")]
    debit: Option<Decimal>,
    #[serde(deserialize_with = "csv::invalid_option")]
    credit: Option<Decimal>,
}

/// Loads the chart of accounts from a CSV reader.
///
/// Account IDs are assigned in file order. Malformed rows and rows with an
/// unknown account type are skipped. Returns the ledger plus a code-to-ID
/// map for resolving journal lines.
///
/// # Errors
///
/// Returns a CSV error if the reader fails or the CSV structure is invalid.
pub fn load_accounts<R: Read>(
    reader: R,
) -> Result<(MemoryLedger, HashMap<String, AccountId>), csv::Error> {
    let ledger = MemoryLedger::new();
    let mut codes = HashMap::new();
    let mut next_id = 1u32;

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true) // Allow the balance column to be absent
        .has_headers(true)
        .from_reader(reader);

    for result in rdr.deserialize::<AccountRecord>() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                #[cfg(debug_assertions)]
                eprintln!("Skipping malformed account row: {}", e);
                continue;
            }
        };

        let Ok(kind) = record.kind.parse::<AccountType>() else {
            #[cfg(debug_assertions)]
            eprintln!("Skipping account '{}': unknown type", record.code);
            continue;
        };

        let id = AccountId(next_id);
        let account = match record.balance {
            Some(balance) => Account::with_balance(id, &record.code, &record.name, kind, balance),
            None => Account::new(id, &record.code, &record.name, kind),
        };

        // Duplicate codes keep the first definition.
        if codes.contains_key(&record.code) {
            #[cfg(debug_assertions)]
            eprintln!("Skipping duplicate account code '{}'", record.code);
            continue;
        }
        if ledger.add_account(account).is_ok() {
            codes.insert(record.code, id);
            next_id += 1;
        }
    }

    Ok((ledger, codes))
}

/// Posts journal entries from a CSV reader.
///
/// Consecutive rows sharing an `entry` key are grouped into one draft and
/// posted atomically. Entries that fail validation are skipped without
/// stopping the batch; returns how many entries posted.
///
/// # CSV Format
///
/// ```csv
/// entry,date,description,account,debit,credit
/// 1,2026-08-06,Cash sale,1000,100.00,
/// 1,2026-08-06,Cash sale,4000,,100.00
/// ```
///
/// # Errors
///
/// Returns a CSV error if the reader fails or the CSV structure is invalid.
/// Individual entry errors are logged in debug mode but don't stop
/// processing.
pub fn post_journal<R: Read>(
    reader: R,
    ledger: &MemoryLedger,
    codes: &HashMap<String, AccountId>,
) -> Result<usize, csv::Error> {
    let poster = LedgerPoster::new(ledger);
    let mut posted = 0usize;

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All) // Handle whitespace in fields like " 100.00 "
        .flexible(true) // Allow empty debit/credit fields
        .has_headers(true)
        .from_reader(reader);

    let mut current: Option<(String, PendingEntry)> = None;

    for result in rdr.deserialize::<JournalRecord>() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                #[cfg(debug_assertions)]
                eprintln!("Skipping malformed journal row: {}", e);
                continue;
            }
        };

        // A new entry key closes out the pending group.
        if let Some((key, pending)) = current.take() {
            if key == record.entry {
                current = Some((key, pending.with_record(&record, codes)));
                continue;
            }
            posted += usize::from(pending.post(&poster, &key));
        }

        current = Some((
            record.entry.clone(),
            PendingEntry::new(&record).with_record(&record, codes),
        ));
    }

    if let Some((key, pending)) = current {
        posted += usize::from(pending.post(&poster, &key));
    }

    Ok(posted)
}

/// One journal entry being accumulated from consecutive CSV rows.
struct PendingEntry {
    date: String,
    description: String,
    lines: Vec<JournalLine>,
}

impl PendingEntry {
    fn new(record: &JournalRecord) -> Self {
        Self {
            date: record.date.clone(),
            description: record.description.clone(),
            lines: Vec::new(),
        }
    }

    fn with_record(mut self, record: &JournalRecord, codes: &HashMap<String, AccountId>) -> Self {
        let Some(&account_id) = codes.get(&record.account) else {
            // Dropping the line leaves the group unbalanced, so the whole
            // entry fails at post time rather than half-applying.
            #[cfg(debug_assertions)]
            eprintln!(
                "Unknown account code '{}' in entry '{}'",
                record.account, record.entry
            );
            return self;
        };
        self.lines.push(JournalLine {
            account_id,
            debit: record.debit.unwrap_or(Decimal::ZERO),
            credit: record.credit.unwrap_or(Decimal::ZERO),
            description: None,
        });
        self
    }

    /// Posts the accumulated entry; returns whether it landed.
    fn post(self, poster: &LedgerPoster<&MemoryLedger>, key: &str) -> bool {
        let Ok(date) = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d") else {
            #[cfg(debug_assertions)]
            eprintln!("Skipping entry '{}': invalid date '{}'", key, self.date);
            return false;
        };

        let draft = EntryDraft {
            date,
            description: self.description,
            reference: EntryReference::Journal,
            created_by: CREATED_BY.to_string(),
            lines: self.lines,
        };

        match poster.post(draft) {
            Ok(_) => true,
            Err(e) => {
                #[cfg(debug_assertions)]
                eprintln!("Skipping entry '{}': {}", key, e);
                false
            }
        }
    }
}

/// Write account balances to a CSV writer.
///
/// Outputs all accounts in chart order with balances at 2 decimal
/// precision.
///
/// # CSV Format
///
/// Columns: `id, code, name, type, balance, active`
///
/// # Errors
///
/// Returns a CSV error if writing fails.
pub fn write_accounts<W: Write>(ledger: &MemoryLedger, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);

    for account in ledger.accounts() {
        wtr.serialize(&account)?;
    }

    wtr.flush()?;
    Ok(())
}
