//! Contact list extraction from an exported bid-notice workbook.
//!
//! Rows are reduced to the five contact columns, deduplicated on all five,
//! and sorted by demand-institution name.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crate::error::{Result, ToolError};
use crate::export;
use crate::flatten::{SheetTable, contacts_to_table};
use crate::io::excel_read;
use crate::model::{CONTACT, ContactRecord};

/// How many institutions the analysis ranks.
pub const TOP_INSTITUTIONS: usize = 10;
/// How many emails the analysis lists.
pub const LISTED_EMAILS: usize = 20;

/// Counts reported after deduplication.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupeReport {
    pub input_rows: usize,
    pub output_rows: usize,
    pub removed_duplicates: usize,
    pub institutions: usize,
    pub distinct_emails: usize,
    pub empty_emails: usize,
    pub empty_phones: usize,
}

/// The unique contact list and where it was written.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactList {
    pub contacts: Vec<ContactRecord>,
    pub report: DedupeReport,
    pub output: PathBuf,
}

/// Institutions ranked by contact count and a sample of the email list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactAnalysis {
    pub top_institutions: Vec<(String, usize)>,
    /// Up to [`LISTED_EMAILS`] distinct non-empty emails, ascending.
    pub emails: Vec<String>,
    /// Total distinct non-empty emails.
    pub total_emails: usize,
}

impl ContactAnalysis {
    /// Emails left out of [`ContactAnalysis::emails`].
    pub fn omitted_emails(&self) -> usize {
        self.total_emails - self.emails.len()
    }
}

/// Loads `input`, writes its unique contacts to `output` (or a timestamped
/// default) and reports the counts.
///
/// Nothing is written when the input is unreadable or lacks a contact column.
#[instrument(level = "info", skip_all, fields(input = %input.display()))]
pub fn create_unique_contact_list(input: &Path, output: Option<&Path>) -> Result<ContactList> {
    let contacts = load_contacts(input)?;
    let input_rows = contacts.len();
    info!(rows = input_rows, "contact rows loaded");

    let unique = dedupe_contacts(contacts);
    let report = summarize(input_rows, &unique);
    info!(
        unique = report.output_rows,
        removed = report.removed_duplicates,
        "contacts deduplicated"
    );

    let table = contacts_to_table(CONTACT.sheet_name, &unique, CONTACT.fields);
    let output = export::write_table_to(&table, output, CONTACT.file_suffix)?;

    Ok(ContactList {
        contacts: unique,
        report,
        output,
    })
}

/// Reads the contact columns out of the first worksheet of `path`.
pub fn load_contacts(path: &Path) -> Result<Vec<ContactRecord>> {
    if !path.exists() {
        return Err(ToolError::MissingInput(path.to_path_buf()));
    }
    let table = excel_read::read_first_sheet(path)?;
    contacts_from_table(&table)
}

/// Projects a sheet onto the contact columns.
///
/// Fails with every missing column label when any is absent.
pub fn contacts_from_table(table: &SheetTable) -> Result<Vec<ContactRecord>> {
    let mut indices = Vec::with_capacity(CONTACT.fields.len());
    let mut missing = Vec::new();
    for spec in CONTACT.fields {
        match table.column_index(spec.label) {
            Some(idx) => indices.push(idx),
            None => missing.push(spec.label.to_string()),
        }
    }
    if !missing.is_empty() {
        return Err(ToolError::MissingColumns(missing));
    }

    Ok(table
        .rows
        .iter()
        .map(|row| ContactRecord {
            institution_code: cell(row, indices[0]),
            institution_name: cell(row, indices[1]),
            official_name: cell(row, indices[2]),
            official_phone: cell(row, indices[3]),
            official_email: cell(row, indices[4]),
        })
        .collect())
}

fn cell(row: &[String], idx: usize) -> String {
    row.get(idx).cloned().unwrap_or_default()
}

/// Drops repeated contacts, keeping first occurrences, then stable-sorts by
/// institution name.
pub fn dedupe_contacts(contacts: Vec<ContactRecord>) -> Vec<ContactRecord> {
    let mut seen = HashSet::with_capacity(contacts.len());
    let mut unique: Vec<ContactRecord> = contacts
        .into_iter()
        .filter(|contact| seen.insert(contact.clone()))
        .collect();
    unique.sort_by(|lhs, rhs| lhs.institution_name.cmp(&rhs.institution_name));
    unique
}

/// Computes the report for `unique` contacts deduplicated from `input_rows`.
pub fn summarize(input_rows: usize, unique: &[ContactRecord]) -> DedupeReport {
    let institutions: HashSet<&str> = unique
        .iter()
        .map(|contact| contact.institution_name.as_str())
        .collect();
    let emails: HashSet<&str> = unique
        .iter()
        .map(|contact| contact.official_email.as_str())
        .filter(|email| !email.is_empty())
        .collect();

    DedupeReport {
        input_rows,
        output_rows: unique.len(),
        removed_duplicates: input_rows - unique.len(),
        institutions: institutions.len(),
        distinct_emails: emails.len(),
        empty_emails: unique.iter().filter(|c| c.official_email.is_empty()).count(),
        empty_phones: unique.iter().filter(|c| c.official_phone.is_empty()).count(),
    }
}

/// Ranks institutions by contact count and lists the email addresses.
pub fn analyze_contacts(contacts: &[ContactRecord]) -> ContactAnalysis {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for contact in contacts {
        let name = contact.institution_name.as_str();
        let count = counts.entry(name).or_insert_with(|| {
            order.push(name);
            0
        });
        *count += 1;
    }

    let mut ranked: Vec<(String, usize)> = order
        .into_iter()
        .map(|name| (name.to_string(), counts[name]))
        .collect();
    ranked.sort_by(|lhs, rhs| rhs.1.cmp(&lhs.1));
    ranked.truncate(TOP_INSTITUTIONS);

    let mut emails: Vec<String> = contacts
        .iter()
        .map(|contact| contact.official_email.as_str())
        .filter(|email| !email.is_empty())
        .collect::<HashSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect();
    emails.sort();
    let total_emails = emails.len();
    emails.truncate(LISTED_EMAILS);

    ContactAnalysis {
        top_institutions: ranked,
        emails,
        total_emails,
    }
}
