use crate::model::{ContactRecord, FieldSpec, Record};

/// Excel's limit on worksheet name length, in characters.
const MAX_SHEET_NAME_CHARS: usize = 31;

/// A table that will be materialised as an Excel sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetTable {
    pub sheet_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SheetTable {
    /// Position of the column with the given header.
    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == header)
    }
}

/// Lays out records as rows under the given columns.
///
/// The header row holds each column's label; cell `i` of every row holds the
/// record's value for column `i`'s field, blank when the record lacks it.
pub fn records_to_table(sheet_name: &str, records: &[Record], columns: &[FieldSpec]) -> SheetTable {
    let rows = records
        .iter()
        .map(|record| {
            columns
                .iter()
                .map(|spec| record.get(spec.key).to_string())
                .collect()
        })
        .collect();

    SheetTable {
        sheet_name: sanitize_sheet_name(sheet_name),
        columns: columns.iter().map(|spec| spec.label.to_string()).collect(),
        rows,
    }
}

/// Lays out contacts under the contact column labels.
pub fn contacts_to_table(
    sheet_name: &str,
    contacts: &[ContactRecord],
    columns: &[FieldSpec],
) -> SheetTable {
    SheetTable {
        sheet_name: sanitize_sheet_name(sheet_name),
        columns: columns.iter().map(|spec| spec.label.to_string()).collect(),
        rows: contacts.iter().map(ContactRecord::to_row).collect(),
    }
}

/// Replaces characters Excel rejects in sheet names and enforces the length
/// limit.
pub fn sanitize_sheet_name(raw: &str) -> String {
    let invalid = [':', '\\', '/', '?', '*', '[', ']', '\'', '"'];
    let sanitized: String = raw
        .chars()
        .map(|ch| {
            if invalid.contains(&ch) || ch.is_control() {
                '_'
            } else {
                ch
            }
        })
        .collect();

    let trimmed = sanitized.trim();
    if trimmed.is_empty() {
        return "Sheet1".to_string();
    }

    trimmed.chars().take(MAX_SHEET_NAME_CHARS).collect()
}
