//! Spreadsheet export of flat records.

use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{info, instrument};

use crate::error::Result;
use crate::flatten::{SheetTable, records_to_table};
use crate::io::excel_write;
use crate::model::{FieldSpec, Record};

/// Builds `{YYYYMMDD_HHMMSS}_{suffix}.xlsx` from the current local time.
pub fn default_file_name(suffix: &str) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    PathBuf::from(format!("{timestamp}_{suffix}.xlsx"))
}

/// Resolves the output path: the caller's choice or a timestamped default.
pub fn output_path(output: Option<&Path>, suffix: &str) -> PathBuf {
    output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_file_name(suffix))
}

/// Writes `records` under `columns` to a single-sheet workbook.
///
/// Returns `Ok(None)` without touching the filesystem when there are no
/// records, otherwise the path written.
#[instrument(
    level = "info",
    skip_all,
    fields(records = records.len(), columns = columns.len())
)]
pub fn export_records(
    records: &[Record],
    columns: &[FieldSpec],
    sheet_name: &str,
    output: Option<&Path>,
    suffix: &str,
) -> Result<Option<PathBuf>> {
    if records.is_empty() {
        info!("no records to export; skipping workbook");
        return Ok(None);
    }

    let table = records_to_table(sheet_name, records, columns);
    write_table_to(&table, output, suffix).map(Some)
}

/// Writes an already laid out table, resolving the default path.
pub fn write_table_to(table: &SheetTable, output: Option<&Path>, suffix: &str) -> Result<PathBuf> {
    let path = output_path(output, suffix);
    excel_write::write_table(&path, table)?;
    info!(path = %path.display(), rows = table.rows.len(), "workbook written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BID_NOTICE;
    use tempfile::tempdir;

    #[test]
    fn empty_input_writes_nothing() {
        let dir = tempdir().expect("temporary directory");
        let path = dir.path().join("bids.xlsx");
        let written = export_records(
            &[],
            BID_NOTICE.fields,
            "입찰공고",
            Some(&path),
            "입찰공고",
        )
        .expect("export succeeded");
        assert_eq!(written, None);
        assert!(!path.exists());
    }

    #[test]
    fn default_name_has_timestamp_and_suffix() {
        let name = default_file_name("입찰공고");
        let name = name.to_str().expect("utf-8 name");
        let (stamp, rest) = name.split_at(15);
        assert_eq!(rest, "_입찰공고.xlsx");
        assert_eq!(stamp.as_bytes()[8], b'_');
        assert!(
            stamp
                .bytes()
                .enumerate()
                .all(|(idx, byte)| idx == 8 || byte.is_ascii_digit())
        );
    }

    #[test]
    fn explicit_output_wins() {
        let path = Path::new("out.xlsx");
        assert_eq!(output_path(Some(path), "x"), PathBuf::from("out.xlsx"));
    }
}
