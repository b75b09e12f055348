//! # Export Module
//!
//! Writes the session's capture records to spreadsheets.
//!
//! ## Outputs
//! - `ExcelLog` - the real-time `Session_Data.xlsx` log, appended after
//!   every capture and rewritten after deletes, undos and edits
//! - `export_to_file` - a fresh report at a user-chosen path, `.xlsx` or `.csv`
//!
//! Every file is written to a temp file and renamed into place, so a crash
//! or a locked destination never leaves a half-written workbook.

pub mod xlsx;

use crate::core::fsops::write_atomic;
use crate::core::session::CaptureRecord;
use crate::error::ExportError;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

/// Column headers, in order
pub const COLUMNS: [&str; 5] = ["Timestamp", "Subfolder", "Name", "Filename", "File Path"];

/// File name of the real-time log
pub const SESSION_LOG_FILENAME: &str = "Session_Data.xlsx";

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Xlsx,
    Csv,
}

impl ExportFormat {
    /// Pick a format from the destination's extension. Anything that is
    /// not `.csv` is written as a workbook.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::Csv,
            _ => Self::Xlsx,
        }
    }
}

/// Export records to CSV format
///
/// CSV columns: Timestamp, Subfolder, Name, Filename, File Path
pub fn export_csv<W: Write>(records: &[CaptureRecord], mut writer: W) -> std::io::Result<()> {
    writeln!(writer, "{}", COLUMNS.join(","))?;

    for record in records {
        let row = record.to_row();
        let fields: Vec<String> = row.iter().map(|f| csv_field(f)).collect();
        writeln!(writer, "{}", fields.join(","))?;
    }

    Ok(())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn rows_of(records: &[CaptureRecord]) -> Vec<Vec<String>> {
    records.iter().map(|r| r.to_row().to_vec()).collect()
}

fn encode(records: &[CaptureRecord], format: ExportFormat, path: &Path) -> Result<Vec<u8>, ExportError> {
    match format {
        ExportFormat::Xlsx => xlsx::workbook_bytes(&COLUMNS, &rows_of(records)).map_err(|e| {
            ExportError::Write {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::Other, e),
            }
        }),
        ExportFormat::Csv => {
            let mut buf = Vec::new();
            export_csv(records, &mut buf).map_err(|e| ExportError::Write {
                path: path.to_path_buf(),
                source: e,
            })?;
            Ok(buf)
        }
    }
}

fn write_out(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    write_atomic(path, bytes).map_err(|e| ExportError::from_io(path.to_path_buf(), e))
}

/// Export records to a file, choosing the format from its extension.
///
/// Returns the number of data rows written.
pub fn export_to_file(records: &[CaptureRecord], path: &Path) -> Result<usize, ExportError> {
    if records.is_empty() {
        return Err(ExportError::NothingToExport);
    }

    let format = ExportFormat::from_path(path);
    let bytes = encode(records, format, path)?;
    write_out(path, &bytes)?;

    tracing::info!(path = %path.display(), rows = records.len(), ?format, "exported session");
    Ok(records.len())
}

/// Read the data rows of a workbook written by this module, without the
/// header row
pub fn read_workbook(path: &Path) -> Result<Vec<Vec<String>>, ExportError> {
    let file = File::open(path).map_err(|e| match ExportError::from_io(path.to_path_buf(), e) {
        ExportError::Write { source, .. } => ExportError::Read {
            path: path.to_path_buf(),
            reason: source.to_string(),
        },
        locked => locked,
    })?;

    let mut rows = xlsx::read_rows(BufReader::new(file)).map_err(|e| ExportError::Read {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let has_header = rows.first().map_or(false, |first| {
        first.iter().map(String::as_str).eq(COLUMNS.iter().copied())
    });
    if has_header {
        rows.remove(0);
    }
    Ok(rows)
}

/// The real-time session log.
///
/// Mirrors the session store as a workbook, one row per saved photo.
#[derive(Debug, Clone)]
pub struct ExcelLog {
    path: PathBuf,
}

impl ExcelLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Data rows currently in the log. A missing log has none.
    pub fn rows(&self) -> Result<Vec<Vec<String>>, ExportError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        read_workbook(&self.path)
    }

    /// Append one row. Returns the row count after the append.
    pub fn append(&self, record: &CaptureRecord) -> Result<usize, ExportError> {
        let mut rows = self.rows()?;
        rows.push(record.to_row().to_vec());
        self.write_rows(&rows)?;
        tracing::debug!(path = %self.path.display(), rows = rows.len(), "appended to session log");
        Ok(rows.len())
    }

    /// Replace the log's contents with `records`
    pub fn rewrite(&self, records: &[CaptureRecord]) -> Result<usize, ExportError> {
        self.write_rows(&rows_of(records))?;
        tracing::debug!(path = %self.path.display(), rows = records.len(), "rewrote session log");
        Ok(records.len())
    }

    /// Leave only the header row
    pub fn reset(&self) -> Result<(), ExportError> {
        self.write_rows(&[])
    }

    fn write_rows(&self, rows: &[Vec<String>]) -> Result<(), ExportError> {
        let bytes = xlsx::workbook_bytes(&COLUMNS, rows).map_err(|e| ExportError::Write {
            path: self.path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::Other, e),
        })?;
        write_out(&self.path, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(subfolder: &str, name: &str) -> CaptureRecord {
        CaptureRecord::new(
            subfolder,
            name,
            PathBuf::from(format!("/p/{}/{}.jpg", subfolder, name)),
        )
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(ExportFormat::from_path(Path::new("a.csv")), ExportFormat::Csv);
        assert_eq!(ExportFormat::from_path(Path::new("a.CSV")), ExportFormat::Csv);
        assert_eq!(ExportFormat::from_path(Path::new("a.xlsx")), ExportFormat::Xlsx);
        assert_eq!(ExportFormat::from_path(Path::new("report")), ExportFormat::Xlsx);
    }

    #[test]
    fn test_export_csv_quotes_commas() {
        let records = vec![record("Eng", "Doe, John")];
        let mut out = Vec::new();
        export_csv(&records, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Timestamp,Subfolder,Name,Filename,File Path"));
        let row = lines.next().unwrap();
        assert!(row.contains(",Eng,\"Doe, John\",\"Doe, John.jpg\","));
    }

    #[test]
    fn export_single_record_to_xlsx() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("report.xlsx");
        let records = vec![record("Eng", "John Doe")];

        assert_eq!(export_to_file(&records, &path).unwrap(), 1);

        let rows = read_workbook(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][1], "Eng");
        assert_eq!(rows[0][2], "John Doe");
        assert_eq!(rows[0][3], "John Doe.jpg");
    }

    #[test]
    fn export_of_empty_session_is_refused() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("report.xlsx");
        assert!(matches!(
            export_to_file(&[], &path),
            Err(ExportError::NothingToExport)
        ));
        assert!(!path.exists());
    }

    #[test]
    fn log_appends_rewrites_and_resets() {
        let temp = TempDir::new().unwrap();
        let log = ExcelLog::new(temp.path().join(SESSION_LOG_FILENAME));
        assert!(log.rows().unwrap().is_empty());

        assert_eq!(log.append(&record("Eng", "A")).unwrap(), 1);
        assert_eq!(log.append(&record("Ops", "B")).unwrap(), 2);
        let rows = log.rows().unwrap();
        assert_eq!(rows[0][2], "A");
        assert_eq!(rows[1][2], "B");

        log.rewrite(&[record("Ops", "B")]).unwrap();
        let rows = log.rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][2], "B");

        log.reset().unwrap();
        assert!(log.exists());
        assert!(log.rows().unwrap().is_empty());
    }

    #[test]
    fn corrupt_log_is_a_read_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(SESSION_LOG_FILENAME);
        std::fs::write(&path, b"garbage").unwrap();

        let log = ExcelLog::new(&path);
        assert!(matches!(
            log.append(&record("Eng", "A")),
            Err(ExportError::Read { .. })
        ));
    }
}
