use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use std::io::Cursor;
use tracing::debug;

use crate::error::{ProcessingError, Result};
use crate::readers::{RawCell, RawTable};

/// Reads one named sheet of an xlsx workbook held in memory.
pub struct WorkbookReader {
    sheet: String,
}

impl WorkbookReader {
    pub fn new(sheet: impl Into<String>) -> Self {
        Self {
            sheet: sheet.into(),
        }
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    /// First row of the sheet becomes the header row.
    pub fn read(&self, bytes: &[u8]) -> Result<RawTable> {
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))
            .map_err(|e| ProcessingError::Extraction(format!("unreadable workbook: {}", e)))?;

        let range = workbook.worksheet_range(&self.sheet).map_err(|e| {
            ProcessingError::Extraction(format!("sheet '{}' unavailable: {}", self.sheet, e))
        })?;

        let mut rows = range.rows();
        let headers: Vec<String> = rows
            .next()
            .ok_or_else(|| {
                ProcessingError::Extraction(format!("sheet '{}' is empty", self.sheet))
            })?
            .iter()
            .map(|cell| convert(cell).as_text())
            .collect();

        let data: Vec<Vec<RawCell>> = rows
            .map(|row| row.iter().map(convert).collect())
            .collect();

        debug!(
            sheet = %self.sheet,
            columns = headers.len(),
            rows = data.len(),
            "extracted worksheet"
        );

        Ok(RawTable {
            headers,
            rows: data,
        })
    }
}

fn convert(cell: &Data) -> RawCell {
    match cell {
        Data::Empty | Data::Error(_) => RawCell::Empty,
        Data::Int(v) => RawCell::Number(*v as f64),
        Data::Float(v) => RawCell::Number(*v),
        Data::Bool(v) => RawCell::Bool(*v),
        Data::String(s) if s.trim().is_empty() => RawCell::Empty,
        Data::String(s) => RawCell::Text(s.clone()),
        other => RawCell::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_bytes_are_extraction_error() {
        let err = WorkbookReader::new("Sheet1")
            .read(b"definitely not a zip archive")
            .unwrap_err();
        assert!(matches!(err, ProcessingError::Extraction(_)));
    }

    #[test]
    fn test_cell_conversion() {
        assert_eq!(convert(&Data::Int(2018)), RawCell::Number(2018.0));
        assert_eq!(convert(&Data::String("  ".to_string())), RawCell::Empty);
        assert_eq!(
            convert(&Data::String("Bern".to_string())),
            RawCell::Text("Bern".to_string())
        );
        assert_eq!(convert(&Data::Bool(true)), RawCell::Bool(true));
    }
}
