pub mod html_table;
pub mod workbook;

pub use html_table::{HtmlTable, HtmlTableReader};
pub use workbook::WorkbookReader;

/// One untyped cell as the upstream document carries it.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl RawCell {
    /// Cell as trimmed text; numbers print without a trailing `.0`.
    pub fn as_text(&self) -> String {
        match self {
            RawCell::Empty => String::new(),
            RawCell::Text(s) => s.trim().to_string(),
            RawCell::Number(n) => n.to_string(),
            RawCell::Bool(b) => b.to_string(),
        }
    }

    /// Numeric reading of the cell; text must parse as a whole `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawCell::Number(n) if n.is_finite() => Some(*n),
            RawCell::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RawCell::Empty => true,
            RawCell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

/// A header row plus data rows, before any schema is applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<RawCell>>,
}

impl RawTable {
    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    /// Cell at (`row`, `col`); short rows read as empty.
    pub fn cell<'a>(row: &'a [RawCell], col: usize) -> &'a RawCell {
        row.get(col).unwrap_or(&RawCell::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_cell_numeric_reading() {
        assert_eq!(RawCell::Text(" 12.5 ".to_string()).as_f64(), Some(12.5));
        assert_eq!(RawCell::Text("12 µg".to_string()).as_f64(), None);
        assert_eq!(RawCell::Text("-".to_string()).as_f64(), None);
        assert_eq!(RawCell::Number(3.0).as_f64(), Some(3.0));
        assert_eq!(RawCell::Bool(true).as_f64(), None);
    }

    #[test]
    fn test_short_rows_read_as_empty() {
        let row = vec![RawCell::Text("a".to_string())];
        assert_eq!(RawTable::cell(&row, 0), &RawCell::Text("a".to_string()));
        assert!(RawTable::cell(&row, 5).is_empty());
    }
}
