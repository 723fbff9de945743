use encoding_rs::{Encoding, UTF_8};
use scraper::{ElementRef, Html, Selector};
use std::borrow::Cow;
use tracing::debug;

use crate::error::{ProcessingError, Result};
use crate::readers::{RawCell, RawTable};
use crate::utils::text::normalize_ws;

/// Bytes scanned for a `charset=` declaration.
const CHARSET_SNIFF_LEN: usize = 1024;

/// The first `<table>` of a page together with its caption.
#[derive(Debug, Clone, PartialEq)]
pub struct HtmlTable {
    pub caption: String,
    pub table: RawTable,
}

pub struct HtmlTableReader {
    table: Selector,
    caption: Selector,
    row: Selector,
    head_row: Selector,
    cell: Selector,
}

impl HtmlTableReader {
    pub fn new() -> Result<Self> {
        Ok(Self {
            table: selector("table")?,
            caption: selector("caption")?,
            row: selector("tr")?,
            head_row: selector("thead tr")?,
            cell: selector("th, td")?,
        })
    }

    /// Locate the first table in an HTML document and split it into header and data rows.
    pub fn read(&self, bytes: &[u8]) -> Result<HtmlTable> {
        let text = decode(bytes);
        let document = Html::parse_document(&text);

        let table = document
            .select(&self.table)
            .next()
            .ok_or_else(|| ProcessingError::Extraction("no <table> found in page".to_string()))?;

        let caption = table
            .select(&self.caption)
            .next()
            .map(|c| element_text(&c))
            .ok_or_else(|| {
                ProcessingError::Extraction("table has no <caption> with the as-of time".to_string())
            })?;

        let head_ids: Vec<_> = table.select(&self.head_row).map(|r| r.id()).collect();
        let rows: Vec<ElementRef> = table.select(&self.row).collect();

        let header = match head_ids.last() {
            Some(last) => rows.iter().find(|r| r.id() == *last),
            None => rows.first(),
        }
        .ok_or_else(|| ProcessingError::Extraction("table has no rows".to_string()))?;

        let headers: Vec<String> = header
            .select(&self.cell)
            .map(|c| element_text(&c))
            .collect();

        let data: Vec<Vec<RawCell>> = rows
            .iter()
            .filter(|r| r.id() != header.id() && !head_ids.contains(&r.id()))
            .map(|r| {
                r.select(&self.cell)
                    .map(|c| {
                        let text = element_text(&c);
                        if text.is_empty() {
                            RawCell::Empty
                        } else {
                            RawCell::Text(text)
                        }
                    })
                    .collect()
            })
            .collect();

        debug!(
            columns = headers.len(),
            rows = data.len(),
            caption = %caption,
            "extracted html table"
        );

        Ok(HtmlTable {
            caption,
            table: RawTable {
                headers,
                rows: data,
            },
        })
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| ProcessingError::Extraction(format!("invalid selector '{}': {}", css, e)))
}

fn element_text(element: &ElementRef) -> String {
    normalize_ws(&element.text().collect::<String>())
}

/// Decode a page: BOM first, then a declared charset, otherwise UTF-8.
fn decode(bytes: &[u8]) -> Cow<'_, str> {
    let declared = sniff_charset(&bytes[..bytes.len().min(CHARSET_SNIFF_LEN)]);
    let (text, used, had_errors) = declared.unwrap_or(UTF_8).decode(bytes);
    if had_errors {
        debug!(encoding = used.name(), "page contained malformed sequences");
    }
    text
}

fn sniff_charset(head: &[u8]) -> Option<&'static Encoding> {
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();
    let start = head.find("charset=")? + "charset=".len();
    let label: String = head[start..]
        .trim_start_matches(['"', '\''])
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
        .collect();
    Encoding::for_label(label.as_bytes())
}
