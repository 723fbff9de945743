#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use air_quality_processor::config::Settings;
use air_quality_processor::fetch::{FetchError, Fetcher};
use tokio::sync::Notify;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const LOCAL_URL: &str = "http://nabel.test/table.html";
pub const ARCHIVE_URL: &str = "http://who.test/aq.xlsx";
pub const SHEET: &str = "Update 2024 (V6.1)";

/// Scripted response for one request.
pub enum Reply {
    Body(Vec<u8>),
    Timeout,
    Status(u16),
}

/// In-memory [`Fetcher`] answering each URL from a queue of replies. When a
/// queue runs dry the last reply is repeated.
#[derive(Default)]
pub struct ScriptedFetcher {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, url: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    fn next(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;

        let mut replies = self.replies.lock().unwrap();
        let queue = replies.entry(url.to_string()).or_default();
        let reply = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().map(|r| match r {
                Reply::Body(bytes) => Reply::Body(bytes.clone()),
                Reply::Timeout => Reply::Timeout,
                Reply::Status(s) => Reply::Status(*s),
            })
        };

        match reply {
            Some(Reply::Body(bytes)) => Ok(bytes),
            Some(Reply::Status(status)) => Err(FetchError::Status {
                url: url.to_string(),
                status,
            }),
            Some(Reply::Timeout) | None => Err(FetchError::Timeout {
                url: url.to_string(),
            }),
        }
    }
}

impl Fetcher for ScriptedFetcher {
    fn fetch(
        &self,
        url: &str,
        _timeout: Duration,
    ) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send {
        let result = self.next(url);
        async move { result }
    }
}

/// [`ScriptedFetcher`] whose requests block until [`GatedFetcher::open`]
/// lets one through. Records how many requests were ever in flight at once.
#[derive(Default)]
pub struct GatedFetcher {
    pub script: ScriptedFetcher,
    gate: Notify,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl GatedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Release one waiting request, or the next one to arrive.
    pub fn open(&self) {
        self.gate.notify_one();
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Fetcher for GatedFetcher {
    fn fetch(
        &self,
        url: &str,
        _timeout: Duration,
    ) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send {
        async move {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.gate.notified().await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.script.next(url)
        }
    }
}

pub fn settings(data_dir: &std::path::Path) -> Settings {
    let mut settings = Settings::default();
    settings.data_dir = data_dir.to_path_buf();
    settings.local.url = LOCAL_URL.to_string();
    settings.archive.url = ARCHIVE_URL.to_string();
    settings.archive.retry_delay_ms = 1;
    settings
}

/// A NABEL-style page for one as-of time. Each site row is
/// `(location, type of site, NO2)`; the standard pseudo-row is appended.
pub fn nabel_page(as_of: &str, sites: &[(&str, &str, Option<f64>)]) -> Vec<u8> {
    let mut rows = String::new();
    for (location, site_type, no2) in sites {
        let no2 = no2.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>41</td><td>{}</td><td>12.5</td></tr>",
            location, site_type, no2
        ));
    }
    rows.push_str(
        "<tr><td></td><td>Ambient air quality standard [µg/m³]</td>\
         <td>120</td><td>80</td><td>50</td></tr>",
    );

    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"></head><body>\
         <table class=\"nabel\"><caption>Date from: {}</caption>\
         <thead><tr><th>Location</th><th>Type of site</th><th>O₃ [µg/m³]</th>\
         <th>NO₂ [µg/m³]</th><th>PM10 [µg/m³]</th></tr></thead>\
         <tbody>{}</tbody></table></body></html>",
        as_of, rows
    )
    .into_bytes()
}

/// One cell of a test worksheet.
pub enum Cell<'a> {
    Text(&'a str),
    Number(f64),
    Empty,
}

pub const ARCHIVE_HEADERS: &[&str] = &[
    "who_region",
    "iso3",
    "country_name",
    "city",
    "year",
    "version",
    "pm10_concentration",
    "pm25_concentration",
    "no2_concentration",
    "type_of_stations",
];

/// `(country, city, year, pm25)` rows under [`ARCHIVE_HEADERS`].
pub fn who_workbook(rows: &[(&str, &str, Option<f64>, Option<f64>)]) -> Vec<u8> {
    let mut sheet: Vec<Vec<Cell>> = vec![ARCHIVE_HEADERS.iter().map(|h| Cell::Text(h)).collect()];
    for (country, city, year, pm25) in rows {
        sheet.push(vec![
            Cell::Text("4_Eur"),
            Cell::Text("CHE"),
            Cell::Text(country),
            Cell::Text(city),
            year.map_or(Cell::Empty, Cell::Number),
            Cell::Text("V6.1"),
            Cell::Number(18.0),
            pm25.map_or(Cell::Empty, Cell::Number),
            Cell::Number(25.0),
            Cell::Text("Urban"),
        ]);
    }
    xlsx(SHEET, &sheet)
}

/// Minimal xlsx package with one sheet of inline strings and numbers.
pub fn xlsx(sheet_name: &str, rows: &[Vec<Cell>]) -> Vec<u8> {
    let mut sheet_data = String::new();
    for (r, row) in rows.iter().enumerate() {
        sheet_data.push_str(&format!("<row r=\"{}\">", r + 1));
        for (c, cell) in row.iter().enumerate() {
            let reference = format!("{}{}", column_letters(c), r + 1);
            match cell {
                Cell::Text(text) => sheet_data.push_str(&format!(
                    "<c r=\"{}\" t=\"inlineStr\"><is><t>{}</t></is></c>",
                    reference,
                    escape(text)
                )),
                Cell::Number(n) => {
                    sheet_data.push_str(&format!("<c r=\"{}\"><v>{}</v></c>", reference, n))
                }
                Cell::Empty => {}
            }
        }
        sheet_data.push_str("</row>");
    }

    let files = [
        (
            "[Content_Types].xml",
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
             <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
             <Default Extension=\"xml\" ContentType=\"application/xml\"/>\
             <Override PartName=\"/xl/workbook.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml\"/>\
             <Override PartName=\"/xl/worksheets/sheet1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>\
             </Types>"
                .to_string(),
        ),
        (
            "_rels/.rels",
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
             <Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"xl/workbook.xml\"/>\
             </Relationships>"
                .to_string(),
        ),
        (
            "xl/workbook.xml",
            format!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
                 <workbook xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" \
                 xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">\
                 <sheets><sheet name=\"{}\" sheetId=\"1\" r:id=\"rId1\"/></sheets></workbook>",
                escape(sheet_name)
            ),
        ),
        (
            "xl/_rels/workbook.xml.rels",
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
             <Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" Target=\"worksheets/sheet1.xml\"/>\
             </Relationships>"
                .to_string(),
        ),
        (
            "xl/worksheets/sheet1.xml",
            format!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
                 <worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\">\
                 <sheetData>{}</sheetData></worksheet>",
                sheet_data
            ),
        ),
    ];

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in files {
        zip.start_file(
            name,
            FileOptions::default().compression_method(CompressionMethod::Stored),
        )
        .unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fn column_letters(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap()
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
