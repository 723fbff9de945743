use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::{ProcessingError, Result};
use crate::models::{ArchiveRecord, Pull};
use crate::readers::{RawCell, RawTable};

/// Positions of the WHO workbook columns; `None` where a column is absent.
#[derive(Debug)]
struct ArchiveLayout {
    country_name: usize,
    city: usize,
    year: usize,
    who_region: Option<usize>,
    iso3: Option<usize>,
    version: Option<usize>,
    pm10_concentration: Option<usize>,
    pm25_concentration: Option<usize>,
    no2_concentration: Option<usize>,
    pm10_tempcov: Option<usize>,
    pm25_tempcov: Option<usize>,
    no2_tempcov: Option<usize>,
    type_of_stations: Option<usize>,
    population: Option<usize>,
    latitude: Option<usize>,
    longitude: Option<usize>,
    who_ms: Option<usize>,
}

impl ArchiveLayout {
    fn resolve(table: &RawTable) -> Result<Self> {
        let required = |name: &str| {
            table.column_index(name).ok_or_else(|| {
                ProcessingError::Schema(format!("archive sheet has no '{}' column", name))
            })
        };
        let optional = |name: &str| table.column_index(name);

        Ok(Self {
            country_name: required("country_name")?,
            city: required("city")?,
            year: required("year")?,
            who_region: optional("who_region"),
            iso3: optional("iso3"),
            version: optional("version"),
            pm10_concentration: optional("pm10_concentration"),
            pm25_concentration: optional("pm25_concentration"),
            no2_concentration: optional("no2_concentration"),
            pm10_tempcov: optional("pm10_tempcov"),
            pm25_tempcov: optional("pm25_tempcov"),
            no2_tempcov: optional("no2_tempcov"),
            type_of_stations: optional("type_of_stations"),
            population: optional("population"),
            latitude: optional("latitude"),
            longitude: optional("longitude"),
            who_ms: optional("who_ms"),
        })
    }
}

fn text_at(row: &[RawCell], index: Option<usize>) -> String {
    index.map_or_else(String::new, |i| RawTable::cell(row, i).as_text())
}

fn number_at(row: &[RawCell], index: Option<usize>) -> Option<f64> {
    index.and_then(|i| RawTable::cell(row, i).as_f64())
}

fn flag(cell: &RawCell) -> bool {
    match cell {
        RawCell::Bool(b) => *b,
        RawCell::Number(n) => *n != 0.0,
        RawCell::Text(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "yes" | "y" | "1"
        ),
        RawCell::Empty => false,
    }
}

/// Types the WHO sheet, dropping rows without a usable year.
pub struct ArchiveNormalizer;

impl ArchiveNormalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(&self, table: &RawTable) -> Result<Pull<ArchiveRecord>> {
        let layout = ArchiveLayout::resolve(table)?;

        let parsed: Vec<Option<ArchiveRecord>> = table
            .rows
            .par_iter()
            .map(|row| Self::record(&layout, row))
            .collect();

        let total = parsed.len();
        let rows: Vec<ArchiveRecord> = parsed.into_iter().flatten().collect();
        let dropped = total - rows.len();

        if dropped > 0 {
            debug!(dropped, "dropped archive rows without a valid year");
        }
        if rows.is_empty() {
            warn!("archive sheet contained no usable rows");
        }

        Ok(Pull {
            rows,
            as_of: None,
            dropped,
        })
    }

    fn record(layout: &ArchiveLayout, row: &[RawCell]) -> Option<ArchiveRecord> {
        let year = RawTable::cell(row, layout.year).as_f64()?;
        let mut record = ArchiveRecord::new(
            text_at(row, Some(layout.country_name)),
            text_at(row, Some(layout.city)),
            year,
        )?;

        record.who_region = text_at(row, layout.who_region);
        record.iso3 = text_at(row, layout.iso3);
        record.version = text_at(row, layout.version);
        record.pm10_concentration = number_at(row, layout.pm10_concentration);
        record.pm25_concentration = number_at(row, layout.pm25_concentration);
        record.no2_concentration = number_at(row, layout.no2_concentration);
        record.pm10_tempcov = number_at(row, layout.pm10_tempcov);
        record.pm25_tempcov = number_at(row, layout.pm25_tempcov);
        record.no2_tempcov = number_at(row, layout.no2_tempcov);
        record.type_of_stations = text_at(row, layout.type_of_stations);
        record.population = number_at(row, layout.population);
        record.latitude = number_at(row, layout.latitude);
        record.longitude = number_at(row, layout.longitude);
        record.who_ms = layout
            .who_ms
            .map(|i| flag(RawTable::cell(row, i)))
            .unwrap_or(false);

        Some(record)
    }
}

impl Default for ArchiveNormalizer {
    fn default() -> Self {
        Self::new()
    }
}
