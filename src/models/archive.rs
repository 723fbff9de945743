use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::table::{ColumnDef, ColumnKind, Tabular, Value};
use crate::utils::datetime::year_start;

/// One country/city/year row of the WHO ambient air quality database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveRecord {
    pub who_region: String,
    pub iso3: String,
    pub country_name: String,
    pub city: String,
    /// 1 January of the measurement year.
    year: NaiveDate,
    pub version: String,

    pub pm10_concentration: Option<f64>,
    pub pm25_concentration: Option<f64>,
    pub no2_concentration: Option<f64>,

    // Temporal coverage, percent
    pub pm10_tempcov: Option<f64>,
    pub pm25_tempcov: Option<f64>,
    pub no2_tempcov: Option<f64>,

    pub type_of_stations: String,
    pub population: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub who_ms: bool,
}

impl ArchiveRecord {
    /// A record for `year`; `None` unless `year` is a whole number in 1..=9999.
    pub fn new(country_name: String, city: String, year: f64) -> Option<Self> {
        Some(Self {
            who_region: String::new(),
            iso3: String::new(),
            country_name,
            city,
            year: year_start(year)?,
            version: String::new(),
            pm10_concentration: None,
            pm25_concentration: None,
            no2_concentration: None,
            pm10_tempcov: None,
            pm25_tempcov: None,
            no2_tempcov: None,
            type_of_stations: String::new(),
            population: None,
            latitude: None,
            longitude: None,
            who_ms: false,
        })
    }

    pub fn year(&self) -> NaiveDate {
        self.year
    }

    /// Integer view of [`year`](Self::year), derived on read so the two never diverge.
    pub fn year_int(&self) -> i32 {
        self.year.year()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveColumn {
    WhoRegion,
    Iso3,
    CountryName,
    City,
    Year,
    YearInt,
    Version,
    Pm10Concentration,
    Pm25Concentration,
    No2Concentration,
    Pm10Tempcov,
    Pm25Tempcov,
    No2Tempcov,
    TypeOfStations,
    Population,
    Latitude,
    Longitude,
    WhoMs,
}

const ARCHIVE_COLUMNS: &[ColumnDef<ArchiveColumn>] = &[
    ColumnDef::new(
        ArchiveColumn::WhoRegion,
        "who_region",
        &["Region"],
        ColumnKind::Category,
        false,
    ),
    ColumnDef::new(ArchiveColumn::Iso3, "iso3", &["ISO3"], ColumnKind::Text, false),
    ColumnDef::new(
        ArchiveColumn::CountryName,
        "country_name",
        &["Country"],
        ColumnKind::Text,
        true,
    ),
    ColumnDef::new(ArchiveColumn::City, "city", &["City"], ColumnKind::Text, true),
    ColumnDef::new(ArchiveColumn::Year, "year", &[], ColumnKind::Date, false),
    ColumnDef::new(ArchiveColumn::YearInt, "year_int", &["Year"], ColumnKind::Integer, false),
    ColumnDef::new(ArchiveColumn::Version, "version", &[], ColumnKind::Text, false),
    ColumnDef::new(
        ArchiveColumn::Pm10Concentration,
        "pm10_concentration",
        &["PM10"],
        ColumnKind::Float,
        false,
    ),
    ColumnDef::new(
        ArchiveColumn::Pm25Concentration,
        "pm25_concentration",
        &["PM25"],
        ColumnKind::Float,
        false,
    ),
    ColumnDef::new(
        ArchiveColumn::No2Concentration,
        "no2_concentration",
        &["NO2"],
        ColumnKind::Float,
        false,
    ),
    ColumnDef::new(
        ArchiveColumn::Pm10Tempcov,
        "pm10_tempcov",
        &["PM10 Coverage"],
        ColumnKind::Float,
        false,
    ),
    ColumnDef::new(
        ArchiveColumn::Pm25Tempcov,
        "pm25_tempcov",
        &["PM25 Coverage"],
        ColumnKind::Float,
        false,
    ),
    ColumnDef::new(
        ArchiveColumn::No2Tempcov,
        "no2_tempcov",
        &["NO2 Coverage", "no2_coverage"],
        ColumnKind::Float,
        false,
    ),
    ColumnDef::new(
        ArchiveColumn::TypeOfStations,
        "type_of_stations",
        &["Type of Station"],
        ColumnKind::Text,
        true,
    ),
    ColumnDef::new(ArchiveColumn::Population, "population", &[], ColumnKind::Float, false),
    ColumnDef::new(ArchiveColumn::Latitude, "latitude", &[], ColumnKind::Float, false),
    ColumnDef::new(ArchiveColumn::Longitude, "longitude", &[], ColumnKind::Float, false),
    ColumnDef::new(ArchiveColumn::WhoMs, "who_ms", &[], ColumnKind::Bool, false),
];

impl Tabular for ArchiveRecord {
    type Column = ArchiveColumn;

    fn columns() -> &'static [ColumnDef<ArchiveColumn>] {
        ARCHIVE_COLUMNS
    }

    fn cell(&self, column: ArchiveColumn) -> Value {
        match column {
            ArchiveColumn::WhoRegion => Value::from(self.who_region.as_str()),
            ArchiveColumn::Iso3 => Value::from(self.iso3.as_str()),
            ArchiveColumn::CountryName => Value::from(self.country_name.as_str()),
            ArchiveColumn::City => Value::from(self.city.as_str()),
            ArchiveColumn::Year => Value::Date(self.year),
            ArchiveColumn::YearInt => Value::Int(self.year_int() as i64),
            ArchiveColumn::Version => Value::from(self.version.as_str()),
            ArchiveColumn::Pm10Concentration => Value::from(self.pm10_concentration),
            ArchiveColumn::Pm25Concentration => Value::from(self.pm25_concentration),
            ArchiveColumn::No2Concentration => Value::from(self.no2_concentration),
            ArchiveColumn::Pm10Tempcov => Value::from(self.pm10_tempcov),
            ArchiveColumn::Pm25Tempcov => Value::from(self.pm25_tempcov),
            ArchiveColumn::No2Tempcov => Value::from(self.no2_tempcov),
            ArchiveColumn::TypeOfStations => Value::from(self.type_of_stations.as_str()),
            ArchiveColumn::Population => Value::from(self.population),
            ArchiveColumn::Latitude => Value::from(self.latitude),
            ArchiveColumn::Longitude => Value::from(self.longitude),
            ArchiveColumn::WhoMs => Value::Bool(self.who_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_views_stay_in_sync() {
        let record =
            ArchiveRecord::new("Switzerland".to_string(), "Bern".to_string(), 2018.0).unwrap();

        assert_eq!(record.year(), NaiveDate::from_ymd_opt(2018, 1, 1).unwrap());
        assert_eq!(record.year_int(), 2018);
        assert_eq!(record.cell(ArchiveColumn::YearInt), Value::Int(2018));
    }

    #[test]
    fn test_missing_or_fractional_year_is_rejected() {
        assert!(ArchiveRecord::new("X".to_string(), "Y".to_string(), f64::NAN).is_none());
        assert!(ArchiveRecord::new("X".to_string(), "Y".to_string(), 2018.5).is_none());
    }

    #[test]
    fn test_presentation_aliases() {
        assert_eq!(
            ArchiveRecord::column_def("City").unwrap().column,
            ArchiveColumn::City
        );
        assert_eq!(
            ArchiveRecord::column_def("Type of Station").unwrap().column,
            ArchiveColumn::TypeOfStations
        );
        assert_eq!(
            ArchiveRecord::column_def("Year").unwrap().column,
            ArchiveColumn::YearInt
        );
    }
}
