use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::table::{ColumnDef, ColumnKind, Tabular, Value};
use crate::utils::constants::STANDARD_REFERENCE_LABEL;
use crate::utils::text::normalize_ws;

/// Monitoring site category as printed in the "Type of site" column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SiteType {
    UrbanTraffic,
    Urban,
    Suburban,
    RuralMotorway,
    Rural,
    RuralHighAltitude,
    HighAlpine,
    /// The regulatory limit pseudo-row; never stored.
    Standard,
    Other(String),
}

impl SiteType {
    pub fn from_label(label: &str) -> Self {
        let label = normalize_ws(label);
        if label == STANDARD_REFERENCE_LABEL {
            return SiteType::Standard;
        }

        let lower = label.to_lowercase();
        if lower.contains("alpine") {
            SiteType::HighAlpine
        } else if lower.contains("motorway") {
            SiteType::RuralMotorway
        } else if lower.starts_with("rural") && lower.contains("above") {
            SiteType::RuralHighAltitude
        } else if lower.starts_with("rural") {
            SiteType::Rural
        } else if lower.starts_with("suburban") {
            SiteType::Suburban
        } else if lower.starts_with("urban") && lower.contains("traffic") {
            SiteType::UrbanTraffic
        } else if lower.starts_with("urban") {
            SiteType::Urban
        } else {
            SiteType::Other(label)
        }
    }

    pub fn label(&self) -> &str {
        match self {
            SiteType::UrbanTraffic => "Urban, traffic",
            SiteType::Urban => "Urban",
            SiteType::Suburban => "Suburban",
            SiteType::RuralMotorway => "Rural, motorway",
            SiteType::Rural => "Rural, below 1000 m",
            SiteType::RuralHighAltitude => "Rural, above 1000 m",
            SiteType::HighAlpine => "High alpine",
            SiteType::Standard => STANDARD_REFERENCE_LABEL,
            SiteType::Other(label) => label,
        }
    }

    pub fn is_standard(&self) -> bool {
        matches!(self, SiteType::Standard)
    }
}

impl fmt::Display for SiteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One measurement snapshot for one NABEL site at one as-of time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalObservation {
    pub site: String,
    pub location: String,
    pub site_type: SiteType,

    // Concentrations in µg/m³ (CO in mg/m³); `None` where the page shows no number
    pub o3: Option<f64>,
    pub o3_max: Option<f64>,
    pub no2: Option<f64>,
    pub nox: Option<f64>,
    pub so2: Option<f64>,
    pub pm10: Option<f64>,
    pub pm2_5: Option<f64>,
    pub co: Option<f64>,

    pub timestamp: NaiveDateTime,
}

impl LocalObservation {
    pub fn pollutant(&self, pollutant: Pollutant) -> Option<f64> {
        match pollutant {
            Pollutant::O3 => self.o3,
            Pollutant::O3Max => self.o3_max,
            Pollutant::NO2 => self.no2,
            Pollutant::NOx => self.nox,
            Pollutant::SO2 => self.so2,
            Pollutant::PM10 => self.pm10,
            Pollutant::PM2_5 => self.pm2_5,
            Pollutant::CO => self.co,
        }
    }

    pub fn set_pollutant(&mut self, pollutant: Pollutant, value: Option<f64>) {
        let slot = match pollutant {
            Pollutant::O3 => &mut self.o3,
            Pollutant::O3Max => &mut self.o3_max,
            Pollutant::NO2 => &mut self.no2,
            Pollutant::NOx => &mut self.nox,
            Pollutant::SO2 => &mut self.so2,
            Pollutant::PM10 => &mut self.pm10,
            Pollutant::PM2_5 => &mut self.pm2_5,
            Pollutant::CO => &mut self.co,
        };
        *slot = value;
    }
}

/// Pollutants reported by the local source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pollutant {
    O3,
    O3Max,
    NO2,
    NOx,
    SO2,
    PM10,
    PM2_5,
    CO,
}

impl Pollutant {
    pub const ALL: [Pollutant; 8] = [
        Pollutant::O3,
        Pollutant::O3Max,
        Pollutant::NO2,
        Pollutant::NOx,
        Pollutant::SO2,
        Pollutant::PM10,
        Pollutant::PM2_5,
        Pollutant::CO,
    ];

    /// Canonical ASCII column id.
    pub fn column_name(&self) -> &'static str {
        match self {
            Pollutant::O3 => "O3",
            Pollutant::O3Max => "O3max",
            Pollutant::NO2 => "NO2",
            Pollutant::NOx => "NOX",
            Pollutant::SO2 => "SO2",
            Pollutant::PM10 => "PM10",
            Pollutant::PM2_5 => "PM2_5",
            Pollutant::CO => "CO",
        }
    }

    /// Match a folded header key (see `utils::text::header_key`).
    pub fn from_header_key(key: &str) -> Option<Self> {
        match key {
            "o3" | "ozone" => Some(Pollutant::O3),
            "o3max" | "ozonemax" => Some(Pollutant::O3Max),
            "no2" => Some(Pollutant::NO2),
            "nox" => Some(Pollutant::NOx),
            "so2" => Some(Pollutant::SO2),
            "pm10" => Some(Pollutant::PM10),
            "pm2.5" | "pm25" | "pm2,5" | "pm2_5" => Some(Pollutant::PM2_5),
            "co" => Some(Pollutant::CO),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalColumn {
    Site,
    Location,
    SiteType,
    Pollutant(Pollutant),
    Timestamp,
}

const LOCAL_COLUMNS: &[ColumnDef<LocalColumn>] = &[
    ColumnDef::new(LocalColumn::Site, "site", &[], ColumnKind::Text, false),
    ColumnDef::new(
        LocalColumn::Location,
        "location",
        &["Location", "Station"],
        ColumnKind::Text,
        true,
    ),
    ColumnDef::new(
        LocalColumn::SiteType,
        "site_type",
        &["Type of site"],
        ColumnKind::Category,
        true,
    ),
    ColumnDef::new(
        LocalColumn::Pollutant(Pollutant::O3),
        "O3",
        &["O₃"],
        ColumnKind::Float,
        false,
    ),
    ColumnDef::new(
        LocalColumn::Pollutant(Pollutant::O3Max),
        "O3max",
        &["O₃max"],
        ColumnKind::Float,
        false,
    ),
    ColumnDef::new(
        LocalColumn::Pollutant(Pollutant::NO2),
        "NO2",
        &["NO₂"],
        ColumnKind::Float,
        false,
    ),
    ColumnDef::new(
        LocalColumn::Pollutant(Pollutant::NOx),
        "NOX",
        &["NOₓ"],
        ColumnKind::Float,
        false,
    ),
    ColumnDef::new(
        LocalColumn::Pollutant(Pollutant::SO2),
        "SO2",
        &["SO₂"],
        ColumnKind::Float,
        false,
    ),
    ColumnDef::new(
        LocalColumn::Pollutant(Pollutant::PM10),
        "PM10",
        &[],
        ColumnKind::Float,
        false,
    ),
    ColumnDef::new(
        LocalColumn::Pollutant(Pollutant::PM2_5),
        "PM2_5",
        &["PM2.5"],
        ColumnKind::Float,
        false,
    ),
    ColumnDef::new(
        LocalColumn::Pollutant(Pollutant::CO),
        "CO",
        &[],
        ColumnKind::Float,
        false,
    ),
    ColumnDef::new(
        LocalColumn::Timestamp,
        "timestamp",
        &["Date"],
        ColumnKind::Timestamp,
        false,
    ),
];

impl Tabular for LocalObservation {
    type Column = LocalColumn;

    fn columns() -> &'static [ColumnDef<LocalColumn>] {
        LOCAL_COLUMNS
    }

    fn cell(&self, column: LocalColumn) -> Value {
        match column {
            LocalColumn::Site => Value::from(self.site.as_str()),
            LocalColumn::Location => Value::from(self.location.as_str()),
            LocalColumn::SiteType => Value::from(self.site_type.label()),
            LocalColumn::Pollutant(p) => Value::from(self.pollutant(p)),
            LocalColumn::Timestamp => Value::Timestamp(self.timestamp),
        }
    }
}
