use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::error::{ProcessingError, Result};
use crate::models::{LocalObservation, Pollutant, Pull, SiteType};
use crate::readers::{HtmlTable, RawTable};
use crate::utils::constants::CAPTION_PREFIX;
use crate::utils::datetime::parse_day_first;
use crate::utils::text::{header_key, normalize_ws, slugify};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LocalHeader {
    Location,
    SiteType,
    Pollutant(Pollutant),
}

impl LocalHeader {
    fn from_raw(raw: &str) -> Option<Self> {
        match header_key(raw).as_str() {
            "location" | "station" | "site" => Some(LocalHeader::Location),
            "typeofsite" | "sitetype" => Some(LocalHeader::SiteType),
            key => Pollutant::from_header_key(key).map(LocalHeader::Pollutant),
        }
    }
}

/// Column positions resolved from the page header row.
struct LocalLayout {
    location: usize,
    site_type: usize,
    pollutants: Vec<(Pollutant, usize)>,
}

impl LocalLayout {
    fn resolve(table: &RawTable) -> Result<Self> {
        let mut location = None;
        let mut site_type = None;
        let mut pollutants: Vec<(Pollutant, usize)> = Vec::new();

        for (index, raw) in table.headers.iter().enumerate() {
            match LocalHeader::from_raw(raw) {
                Some(LocalHeader::Location) => {
                    location.get_or_insert(index);
                }
                Some(LocalHeader::SiteType) => {
                    site_type.get_or_insert(index);
                }
                Some(LocalHeader::Pollutant(p)) => {
                    if !pollutants.iter().any(|(known, _)| *known == p) {
                        pollutants.push((p, index));
                    }
                }
                None => debug!(header = %raw, "ignoring unrecognised column"),
            }
        }

        let location = location.ok_or_else(|| {
            ProcessingError::Schema("local table has no 'Location' column".to_string())
        })?;
        let site_type = site_type.ok_or_else(|| {
            ProcessingError::Schema("local table has no 'Type of site' column".to_string())
        })?;

        for p in Pollutant::ALL {
            if !pollutants.iter().any(|(known, _)| *known == p) {
                debug!(pollutant = p.column_name(), "pollutant column absent, values are null");
            }
        }

        Ok(Self {
            location,
            site_type,
            pollutants,
        })
    }
}

/// Turns the extracted NABEL table into typed observations sharing one as-of time.
pub struct LocalNormalizer;

impl LocalNormalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(&self, extracted: &HtmlTable) -> Result<Pull<LocalObservation>> {
        let as_of = parse_caption(&extracted.caption)?;
        let layout = LocalLayout::resolve(&extracted.table)?;

        let mut rows = Vec::with_capacity(extracted.table.rows.len());
        let mut dropped = 0;

        for raw in &extracted.table.rows {
            let location = normalize_ws(&RawTable::cell(raw, layout.location).as_text());
            let site_type =
                SiteType::from_label(&RawTable::cell(raw, layout.site_type).as_text());

            if site_type.is_standard() || location.is_empty() {
                dropped += 1;
                continue;
            }

            let mut observation = LocalObservation {
                site: slugify(&location),
                location,
                site_type,
                o3: None,
                o3_max: None,
                no2: None,
                nox: None,
                so2: None,
                pm10: None,
                pm2_5: None,
                co: None,
                timestamp: as_of,
            };
            for &(pollutant, index) in &layout.pollutants {
                observation.set_pollutant(pollutant, RawTable::cell(raw, index).as_f64());
            }
            rows.push(observation);
        }

        if rows.is_empty() {
            warn!(%as_of, "local table contained no site rows");
        }
        debug!(rows = rows.len(), dropped, %as_of, "normalised local table");

        Ok(Pull {
            rows,
            as_of: Some(as_of),
            dropped,
        })
    }
}

impl Default for LocalNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// `"Date from: 05.01.2024 21:00"` -> 2024-01-05 21:00.
pub fn parse_caption(caption: &str) -> Result<NaiveDateTime> {
    let caption = caption.trim();
    let rest = match caption.get(..CAPTION_PREFIX.len()) {
        Some(head) if head.eq_ignore_ascii_case(CAPTION_PREFIX) => {
            &caption[CAPTION_PREFIX.len()..]
        }
        _ => caption,
    };

    parse_day_first(rest).ok_or_else(|| {
        ProcessingError::Schema(format!("caption '{}' does not carry a day-first date", caption))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readers::RawCell;
    use chrono::NaiveDate;

    fn text(s: &str) -> RawCell {
        RawCell::Text(s.to_string())
    }

    fn sample() -> HtmlTable {
        HtmlTable {
            caption: "Date from: 05.01.2024 21:00".to_string(),
            table: RawTable {
                headers: vec![
                    "Location".to_string(),
                    "Type of site".to_string(),
                    "O₃".to_string(),
                    "NO₂".to_string(),
                    "PM10".to_string(),
                ],
                rows: vec![
                    vec![
                        text("Bern-Bollwerk"),
                        text("Urban, traffic"),
                        text("12"),
                        text("31.5"),
                        text("n/a"),
                    ],
                    vec![
                        text("Zürich-Kaserne"),
                        text("Urban"),
                        RawCell::Empty,
                        text("20"),
                        text("8"),
                    ],
                    vec![
                        text("Limit"),
                        text("Ambient air quality standard [µg/m³]"),
                        text("120"),
                        text("30"),
                        text("50"),
                    ],
                ],
            },
        }
    }

    #[test]
    fn test_normalize_sample_page() -> Result<()> {
        let pull = LocalNormalizer::new().normalize(&sample())?;
        let as_of = NaiveDate::from_ymd_opt(2024, 1, 5)
            .unwrap()
            .and_hms_opt(21, 0, 0)
            .unwrap();

        assert_eq!(pull.as_of, Some(as_of));
        assert_eq!(pull.rows.len(), 2);
        assert_eq!(pull.dropped, 1);

        let bern = &pull.rows[0];
        assert_eq!(bern.site, "bern-bollwerk");
        assert_eq!(bern.site_type, SiteType::UrbanTraffic);
        assert_eq!(bern.o3, Some(12.0));
        assert_eq!(bern.no2, Some(31.5));
        assert_eq!(bern.pm10, None);
        assert_eq!(bern.so2, None);
        assert!(pull.rows.iter().all(|r| r.timestamp == as_of));

        assert_eq!(pull.rows[1].site, "zuerich-kaserne");
        assert_eq!(pull.rows[1].o3, None);
        Ok(())
    }

    #[test]
    fn test_missing_type_of_site_is_schema_error() {
        let mut page = sample();
        page.table.headers[1] = "Category".to_string();

        let err = LocalNormalizer::new().normalize(&page).unwrap_err();
        assert!(matches!(err, ProcessingError::Schema(_)));
    }

    #[test]
    fn test_unparseable_caption_is_schema_error() {
        let mut page = sample();
        page.caption = "Date from: soon".to_string();

        let err = LocalNormalizer::new().normalize(&page).unwrap_err();
        assert!(matches!(err, ProcessingError::Schema(_)));
    }

    #[test]
    fn test_caption_prefix_is_case_insensitive() -> Result<()> {
        let parsed = parse_caption("DATE FROM: 02.03.2024 10:00")?;
        assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
        Ok(())
    }
}
