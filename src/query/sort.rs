use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::error::{ProcessingError, Result};
use crate::models::{Tabular, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub column: String,
    pub direction: Direction,
}

impl SortKey {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Desc,
        }
    }
}

/// Ordered list of sort keys, most significant first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSpec {
    keys: Vec<SortKey>,
}

impl SortSpec {
    pub fn new(keys: Vec<SortKey>) -> Self {
        Self { keys }
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Stable multi-key sort. Nulls go last in either direction; unknown
    /// columns are skipped.
    pub fn apply<T: Tabular>(&self, rows: &mut Vec<&T>) {
        let resolved: Vec<(T::Column, Direction)> = self
            .keys
            .iter()
            .filter_map(|key| match T::column_def(&key.column) {
                Some(def) => Some((def.column, key.direction)),
                None => {
                    warn!(column = %key.column, "ignoring sort on unknown column");
                    None
                }
            })
            .collect();
        if resolved.is_empty() {
            return;
        }

        let mut decorated: Vec<(Vec<Value>, &T)> = rows
            .iter()
            .map(|row| {
                let key = resolved.iter().map(|(c, _)| row.cell(*c)).collect();
                (key, *row)
            })
            .collect();

        decorated.sort_by(|(a, _), (b, _)| {
            resolved
                .iter()
                .zip(a.iter().zip(b.iter()))
                .map(|((_, direction), (a, b))| compare_nulls_last(a, b, *direction))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });

        *rows = decorated.into_iter().map(|(_, row)| row).collect();
    }
}

fn compare_nulls_last(a: &Value, b: &Value, direction: Direction) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ord = a.compare(b).unwrap_or(Ordering::Equal);
            match direction {
                Direction::Asc => ord,
                Direction::Desc => ord.reverse(),
            }
        }
    }
}

/// `col[:asc|:desc],col2,...`
impl FromStr for SortSpec {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self> {
        let mut keys = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (column, direction) = match part.rsplit_once(':') {
                Some((column, dir)) => {
                    let direction = match dir.trim().to_ascii_lowercase().as_str() {
                        "asc" => Direction::Asc,
                        "desc" => Direction::Desc,
                        other => {
                            return Err(ProcessingError::malformed(
                                part,
                                format!("unknown sort direction '{}'", other),
                            ))
                        }
                    };
                    (column.trim(), direction)
                }
                None => (part, Direction::Asc),
            };
            keys.push(SortKey {
                column: column.to_string(),
                direction,
            });
        }
        Ok(Self { keys })
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .keys
            .iter()
            .map(|k| match k.direction {
                Direction::Asc => format!("{}:asc", k.column),
                Direction::Desc => format!("{}:desc", k.column),
            })
            .collect();
        f.write_str(&parts.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArchiveRecord;

    fn record(city: &str, year: f64, pm25: Option<f64>) -> ArchiveRecord {
        let mut r =
            ArchiveRecord::new("Switzerland".to_string(), city.to_string(), year).unwrap();
        r.pm25_concentration = pm25;
        r
    }

    fn cities(rows: &[&ArchiveRecord]) -> Vec<String> {
        rows.iter().map(|r| r.city.clone()).collect()
    }

    #[test]
    fn test_parse_sort_spec() -> Result<()> {
        let spec: SortSpec = "year:desc, city".parse()?;
        assert_eq!(
            spec.keys(),
            &[SortKey::desc("year"), SortKey::asc("city")]
        );
        assert_eq!(spec.to_string(), "year:desc,city:asc");
        assert!("city:sideways".parse::<SortSpec>().is_err());
        Ok(())
    }

    #[test]
    fn test_multi_key_sort_is_stable_with_nulls_last() {
        let data = vec![
            record("Bern", 2015.0, None),
            record("Basel", 2016.0, Some(9.0)),
            record("Aarau", 2015.0, Some(11.0)),
            record("Chur", 2016.0, Some(9.0)),
        ];
        let mut rows: Vec<&ArchiveRecord> = data.iter().collect();

        SortSpec::new(vec![SortKey::desc("pm25_concentration")]).apply(&mut rows);
        assert_eq!(cities(&rows), vec!["Aarau", "Basel", "Chur", "Bern"]);

        let mut rows: Vec<&ArchiveRecord> = data.iter().collect();
        SortSpec::new(vec![SortKey::asc("Year"), SortKey::desc("City")]).apply(&mut rows);
        assert_eq!(cities(&rows), vec!["Bern", "Aarau", "Chur", "Basel"]);
    }

    #[test]
    fn test_unknown_sort_column_is_ignored() {
        let data = vec![record("Bern", 2015.0, None), record("Aarau", 2016.0, None)];
        let mut rows: Vec<&ArchiveRecord> = data.iter().collect();

        SortSpec::new(vec![SortKey::asc("nope")]).apply(&mut rows);
        assert_eq!(cities(&rows), vec!["Bern", "Aarau"]);
    }
}
