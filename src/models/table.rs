use chrono::{NaiveDate, NaiveDateTime};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::cmp::Ordering;
use std::fmt;

use crate::utils::constants::{DATE_ISO_FORMAT, TIMESTAMP_ISO_FORMAT};

/// Storage type of a column, which decides the operators a filter may apply to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Float,
    Integer,
    Text,
    Category,
    Bool,
    Timestamp,
    Date,
}

impl ColumnKind {
    pub fn is_ordered(self) -> bool {
        matches!(
            self,
            ColumnKind::Float | ColumnKind::Integer | ColumnKind::Timestamp | ColumnKind::Date
        )
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Float | ColumnKind::Integer)
    }

    pub fn is_temporal(self) -> bool {
        matches!(self, ColumnKind::Timestamp | ColumnKind::Date)
    }

    pub fn is_textual(self) -> bool {
        matches!(self, ColumnKind::Text | ColumnKind::Category)
    }
}

/// One entry of a table's schema descriptor.
#[derive(Debug, Clone, Copy)]
pub struct ColumnDef<C: 'static> {
    pub column: C,
    /// Canonical column id, used in records and in `{...}` filter references.
    pub name: &'static str,
    /// Display names the presentation layer may use instead of `name`.
    pub aliases: &'static [&'static str],
    pub kind: ColumnKind,
    /// Whether `contains` may be applied.
    pub searchable: bool,
}

impl<C: Copy + 'static> ColumnDef<C> {
    pub const fn new(
        column: C,
        name: &'static str,
        aliases: &'static [&'static str],
        kind: ColumnKind,
        searchable: bool,
    ) -> Self {
        Self {
            column,
            name,
            aliases,
            kind,
            searchable,
        }
    }
}

/// A row type with a fixed, typed schema.
pub trait Tabular: Clone + Send + Sync + 'static {
    type Column: Copy + Eq + fmt::Debug + Send + Sync + 'static;

    fn columns() -> &'static [ColumnDef<Self::Column>];

    fn cell(&self, column: Self::Column) -> Value;

    /// Resolve a column by canonical id, then alias, then either ignoring ASCII case.
    fn column_def(name: &str) -> Option<&'static ColumnDef<Self::Column>> {
        let name = name.trim();
        let columns = Self::columns();
        columns
            .iter()
            .find(|c| c.name == name)
            .or_else(|| columns.iter().find(|c| c.aliases.contains(&name)))
            .or_else(|| columns.iter().find(|c| c.name.eq_ignore_ascii_case(name)))
            .or_else(|| {
                columns
                    .iter()
                    .find(|c| c.aliases.iter().any(|a| a.eq_ignore_ascii_case(name)))
            })
    }

    fn to_record(&self) -> Record {
        Record::new(
            Self::columns()
                .iter()
                .map(|c| (c.name, self.cell(c.column)))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Ordering between two values of compatible kinds; `None` across kinds or with nulls.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Date(b)) => b.and_hms_opt(0, 0, 0).map(|b| a.cmp(&b)),
            (Value::Date(a), Value::Timestamp(b)) => a.and_hms_opt(0, 0, 0).map(|a| a.cmp(b)),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => Some(a.total_cmp(&b)),
                _ => None,
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(v) => f.write_str(v),
            Value::Timestamp(v) => write!(f, "{}", v.format(TIMESTAMP_ISO_FORMAT)),
            Value::Date(v) => write!(f, "{}", v.format(DATE_ISO_FORMAT)),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Int(v) => serializer.serialize_i64(*v),
            Value::Float(v) if v.is_finite() => serializer.serialize_f64(*v),
            Value::Float(_) => serializer.serialize_none(),
            Value::Text(v) => serializer.serialize_str(v),
            Value::Timestamp(_) | Value::Date(_) => serializer.collect_str(self),
        }
    }
}

impl From<Option<f64>> for Value {
    fn from(v: Option<f64>) -> Self {
        v.map_or(Value::Null, Value::Float)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

/// One row as an ordered mapping from column id to value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(&'static str, Value)>,
}

impl Record {
    pub fn new(fields: Vec<(&'static str, Value)>) -> Self {
        Self { fields }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|(name, _)| *name)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// An immutable snapshot of a source's rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Table<T> {
    rows: Vec<T>,
}

impl<T> Table<T> {
    pub fn new(rows: Vec<T>) -> Self {
        Self { rows }
    }

    pub fn empty() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<T> {
        self.rows
    }
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: Tabular> Table<T> {
    pub fn min(&self, column: T::Column) -> Option<Value> {
        self.non_null(column)
            .min_by(|a, b| a.compare(b).unwrap_or(Ordering::Equal))
    }

    pub fn max(&self, column: T::Column) -> Option<Value> {
        self.non_null(column)
            .max_by(|a, b| a.compare(b).unwrap_or(Ordering::Equal))
    }

    /// Number of distinct non-null values in `column`.
    pub fn distinct_count(&self, column: T::Column) -> usize {
        let mut values: Vec<Value> = self.non_null(column).collect();
        values.sort_by(|a, b| a.compare(b).unwrap_or(Ordering::Equal));
        values.dedup();
        values.len()
    }

    pub fn contains_value(&self, column: T::Column, value: &Value) -> bool {
        self.rows.iter().any(|row| &row.cell(column) == value)
    }

    fn non_null(&self, column: T::Column) -> impl Iterator<Item = Value> + '_ {
        self.rows
            .iter()
            .map(move |row| row.cell(column))
            .filter(|v| !v.is_null())
    }
}

/// The normalised outcome of one fetch + extract + normalise cycle.
#[derive(Debug, Clone)]
pub struct Pull<T> {
    pub rows: Vec<T>,
    /// As-of time shared by every row, when the source has one.
    pub as_of: Option<NaiveDateTime>,
    /// Source rows discarded as non-observations.
    pub dropped: usize,
}
