use std::cmp::Ordering;
use tracing::warn;

use crate::error::{ProcessingError, Result};
use crate::models::{ColumnKind, Tabular, Value};
use crate::utils::constants::FILTER_SEPARATOR;
use crate::utils::datetime::{parse_datetime_literal, year_start};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Ge,
    Le,
    Lt,
    Gt,
    Ne,
    Eq,
    Contains,
    DateStartsWith,
}

/// Scan order matters: a token must come before any shorter token that prefixes it.
const OPERATORS: &[(Operator, &[&str])] = &[
    (Operator::Ge, &[">=", "ge"]),
    (Operator::Le, &["<=", "le"]),
    (Operator::Lt, &["<", "lt"]),
    (Operator::Gt, &[">", "gt"]),
    (Operator::Ne, &["!=", "ne"]),
    (Operator::Eq, &["=", "eq"]),
    (Operator::Contains, &["contains"]),
    (Operator::DateStartsWith, &["datestartswith"]),
];

impl Operator {
    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            Operator::Ge | Operator::Le | Operator::Lt | Operator::Gt
        )
    }

    /// Match an operator at the start of `text`, returning it and the remainder.
    fn scan(text: &str) -> Option<(Operator, &str)> {
        OPERATORS.iter().find_map(|(op, tokens)| {
            tokens.iter().find_map(|token| {
                let rest = text.strip_prefix(*token)?;
                let is_word = token.chars().all(|c| c.is_ascii_alphabetic());
                if is_word && !rest.starts_with(char::is_whitespace) {
                    return None;
                }
                Some((*op, rest))
            })
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    Text(String),
}

impl Literal {
    /// Quoted text is always a string; otherwise a number if it parses.
    fn parse(raw: &str) -> Option<Literal> {
        let raw = raw.trim();
        let first = raw.chars().next()?;
        if raw.len() >= 2 && matches!(first, '\'' | '"' | '`') && raw.ends_with(first) {
            let inner = &raw[1..raw.len() - 1];
            let escaped = format!("\\{}", first);
            return Some(Literal::Text(inner.replace(&escaped, &first.to_string())));
        }
        match raw.parse::<f64>() {
            Ok(n) if n.is_finite() => Some(Literal::Number(n)),
            _ => Some(Literal::Text(raw.to_string())),
        }
    }
}

/// One `{column} op literal` fragment, before it meets a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub operator: Operator,
    pub literal: Literal,
    /// Literal exactly as written, after trimming.
    pub raw: String,
}

impl Condition {
    pub fn parse(fragment: &str) -> Result<Self> {
        let fragment = fragment.trim();
        let open = fragment
            .find('{')
            .ok_or_else(|| ProcessingError::malformed(fragment, "no {column} reference"))?;
        let close = fragment[open..]
            .find('}')
            .map(|i| open + i)
            .ok_or_else(|| ProcessingError::malformed(fragment, "unterminated {column}"))?;

        let column = fragment[open + 1..close].trim();
        if column.is_empty() {
            return Err(ProcessingError::malformed(fragment, "empty column name"));
        }

        let after = fragment[close + 1..].trim_start();
        let (operator, rest) = Operator::scan(after)
            .ok_or_else(|| ProcessingError::malformed(fragment, "unknown operator"))?;

        let raw = rest.trim();
        let literal = Literal::parse(raw)
            .ok_or_else(|| ProcessingError::malformed(fragment, "missing value"))?;

        Ok(Self {
            column: column.to_string(),
            operator,
            literal,
            raw: raw.to_string(),
        })
    }

    fn text(&self) -> String {
        match &self.literal {
            Literal::Text(s) => s.clone(),
            Literal::Number(_) => self.raw.clone(),
        }
    }
}

#[derive(Debug, Clone)]
enum Test {
    Compare(Operator, Value),
    Contains(String),
    StartsWith(String),
}

/// A condition checked against a table's schema.
#[derive(Debug, Clone)]
pub struct Predicate<C> {
    column: C,
    name: &'static str,
    test: Test,
}

impl<C: Copy + 'static> Predicate<C> {
    pub fn column(&self) -> C {
        self.column
    }

    pub fn column_name(&self) -> &'static str {
        self.name
    }

    pub fn bind<T: Tabular<Column = C>>(condition: &Condition, fragment: &str) -> Result<Self> {
        let def = T::column_def(&condition.column).ok_or_else(|| {
            ProcessingError::malformed(fragment, format!("unknown column '{}'", condition.column))
        })?;

        let test = match condition.operator {
            op if op.is_ordering() => {
                if !def.kind.is_ordered() {
                    return Err(ProcessingError::malformed(
                        fragment,
                        format!("'{}' cannot be ordered", def.name),
                    ));
                }
                Test::Compare(op, coerce(def.kind, condition, fragment)?)
            }
            Operator::Contains => {
                if !def.searchable {
                    return Err(ProcessingError::malformed(
                        fragment,
                        format!("'{}' does not support contains", def.name),
                    ));
                }
                Test::Contains(condition.text().to_lowercase())
            }
            Operator::DateStartsWith => {
                if !def.kind.is_temporal() {
                    return Err(ProcessingError::malformed(
                        fragment,
                        format!("'{}' is not a date column", def.name),
                    ));
                }
                Test::StartsWith(condition.text())
            }
            op => Test::Compare(op, coerce(def.kind, condition, fragment)?),
        };

        Ok(Self {
            column: def.column,
            name: def.name,
            test,
        })
    }

    /// Nulls only satisfy `ne`.
    pub fn matches<T: Tabular<Column = C>>(&self, row: &T) -> bool {
        let cell = row.cell(self.column);
        if cell.is_null() {
            return matches!(self.test, Test::Compare(Operator::Ne, _));
        }

        match &self.test {
            Test::Compare(op, literal) => {
                let ord = cell.compare(literal);
                match op {
                    Operator::Eq => ord == Some(Ordering::Equal),
                    Operator::Ne => ord != Some(Ordering::Equal),
                    Operator::Lt => ord == Some(Ordering::Less),
                    Operator::Le => matches!(ord, Some(Ordering::Less | Ordering::Equal)),
                    Operator::Gt => ord == Some(Ordering::Greater),
                    Operator::Ge => matches!(ord, Some(Ordering::Greater | Ordering::Equal)),
                    Operator::Contains | Operator::DateStartsWith => false,
                }
            }
            Test::Contains(needle) => cell.to_string().to_lowercase().contains(needle.as_str()),
            Test::StartsWith(prefix) => cell.to_string().starts_with(prefix.as_str()),
        }
    }
}

fn coerce(kind: ColumnKind, condition: &Condition, fragment: &str) -> Result<Value> {
    let mismatch = |what: &str| ProcessingError::malformed(fragment, format!("expected {}", what));

    match (kind, &condition.literal) {
        (ColumnKind::Float | ColumnKind::Integer, Literal::Number(n)) => Ok(Value::Float(*n)),
        (ColumnKind::Float | ColumnKind::Integer, Literal::Text(_)) => Err(mismatch("a number")),
        (ColumnKind::Text | ColumnKind::Category, _) => Ok(Value::Text(condition.text())),
        (ColumnKind::Timestamp | ColumnKind::Date, Literal::Number(n)) => year_start(*n)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(Value::Timestamp)
            .ok_or_else(|| mismatch("a year or a date")),
        (ColumnKind::Timestamp | ColumnKind::Date, Literal::Text(s)) => parse_datetime_literal(s)
            .map(Value::Timestamp)
            .ok_or_else(|| mismatch("a date")),
        (ColumnKind::Bool, literal) => match literal {
            Literal::Number(n) if *n == 1.0 => Ok(Value::Bool(true)),
            Literal::Number(n) if *n == 0.0 => Ok(Value::Bool(false)),
            Literal::Text(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            Literal::Text(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
            _ => Err(mismatch("true or false")),
        },
    }
}

/// A conjunction of predicates; fragments that do not bind are kept aside.
#[derive(Debug)]
pub struct Filter<T: Tabular> {
    predicates: Vec<Predicate<T::Column>>,
    rejected: Vec<ProcessingError>,
}

impl<T: Tabular> Filter<T> {
    pub fn parse(expr: &str) -> Self {
        let mut predicates = Vec::new();
        let mut rejected = Vec::new();

        for fragment in expr.split(FILTER_SEPARATOR) {
            let fragment = fragment.trim();
            if fragment.is_empty() {
                continue;
            }
            let bound = Condition::parse(fragment)
                .and_then(|condition| Predicate::bind::<T>(&condition, fragment));
            match bound {
                Ok(predicate) => predicates.push(predicate),
                Err(e) => {
                    warn!(%fragment, error = %e, "skipping filter fragment");
                    rejected.push(e);
                }
            }
        }

        Self {
            predicates,
            rejected,
        }
    }

    pub fn predicates(&self) -> &[Predicate<T::Column>] {
        &self.predicates
    }

    pub fn rejected(&self) -> &[ProcessingError] {
        &self.rejected
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn matches(&self, row: &T) -> bool {
        matches_all(&self.predicates, row)
    }
}

pub(crate) fn matches_all<T: Tabular>(predicates: &[Predicate<T::Column>], row: &T) -> bool {
    predicates.iter().all(|p| p.matches(row))
}
