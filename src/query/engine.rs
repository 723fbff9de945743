use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::models::{Record, Table, Tabular};
use crate::query::filter::{matches_all, Filter};
use crate::query::sort::SortSpec;
use crate::utils::constants::DEFAULT_PAGE_SIZE;

/// Everything a presentation layer sends to ask for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub filter: String,
    pub sort: SortSpec,
    pub page_index: usize,
    pub page_size: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            filter: String::new(),
            sort: SortSpec::default(),
            page_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(filter: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
            ..Self::default()
        }
    }

    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_page(mut self, page_index: usize, page_size: usize) -> Self {
        self.page_index = page_index;
        self.page_size = page_size;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub records: Vec<Record>,
    /// Rows matching the filter across all pages.
    pub total_matches: usize,
    pub page_index: usize,
    pub page_size: usize,
    /// Filter fragments that were skipped, with the reason.
    pub rejected: Vec<String>,
}

impl Page {
    pub fn page_count(&self) -> usize {
        if self.page_size == 0 {
            0
        } else {
            self.total_matches.div_ceil(self.page_size)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Filter, sort and slice a table snapshot. Holds no state between calls.
pub struct QueryEngine;

impl QueryEngine {
    pub fn page<T: Tabular>(table: &Table<T>, request: &PageRequest) -> Page {
        let filter = Filter::<T>::parse(&request.filter);
        let predicates = filter.predicates();

        let mut matched: Vec<&T> = table
            .rows()
            .par_iter()
            .filter(|row| matches_all(predicates, *row))
            .collect();

        request.sort.apply(&mut matched);

        let total_matches = matched.len();
        let start = request.page_index.saturating_mul(request.page_size);
        let records: Vec<Record> = matched
            .into_iter()
            .skip(start)
            .take(request.page_size)
            .map(T::to_record)
            .collect();

        debug!(
            total_matches,
            returned = records.len(),
            page_index = request.page_index,
            "page served"
        );

        Page {
            records,
            total_matches,
            page_index: request.page_index,
            page_size: request.page_size,
            rejected: filter.rejected().iter().map(|e| e.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArchiveRecord, Value};
    use crate::query::sort::SortKey;
    use pretty_assertions::assert_eq;

    fn table(n: usize) -> Table<ArchiveRecord> {
        Table::new(
            (0..n)
                .map(|i| {
                    let mut r = ArchiveRecord::new(
                        "Switzerland".to_string(),
                        format!("City {}", i),
                        2010.0 + i as f64,
                    )
                    .unwrap();
                    r.no2_concentration = Some(i as f64);
                    r
                })
                .collect(),
        )
    }

    #[test]
    fn test_page_boundaries() {
        let table = table(7);

        let first = QueryEngine::page(&table, &PageRequest::new("").with_page(0, 10));
        assert_eq!(first.records.len(), 7);
        assert_eq!(first.page_count(), 1);

        let second = QueryEngine::page(&table, &PageRequest::new("").with_page(1, 10));
        assert!(second.is_empty());
        assert_eq!(second.total_matches, 7);

        let none = QueryEngine::page(&table, &PageRequest::new("").with_page(0, 0));
        assert!(none.is_empty());
        assert_eq!(none.page_count(), 0);
    }

    #[test]
    fn test_filter_sort_and_slice() {
        let table = table(7);
        let request = PageRequest::new("{NO2} ge 3")
            .with_sort(SortSpec::new(vec![SortKey::desc("NO2")]))
            .with_page(1, 2);

        let page = QueryEngine::page(&table, &request);
        assert_eq!(page.total_matches, 4);
        let no2: Vec<Option<&Value>> = page
            .records
            .iter()
            .map(|r| r.get("no2_concentration"))
            .collect();
        assert_eq!(no2, vec![Some(&Value::Float(4.0)), Some(&Value::Float(3.0))]);
    }

    #[test]
    fn test_same_request_same_page() {
        let table = table(7);
        let request = PageRequest::new("{Year} gt 2011 && {City} contains city")
            .with_sort(SortSpec::new(vec![SortKey::desc("year")]))
            .with_page(0, 3);

        let a = QueryEngine::page(&table, &request);
        let b = QueryEngine::page(&table, &request);
        assert_eq!(a.records, b.records);
        assert_eq!(a.total_matches, 5);
    }
}
