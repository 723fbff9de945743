use std::time::Duration;

use crate::error::Result;
use crate::ingest::{DataSource, FetchPolicy};
use crate::models::{LocalColumn, LocalObservation, Pull};
use crate::processors::LocalNormalizer;
use crate::readers::HtmlTableReader;
use crate::storage::MergePolicy;
use crate::utils::constants::{
    LOCAL_DEFAULT_SOURCE_NAME, LOCAL_DEFAULT_URL, LOCAL_STORE_PREFIX, LOCAL_TIMEOUT_SECS,
};

/// The hourly NABEL table. It keeps no archive upstream, so history is
/// built locally one as-of time at a time.
#[derive(Debug, Clone)]
pub struct LocalSource {
    name: String,
    url: String,
    timeout: Duration,
}

impl LocalSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            timeout: Duration::from_secs(LOCAL_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for LocalSource {
    fn default() -> Self {
        Self::new(LOCAL_DEFAULT_SOURCE_NAME, LOCAL_DEFAULT_URL)
    }
}

impl DataSource for LocalSource {
    type Row = LocalObservation;

    fn name(&self) -> &str {
        &self.name
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn store_key(&self) -> String {
        format!("{}{}", LOCAL_STORE_PREFIX, self.name)
    }

    fn fetch_policy(&self) -> FetchPolicy {
        FetchPolicy::single(self.timeout)
    }

    fn merge_policy(&self) -> MergePolicy<LocalColumn> {
        MergePolicy::AppendDistinct {
            key: LocalColumn::Timestamp,
        }
    }

    fn parse(&self, bytes: &[u8]) -> Result<Pull<LocalObservation>> {
        let extracted = HtmlTableReader::new()?.read(bytes)?;
        LocalNormalizer::new().normalize(&extracted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_key_follows_source_name() {
        let source = LocalSource::default();
        assert_eq!(source.store_key(), "local_air_quality_data_Switzerland");
        assert_eq!(source.fetch_policy().max_attempts, 1);
        assert_eq!(source.fetch_policy().timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_parse_page() -> Result<()> {
        let html = "<html><body><table><caption>Date from: 05.01.2024 21:00</caption>\
            <tr><th>Location</th><th>Type of site</th><th>O₃</th><th>NO₂</th></tr>\
            <tr><td>Bern-Bollwerk</td><td>Urban, traffic</td><td>12</td><td>31</td></tr>\
            <tr><td>Ambient air quality standard [µg/m³]</td>\
            <td>Ambient air quality standard [µg/m³]</td><td>120</td><td>30</td></tr>\
            </table></body></html>";

        let pull = LocalSource::default().parse(html.as_bytes())?;
        assert_eq!(pull.rows.len(), 1);
        assert_eq!(pull.rows[0].no2, Some(31.0));
        Ok(())
    }

    #[test]
    fn test_page_without_table_fails_extraction() {
        let err = LocalSource::default()
            .parse(b"<html><body>Service unavailable</body></html>")
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Extraction);
    }
}
