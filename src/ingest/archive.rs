use std::time::Duration;

use crate::error::Result;
use crate::ingest::{DataSource, FetchPolicy};
use crate::models::{ArchiveColumn, ArchiveRecord, Pull};
use crate::processors::ArchiveNormalizer;
use crate::readers::WorkbookReader;
use crate::storage::MergePolicy;
use crate::utils::constants::{
    ARCHIVE_DEFAULT_SHEET, ARCHIVE_DEFAULT_URL, ARCHIVE_MAX_ATTEMPTS, ARCHIVE_RETRY_DELAY_MS,
    ARCHIVE_SOURCE_NAME, ARCHIVE_STORE_KEY, ARCHIVE_TIMEOUT_SECS,
};

/// The WHO ambient air quality workbook, re-published as a full history.
#[derive(Debug, Clone)]
pub struct ArchiveSource {
    url: String,
    sheet: String,
    policy: FetchPolicy,
}

impl ArchiveSource {
    pub fn new(url: impl Into<String>, sheet: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            sheet: sheet.into(),
            policy: FetchPolicy {
                timeout: Duration::from_secs(ARCHIVE_TIMEOUT_SECS),
                max_attempts: ARCHIVE_MAX_ATTEMPTS,
                retry_delay: Duration::from_millis(ARCHIVE_RETRY_DELAY_MS),
            },
        }
    }

    pub fn with_fetch_policy(mut self, policy: FetchPolicy) -> Self {
        self.policy = FetchPolicy {
            max_attempts: policy.max_attempts.max(1),
            ..policy
        };
        self
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }
}

impl Default for ArchiveSource {
    fn default() -> Self {
        Self::new(ARCHIVE_DEFAULT_URL, ARCHIVE_DEFAULT_SHEET)
    }
}

impl DataSource for ArchiveSource {
    type Row = ArchiveRecord;

    fn name(&self) -> &str {
        ARCHIVE_SOURCE_NAME
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn store_key(&self) -> String {
        ARCHIVE_STORE_KEY.to_string()
    }

    fn fetch_policy(&self) -> FetchPolicy {
        self.policy
    }

    fn merge_policy(&self) -> MergePolicy<ArchiveColumn> {
        MergePolicy::Replace
    }

    fn parse(&self, bytes: &[u8]) -> Result<Pull<ArchiveRecord>> {
        let table = WorkbookReader::new(self.sheet.as_str()).read(bytes)?;
        ArchiveNormalizer::new().normalize(&table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let source = ArchiveSource::default();
        assert_eq!(source.store_key(), "air_quality_data");
        assert_eq!(source.sheet(), "Update 2024 (V6.1)");
        assert_eq!(source.fetch_policy().max_attempts, 3);
        assert_eq!(source.fetch_policy().timeout, Duration::from_secs(15));
        assert_eq!(source.merge_policy(), MergePolicy::Replace);
    }

    #[test]
    fn test_attempts_never_below_one() {
        let source = ArchiveSource::default().with_fetch_policy(FetchPolicy {
            timeout: Duration::from_secs(1),
            max_attempts: 0,
            retry_delay: Duration::ZERO,
        });
        assert_eq!(source.fetch_policy().max_attempts, 1);
    }
}
