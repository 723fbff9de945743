//! Fetch, extract, normalise and merge, per source.

pub mod archive;
pub mod local;
pub mod service;

use std::time::Duration;

use crate::error::Result;
use crate::models::{Pull, Tabular};
use crate::storage::{MergePolicy, ParquetRow};

pub use archive::ArchiveSource;
pub use local::LocalSource;
pub use service::{
    BootstrapReport, IngestState, IngestionService, RefreshFailurePolicy, RefreshMode,
    RefreshStatus,
};

/// Network budget for one refresh of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    pub timeout: Duration,
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl FetchPolicy {
    /// One attempt, no retry.
    pub fn single(timeout: Duration) -> Self {
        Self {
            timeout,
            max_attempts: 1,
            retry_delay: Duration::ZERO,
        }
    }
}

/// An upstream table: where it lives and how its bytes become rows.
pub trait DataSource: Send + Sync {
    type Row: Tabular + ParquetRow;

    fn name(&self) -> &str;

    fn url(&self) -> &str;

    /// Key of the durable record holding this source's history.
    fn store_key(&self) -> String;

    fn fetch_policy(&self) -> FetchPolicy;

    fn merge_policy(&self) -> MergePolicy<<Self::Row as Tabular>::Column>;

    fn parse(&self, bytes: &[u8]) -> Result<Pull<Self::Row>>;
}
