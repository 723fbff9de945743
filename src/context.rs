use std::sync::Arc;
use tracing::info;

use crate::config::Settings;
use crate::error::{ProcessingError, Result};
use crate::fetch::{Fetcher, HttpFetcher};
use crate::ingest::{ArchiveSource, BootstrapReport, IngestionService, LocalSource};
use crate::models::{ArchiveRecord, LocalObservation};
use crate::storage::{ParquetStore, TableHandle};

/// The ingestion services of one process, built once from [`Settings`] and
/// passed to whatever serves queries.
pub struct DataContext<F: Fetcher = HttpFetcher> {
    store: ParquetStore,
    local: IngestionService<LocalSource, F>,
    archive: IngestionService<ArchiveSource, F>,
}

impl DataContext<HttpFetcher> {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let fetcher = HttpFetcher::new()?;
        Self::with_fetcher(settings, Arc::new(fetcher))
    }
}

impl<F: Fetcher> DataContext<F> {
    /// Build the context around an existing fetcher, shared by both sources.
    pub fn with_fetcher(settings: &Settings, fetcher: Arc<F>) -> Result<Self> {
        settings.check()?;

        std::fs::create_dir_all(&settings.data_dir).map_err(|e| {
            ProcessingError::Config(format!(
                "cannot create data directory {}: {}",
                settings.data_dir.display(),
                e
            ))
        })?;
        let store = ParquetStore::new(&settings.data_dir).with_compression(&settings.compression)?;

        let local = LocalSource::new(&settings.local.source_name, &settings.local.url)
            .with_timeout(settings.local.timeout());
        let archive = ArchiveSource::new(&settings.archive.url, &settings.archive.sheet)
            .with_fetch_policy(settings.archive.fetch_policy());

        info!(
            data_dir = %settings.data_dir.display(),
            local = %settings.local.source_name,
            "data context ready"
        );

        Ok(Self {
            local: IngestionService::new(local, Arc::clone(&fetcher), store.clone())
                .with_failure_policy(settings.on_refresh_failure),
            archive: IngestionService::new(archive, fetcher, store.clone())
                .with_failure_policy(settings.on_refresh_failure)
                .with_refresh_mode(settings.archive.refresh),
            store,
        })
    }

    pub fn store(&self) -> &ParquetStore {
        &self.store
    }

    pub fn local(&self) -> &IngestionService<LocalSource, F> {
        &self.local
    }

    pub fn archive(&self) -> &IngestionService<ArchiveSource, F> {
        &self.archive
    }

    pub fn local_handle(&self) -> TableHandle<LocalObservation> {
        self.local.handle()
    }

    pub fn archive_handle(&self) -> TableHandle<ArchiveRecord> {
        self.archive.handle()
    }

    /// Load both stored histories without touching the network.
    pub fn load_all(&self) -> (usize, usize) {
        (self.local.load(), self.archive.load())
    }

    /// Bootstrap both sources concurrently. Each result stands on its own so
    /// the caller can report every failing source.
    pub async fn bootstrap_all(&self) -> (Result<BootstrapReport>, Result<BootstrapReport>) {
        tokio::join!(self.local.bootstrap(), self.archive.bootstrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_context_creates_data_dir() -> Result<()> {
        let dir = TempDir::new()?;
        let settings = Settings {
            data_dir: dir.path().join("nested").join("data"),
            ..Settings::default()
        };

        let context = DataContext::from_settings(&settings)?;
        assert!(settings.data_dir.is_dir());
        assert_eq!(context.store().root(), settings.data_dir.as_path());
        assert_eq!(context.local().name(), "Switzerland");
        assert_eq!(context.archive().name(), "WHO");
        assert_eq!(context.load_all(), (0, 0));
        Ok(())
    }

    #[test]
    fn test_context_rejects_invalid_settings() {
        let mut settings = Settings::default();
        settings.compression = "nope".to_string();
        assert!(DataContext::from_settings(&settings).is_err());
    }
}
