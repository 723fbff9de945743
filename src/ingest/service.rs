use serde::Deserialize;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::error::{ErrorKind, ProcessingError, Result};
use crate::fetch::Fetcher;
use crate::ingest::DataSource;
use crate::models::{Pull, Table};
use crate::storage::{HistoryStore, MergeOutcome, ParquetStore, TableHandle};

/// What bootstrap does when a refresh fails but history was loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RefreshFailurePolicy {
    /// Keep serving the loaded history and report the failure.
    #[default]
    ServeStale,
    /// Treat every failed refresh as fatal.
    Exit,
}

/// Whether bootstrap refreshes a source that already has history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RefreshMode {
    #[default]
    Always,
    WhenEmpty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestState {
    Uninitialized,
    Loaded {
        rows: usize,
    },
    Refreshing,
    Merged {
        rows: usize,
        added: usize,
    },
    Failed {
        kind: ErrorKind,
        message: String,
        serving_stale: bool,
    },
}

impl fmt::Display for IngestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestState::Uninitialized => write!(f, "uninitialized"),
            IngestState::Loaded { rows } => write!(f, "loaded ({} rows)", rows),
            IngestState::Refreshing => write!(f, "refreshing"),
            IngestState::Merged { rows, added } => {
                write!(f, "merged ({} rows, {} new)", rows, added)
            }
            IngestState::Failed {
                kind,
                message,
                serving_stale,
            } => {
                write!(f, "failed ({:?}: {})", kind, message)?;
                if *serving_stale {
                    write!(f, ", serving stored history")?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshStatus {
    /// History was present and the refresh mode did not ask for a fetch.
    Skipped,
    Merged(MergeOutcome),
    ServingStale { cause: String },
}

/// Result of [`IngestionService::bootstrap`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapReport {
    pub source_name: String,
    pub loaded: usize,
    pub rows: usize,
    pub status: RefreshStatus,
}

impl BootstrapReport {
    pub fn summary(&self) -> String {
        let status = match &self.status {
            RefreshStatus::Skipped => "refresh skipped".to_string(),
            RefreshStatus::Merged(MergeOutcome::Updated { added, .. }) => {
                format!("{} new rows", added)
            }
            RefreshStatus::Merged(MergeOutcome::Unchanged { reason }) => {
                format!("no new rows ({})", reason)
            }
            RefreshStatus::ServingStale { cause } => format!("STALE, refresh failed: {}", cause),
        };
        format!(
            "{}: {} rows (loaded {}), {}",
            self.source_name, self.rows, self.loaded, status
        )
    }
}

/// Owns one source's history and is its only writer.
pub struct IngestionService<S: DataSource, F> {
    source: S,
    fetcher: Arc<F>,
    history: HistoryStore<S::Row>,
    failure_policy: RefreshFailurePolicy,
    refresh_mode: RefreshMode,
    refresh_guard: tokio::sync::Mutex<()>,
    state: Mutex<IngestState>,
}

impl<S: DataSource, F: Fetcher> IngestionService<S, F> {
    pub fn new(source: S, fetcher: Arc<F>, store: ParquetStore) -> Self {
        let history = HistoryStore::new(
            source.name(),
            source.store_key(),
            store,
            source.merge_policy(),
        );
        Self {
            source,
            fetcher,
            history,
            failure_policy: RefreshFailurePolicy::default(),
            refresh_mode: RefreshMode::default(),
            refresh_guard: tokio::sync::Mutex::new(()),
            state: Mutex::new(IngestState::Uninitialized),
        }
    }

    pub fn with_failure_policy(mut self, policy: RefreshFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_refresh_mode(mut self, mode: RefreshMode) -> Self {
        self.refresh_mode = mode;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn name(&self) -> &str {
        self.source.name()
    }

    pub fn history(&self) -> &HistoryStore<S::Row> {
        &self.history
    }

    pub fn handle(&self) -> TableHandle<S::Row> {
        self.history.handle()
    }

    pub fn snapshot(&self) -> Arc<Table<S::Row>> {
        self.history.snapshot()
    }

    pub fn state(&self) -> IngestState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_state(&self, state: IngestState) {
        debug!(source = %self.name(), %state, "state change");
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Load the durable history. Absent or unreadable stores start empty.
    ///
    /// While a refresh is running the published table is newer than the
    /// file, so the disk copy is not read and the published row count is
    /// returned instead.
    pub fn load(&self) -> usize {
        match self.refresh_guard.try_lock() {
            Ok(_guard) => self.load_locked(),
            Err(_) => {
                debug!(source = %self.name(), "refresh in progress, keeping published table");
                self.history.snapshot().len()
            }
        }
    }

    fn load_locked(&self) -> usize {
        let rows = match self.history.load() {
            Ok(rows) => rows,
            Err(e) => {
                warn!(source = %self.name(), error = %e, "stored history unusable, starting empty");
                self.history.handle().publish(Table::empty());
                0
            }
        };
        info!(source = %self.name(), rows, "history ready");
        self.set_state(IngestState::Loaded { rows });
        rows
    }

    /// Fetch, extract, normalise, merge and persist as one unit.
    ///
    /// Concurrent calls for the same source run one after the other. On
    /// failure the published table and the durable copy are untouched.
    pub async fn refresh(&self) -> Result<MergeOutcome> {
        let _guard = self.refresh_guard.lock().await;
        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> Result<MergeOutcome> {
        self.set_state(IngestState::Refreshing);

        let result = match self.pull().await {
            Ok(pull) => self.history.apply(pull),
            Err(e) => Err(e),
        };

        match &result {
            Ok(outcome) => {
                let added = match outcome {
                    MergeOutcome::Updated { added, .. } => *added,
                    MergeOutcome::Unchanged { .. } => 0,
                };
                self.set_state(IngestState::Merged {
                    rows: self.history.snapshot().len(),
                    added,
                });
            }
            Err(e) => {
                let serving_stale = !self.history.snapshot().is_empty();
                error!(source = %self.name(), error = %e, serving_stale, "refresh failed");
                self.set_state(IngestState::Failed {
                    kind: e.kind(),
                    message: e.to_string(),
                    serving_stale,
                });
            }
        }
        result
    }

    /// One pull, retrying transient failures within the source's fetch policy.
    async fn pull(&self) -> Result<Pull<S::Row>> {
        let policy = self.source.fetch_policy();
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.attempt().await {
                Ok(pull) => return Ok(pull),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    warn!(
                        source = %self.name(),
                        attempt,
                        max_attempts,
                        error = %e,
                        "attempt failed, retrying"
                    );
                    sleep(policy.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if attempt > 1 {
                        warn!(source = %self.name(), attempts = attempt, "giving up");
                    }
                    return Err(e);
                }
            }
        }
    }

    async fn attempt(&self) -> Result<Pull<S::Row>> {
        let policy = self.source.fetch_policy();
        let bytes = self
            .fetcher
            .fetch(self.source.url(), policy.timeout)
            .await?;
        let pull = self.source.parse(&bytes)?;
        info!(
            source = %self.name(),
            rows = pull.rows.len(),
            dropped = pull.dropped,
            as_of = ?pull.as_of,
            "pull normalised"
        );
        Ok(pull)
    }

    /// Load, then refresh according to the refresh mode.
    ///
    /// A failed refresh is returned as [`ProcessingError::Ingestion`] unless
    /// history was loaded and the failure policy is to serve it stale.
    /// Load and refresh run under the same guard as [`Self::refresh`].
    pub async fn bootstrap(&self) -> Result<BootstrapReport> {
        let _guard = self.refresh_guard.lock().await;
        let loaded = self.load_locked();

        if self.refresh_mode == RefreshMode::WhenEmpty && loaded > 0 {
            info!(source = %self.name(), "history present, refresh skipped");
            return Ok(self.report(loaded, RefreshStatus::Skipped));
        }

        match self.refresh_locked().await {
            Ok(outcome) => Ok(self.report(loaded, RefreshStatus::Merged(outcome))),
            Err(e) if self.failure_policy == RefreshFailurePolicy::ServeStale && loaded > 0 => {
                warn!(source = %self.name(), rows = loaded, "serving stored history after failed refresh");
                Ok(self.report(
                    loaded,
                    RefreshStatus::ServingStale {
                        cause: e.to_string(),
                    },
                ))
            }
            Err(e) => Err(ProcessingError::Ingestion {
                source_name: self.name().to_string(),
                cause: Box::new(e),
            }),
        }
    }

    fn report(&self, loaded: usize, status: RefreshStatus) -> BootstrapReport {
        BootstrapReport {
            source_name: self.name().to_string(),
            loaded,
            rows: self.history.snapshot().len(),
            status,
        }
    }
}
