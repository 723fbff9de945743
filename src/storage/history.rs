use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

use crate::error::Result;
use crate::models::{Pull, Table, Tabular, Value};
use crate::storage::codec::ParquetRow;
use crate::storage::parquet_store::ParquetStore;

/// How an incoming pull is combined with the stored table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy<C> {
    /// Append unless any key value of the pull is already stored.
    AppendDistinct { key: C },
    /// The pull becomes the whole table.
    Replace,
}

#[derive(Debug)]
pub enum Merge<T> {
    Unchanged { reason: String },
    Updated { table: Table<T>, added: usize },
}

/// What [`HistoryStore::apply`] did with a pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    Unchanged { reason: String },
    Updated { rows: usize, added: usize },
}

/// Read-only, swappable view of a source's current table.
///
/// Readers take a snapshot and keep it for as long as they like; the writer
/// publishes a whole new table, never mutating one a reader holds.
pub struct TableHandle<T> {
    current: Arc<RwLock<Arc<Table<T>>>>,
}

impl<T> Clone for TableHandle<T> {
    fn clone(&self) -> Self {
        Self {
            current: Arc::clone(&self.current),
        }
    }
}

impl<T> TableHandle<T> {
    pub fn new(table: Table<T>) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(table))),
        }
    }

    pub fn snapshot(&self) -> Arc<Table<T>> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    pub(crate) fn publish(&self, table: Table<T>) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(table);
    }
}

impl<T> Default for TableHandle<T> {
    fn default() -> Self {
        Self::new(Table::empty())
    }
}

/// The durable, in-memory history of one source.
pub struct HistoryStore<T: Tabular> {
    name: String,
    key: String,
    store: ParquetStore,
    policy: MergePolicy<T::Column>,
    handle: TableHandle<T>,
}

impl<T: Tabular + ParquetRow> HistoryStore<T> {
    pub fn new(
        name: impl Into<String>,
        key: impl Into<String>,
        store: ParquetStore,
        policy: MergePolicy<T::Column>,
    ) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            store,
            policy,
            handle: TableHandle::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn policy(&self) -> MergePolicy<T::Column> {
        self.policy
    }

    pub fn parquet_store(&self) -> &ParquetStore {
        &self.store
    }

    pub fn handle(&self) -> TableHandle<T> {
        self.handle.clone()
    }

    pub fn snapshot(&self) -> Arc<Table<T>> {
        self.handle.snapshot()
    }

    /// Load the durable copy and publish it. Returns the number of rows loaded;
    /// an absent or empty store loads as an empty table.
    pub fn load(&self) -> Result<usize> {
        let rows = self.store.load::<T>(&self.key)?.unwrap_or_default();
        let count = rows.len();
        self.handle.publish(Table::new(rows));
        debug!(source = %self.name, rows = count, "history loaded");
        Ok(count)
    }

    /// Combine `pull` with the current snapshot without touching it.
    pub fn merge(&self, pull: Pull<T>) -> Merge<T> {
        let base = self.snapshot();

        match self.policy {
            MergePolicy::Replace => {
                let added = pull.rows.len();
                Merge::Updated {
                    table: Table::new(pull.rows),
                    added,
                }
            }
            MergePolicy::AppendDistinct { .. } if base.is_empty() => {
                if pull.rows.is_empty() {
                    return Merge::Unchanged {
                        reason: "pull contained no rows".to_string(),
                    };
                }
                let added = pull.rows.len();
                Merge::Updated {
                    table: Table::new(pull.rows),
                    added,
                }
            }
            MergePolicy::AppendDistinct { key } => {
                if pull.rows.is_empty() {
                    return Merge::Unchanged {
                        reason: "pull contained no rows".to_string(),
                    };
                }

                let mut incoming: Vec<Value> = Vec::new();
                for row in &pull.rows {
                    let value = row.cell(key);
                    if !incoming.contains(&value) {
                        incoming.push(value);
                    }
                }
                if let Some(dup) = incoming.iter().find(|v| base.contains_value(key, v)) {
                    return Merge::Unchanged {
                        reason: format!("key {} already stored", dup),
                    };
                }

                let added = pull.rows.len();
                let mut rows = Vec::with_capacity(base.len() + added);
                rows.extend_from_slice(base.rows());
                rows.extend(pull.rows);
                Merge::Updated {
                    table: Table::new(rows),
                    added,
                }
            }
        }
    }

    pub fn persist(&self, table: &Table<T>) -> Result<()> {
        self.store.store(&self.key, table.rows())
    }

    /// Merge, persist, then publish. A persist failure leaves both the durable
    /// copy and the published table as they were.
    pub fn apply(&self, pull: Pull<T>) -> Result<MergeOutcome> {
        match self.merge(pull) {
            Merge::Unchanged { reason } => {
                info!(source = %self.name, %reason, "pull discarded");
                Ok(MergeOutcome::Unchanged { reason })
            }
            Merge::Updated { table, added } => {
                self.persist(&table)?;
                let rows = table.len();
                info!(source = %self.name, rows, added, "history updated");
                self.handle.publish(table);
                Ok(MergeOutcome::Updated { rows, added })
            }
        }
    }

    pub fn min(&self, column: T::Column) -> Option<Value> {
        self.snapshot().min(column)
    }

    pub fn max(&self, column: T::Column) -> Option<Value> {
        self.snapshot().max(column)
    }

    /// Number of distinct key values, i.e. pulls for an append-only history.
    pub fn distinct_keys(&self) -> usize {
        match self.policy {
            MergePolicy::AppendDistinct { key } => self.snapshot().distinct_count(key),
            MergePolicy::Replace => usize::from(!self.snapshot().is_empty()),
        }
    }
}
