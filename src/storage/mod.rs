pub mod codec;
pub mod history;
pub mod parquet_store;

pub use codec::ParquetRow;
pub use history::{HistoryStore, Merge, MergeOutcome, MergePolicy, TableHandle};
pub use parquet_store::{ParquetFileInfo, ParquetStore};
