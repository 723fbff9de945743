pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod fetch;
pub mod ingest;
pub mod models;
pub mod processors;
pub mod query;
pub mod readers;
pub mod storage;
pub mod utils;

pub use config::Settings;
pub use context::DataContext;
pub use error::{ErrorKind, ProcessingError, Result};
