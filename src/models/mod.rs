pub mod archive;
pub mod local;
pub mod table;

pub use archive::{ArchiveColumn, ArchiveRecord};
pub use local::{LocalColumn, LocalObservation, Pollutant, SiteType};
pub use table::{ColumnDef, ColumnKind, Pull, Record, Table, Tabular, Value};
