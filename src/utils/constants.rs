/// Upstream sources
pub const LOCAL_DEFAULT_URL: &str = "https://www.bafu.admin.ch/bafu/en/home/topics/air/state/data/air-pollution--real-time-data/table-of-the-current-situation-nabel.html";
pub const ARCHIVE_DEFAULT_URL: &str = "https://cdn.who.int/media/docs/default-source/air-pollution-documents/air-quality-and-health/who_ambient_air_quality_database_version_2024_(v6.1).xlsx";
pub const ARCHIVE_DEFAULT_SHEET: &str = "Update 2024 (V6.1)";
pub const LOCAL_DEFAULT_SOURCE_NAME: &str = "Switzerland";
pub const ARCHIVE_SOURCE_NAME: &str = "WHO";

/// Network behaviour
pub const LOCAL_TIMEOUT_SECS: u64 = 5;
pub const ARCHIVE_TIMEOUT_SECS: u64 = 15;
pub const ARCHIVE_MAX_ATTEMPTS: u32 = 3;
pub const ARCHIVE_RETRY_DELAY_MS: u64 = 1000;
pub const MAX_REDIRECTS: usize = 10;
pub const USER_AGENT: &str = concat!("air-quality-processor/", env!("CARGO_PKG_VERSION"));

/// Local page contract
pub const CAPTION_PREFIX: &str = "Date from:";
pub const STANDARD_REFERENCE_LABEL: &str = "Ambient air quality standard [µg/m³]";

/// Store layout
pub const DEFAULT_DATA_DIR: &str = "data";
pub const LOCAL_STORE_PREFIX: &str = "local_air_quality_data_";
pub const ARCHIVE_STORE_KEY: &str = "air_quality_data";
pub const STORE_EXTENSION: &str = "parquet";
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;

/// Query defaults
pub const FILTER_SEPARATOR: &str = " && ";
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Display formats
pub const TIMESTAMP_DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";
pub const TIMESTAMP_ISO_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_ISO_FORMAT: &str = "%Y-%m-%d";

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
