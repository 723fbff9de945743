use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use parquet::file::reader::{FileReader, SerializedFileReader};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{ProcessingError, Result};
use crate::storage::codec::ParquetRow;
use crate::utils::constants::{DEFAULT_ROW_GROUP_SIZE, STORE_EXTENSION};

/// One Parquet file per store key under a data directory.
#[derive(Debug, Clone)]
pub struct ParquetStore {
    root: PathBuf,
    compression: Compression,
    row_group_size: usize,
}

impl ParquetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            compression: Compression::ZSTD(ZstdLevel::default()),
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            "snappy" => Compression::SNAPPY,
            "gzip" => Compression::GZIP(GzipLevel::default()),
            "lz4" => Compression::LZ4,
            "zstd" => Compression::ZSTD(ZstdLevel::default()),
            "none" => Compression::UNCOMPRESSED,
            _ => {
                return Err(ProcessingError::Config(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.{}", key, STORE_EXTENSION))
    }

    pub fn exists(&self, key: &str) -> bool {
        self.path_for(key).is_file()
    }

    /// Read the stored rows for `key`.
    ///
    /// `Ok(None)` when nothing usable was ever written (no file, or a zero-length
    /// file). A file that exists but cannot be decoded is `StorageCorrupt`.
    pub fn load<T: ParquetRow>(&self, key: &str) -> Result<Option<Vec<T>>> {
        let path = self.path_for(key);

        let size = match fs::metadata(&path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no stored data yet");
                return Ok(None);
            }
            Err(e) => return Err(corrupt(&path, e)),
        };
        if size == 0 {
            info!(path = %path.display(), "stored data file is empty");
            return Ok(None);
        }

        let rows = Self::read_rows::<T>(&path).map_err(|e| corrupt(&path, e))?;
        debug!(path = %path.display(), rows = rows.len(), "loaded stored rows");
        Ok(Some(rows))
    }

    fn read_rows<T: ParquetRow>(path: &Path) -> Result<Vec<T>> {
        let file = File::open(path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

        let mut rows = Vec::new();
        for batch in reader {
            rows.extend(T::from_batch(&batch?)?);
        }
        Ok(rows)
    }

    /// Replace the stored rows for `key`.
    ///
    /// The file is written next to its destination and renamed over it, so a
    /// reader sees either the old content or the new content, never a mix.
    pub fn store<T: ParquetRow>(&self, key: &str, rows: &[T]) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        let path = self.path_for(key);

        let mut tmp = NamedTempFile::new_in(&self.root)?;
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut writer = ArrowWriter::try_new(tmp.as_file_mut(), T::arrow_schema(), Some(props))?;
        for chunk in rows.chunks(self.row_group_size) {
            writer.write(&T::to_batch(chunk)?)?;
        }
        writer.close()?;

        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| ProcessingError::Io(e.error))?;

        debug!(path = %path.display(), rows = rows.len(), "persisted rows");
        Ok(())
    }

    pub fn file_info(&self, key: &str) -> Result<ParquetFileInfo> {
        let path = self.path_for(key);
        let file = File::open(&path)?;
        let reader = SerializedFileReader::new(file)?;
        let metadata = reader.metadata();

        let row_groups = metadata.num_row_groups();
        let row_group_sizes = (0..row_groups)
            .map(|i| metadata.row_group(i).num_rows())
            .collect();

        Ok(ParquetFileInfo {
            path: path.clone(),
            total_rows: metadata.file_metadata().num_rows(),
            row_groups,
            row_group_sizes,
            file_size: fs::metadata(&path)?.len(),
            compression: self.compression,
        })
    }
}

fn corrupt(path: &Path, err: impl std::fmt::Display) -> ProcessingError {
    ProcessingError::StorageCorrupt {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct ParquetFileInfo {
    pub path: PathBuf,
    pub total_rows: i64,
    pub row_groups: usize,
    pub row_group_sizes: Vec<i64>,
    pub file_size: u64,
    pub compression: Compression,
}

impl ParquetFileInfo {
    pub fn summary(&self) -> String {
        format!(
            "Parquet File Summary ({}):\n\
            - Total rows: {}\n\
            - Row groups: {}\n\
            - File size: {:.2} MB\n\
            - Compression: {:?}",
            self.path.display(),
            self.total_rows,
            self.row_groups,
            self.file_size as f64 / 1_048_576.0,
            self.compression,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArchiveRecord;
    use tempfile::TempDir;

    fn record(city: &str, year: f64) -> ArchiveRecord {
        ArchiveRecord::new("Switzerland".to_string(), city.to_string(), year).unwrap()
    }

    #[test]
    fn test_absent_and_empty_files_load_as_none() -> Result<()> {
        let dir = TempDir::new()?;
        let store = ParquetStore::new(dir.path());

        assert!(store.load::<ArchiveRecord>("air_quality_data")?.is_none());

        File::create(store.path_for("air_quality_data"))?;
        assert!(store.load::<ArchiveRecord>("air_quality_data")?.is_none());
        Ok(())
    }

    #[test]
    fn test_garbage_file_is_storage_corrupt() -> Result<()> {
        let dir = TempDir::new()?;
        let store = ParquetStore::new(dir.path());
        fs::write(store.path_for("air_quality_data"), b"not parquet at all")?;

        let err = store.load::<ArchiveRecord>("air_quality_data").unwrap_err();
        assert!(matches!(err, ProcessingError::StorageCorrupt { .. }));
        Ok(())
    }

    #[test]
    fn test_store_replaces_previous_content() -> Result<()> {
        let dir = TempDir::new()?;
        let store = ParquetStore::new(dir.path().join("nested"));

        store.store("air_quality_data", &[record("Bern", 2015.0), record("Basel", 2016.0)])?;
        store.store("air_quality_data", &[record("Genève", 2017.0)])?;

        let rows = store.load::<ArchiveRecord>("air_quality_data")?.unwrap();
        assert_eq!(rows, vec![record("Genève", 2017.0)]);

        // only the final file remains, no stray temporaries
        let entries = fs::read_dir(store.root())?.count();
        assert_eq!(entries, 1);
        Ok(())
    }

    #[test]
    fn test_different_compressions() -> Result<()> {
        for compression in ["snappy", "gzip", "lz4", "zstd", "none"] {
            let dir = TempDir::new()?;
            let store = ParquetStore::new(dir.path()).with_compression(compression)?;
            store.store("air_quality_data", &[record("Bern", 2015.0)])?;

            let info = store.file_info("air_quality_data")?;
            assert_eq!(info.total_rows, 1);
            assert!(info.file_size > 0);
        }

        assert!(ParquetStore::new("data").with_compression("brotli-9").is_err());
        Ok(())
    }

    #[test]
    fn test_row_groups_follow_configured_size() -> Result<()> {
        let dir = TempDir::new()?;
        let store = ParquetStore::new(dir.path()).with_row_group_size(2);
        let rows: Vec<_> = (0..5).map(|i| record("Bern", 2010.0 + i as f64)).collect();
        store.store("air_quality_data", &rows)?;

        let info = store.file_info("air_quality_data")?;
        assert_eq!(info.row_groups, 3);
        assert_eq!(info.row_group_sizes, vec![2, 2, 1]);
        Ok(())
    }
}
