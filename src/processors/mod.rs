pub mod archive_normalizer;
pub mod local_normalizer;

pub use archive_normalizer::ArchiveNormalizer;
pub use local_normalizer::LocalNormalizer;
