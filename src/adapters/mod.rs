//! Adapters layer: Concrete implementations of ports.
//!
//! - `csv_dataset`: flat CSV dataset file with a strict curve parser
//! - `fs_artifacts`: bincode artifact blobs bound by a hashed manifest
//! - `sanitize`: PII filtering for logs

pub mod csv_dataset;
mod error;
pub mod fs_artifacts;
pub mod sanitize;

pub use csv_dataset::CsvDatasetStore;
pub use error::StorageError;
pub use fs_artifacts::FsArtifactStore;
