//! Dataset port: Trait for persisting the patient dataset.

use crate::domain::PatientRecord;

/// Trait for flat tabular dataset storage.
///
/// A store holds exactly one dataset; saving replaces it.
pub trait DatasetStore: Send + Sync {
    /// Error type for storage operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Replace the stored dataset with `records`, preserving their order.
    ///
    /// # Errors
    /// Returns error if the dataset cannot be written.
    fn save(&self, records: &[PatientRecord]) -> Result<(), Self::Error>;

    /// Load every record in stored order.
    ///
    /// # Errors
    /// Returns error if the dataset is missing, lacks required columns, or
    /// contains a malformed row.
    fn load(&self) -> Result<Vec<PatientRecord>, Self::Error>;

    /// Check whether a dataset has been stored.
    fn exists(&self) -> bool;
}
