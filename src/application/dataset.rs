//! Dataset service: persistence, lookup and self-healing reload.

use std::path::Path;

use super::synthesis::{synthesize_dataset_seeded, synthesize_dataset_with_rng};
use crate::adapters::{CsvDatasetStore, StorageError};
use crate::domain::PatientRecord;
use crate::ports::DatasetStore;
use crate::UroflowError;

/// Write `records` to a CSV dataset file at `path`.
///
/// # Errors
/// Returns error if the file cannot be written.
pub fn save_dataset(records: &[PatientRecord], path: impl AsRef<Path>) -> Result<(), UroflowError> {
    CsvDatasetStore::new(path.as_ref()).save(records)?;
    Ok(())
}

/// Read a CSV dataset file.
///
/// # Errors
/// Returns `NotFound` if the file is missing and `DataFormat` if a column is
/// missing or a row (including its curve field) is malformed.
pub fn load_dataset(path: impl AsRef<Path>) -> Result<Vec<PatientRecord>, UroflowError> {
    Ok(CsvDatasetStore::new(path.as_ref()).load()?)
}

/// Look up a record by patient id.
///
/// # Errors
/// Returns `NotFound` if no record has that id.
pub fn find_patient<'a>(
    records: &'a [PatientRecord],
    patient_id: &str,
) -> Result<&'a PatientRecord, UroflowError> {
    let wanted = patient_id.trim();
    records
        .iter()
        .find(|r| r.id == wanted)
        .ok_or_else(|| UroflowError::NotFound(format!("patient {wanted}")))
}

fn storage_error<E: Into<StorageError>>(err: E) -> UroflowError {
    let err: StorageError = err.into();
    UroflowError::from(err)
}

/// Service owning the dataset store.
pub struct DatasetService<S>
where
    S: DatasetStore,
{
    store: S,
}

impl<S> DatasetService<S>
where
    S: DatasetStore,
    S::Error: Into<StorageError>,
{
    /// Create a new dataset service.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load the stored dataset.
    ///
    /// # Errors
    /// See [`load_dataset`].
    pub fn load(&self) -> Result<Vec<PatientRecord>, UroflowError> {
        self.store.load().map_err(storage_error)
    }

    /// Replace the stored dataset.
    ///
    /// # Errors
    /// Returns error if the store cannot be written.
    pub fn save(&self, records: &[PatientRecord]) -> Result<(), UroflowError> {
        self.store.save(records).map_err(storage_error)
    }

    /// Synthesize a fresh dataset from `seed` and store it.
    ///
    /// # Errors
    /// Returns error if synthesis or saving fails.
    pub fn regenerate(&self, num_samples: usize, seed: u64) -> Result<Vec<PatientRecord>, UroflowError> {
        let records = synthesize_dataset_seeded(num_samples, seed)?;
        self.save(&records)?;
        Ok(records)
    }

    /// Load the dataset, regenerating and saving a new one if loading fails.
    ///
    /// A missing, truncated or corrupted dataset is not fatal: it is replaced.
    ///
    /// # Errors
    /// Returns error only if regeneration itself fails.
    pub fn load_or_regenerate(
        &self,
        num_samples: usize,
        seed: u64,
    ) -> Result<Vec<PatientRecord>, UroflowError> {
        match self.load() {
            Ok(records) if !records.is_empty() => {
                tracing::info!("Loaded dataset with {} records", records.len());
                Ok(records)
            }
            Ok(_) => {
                tracing::warn!("Stored dataset is empty, regenerating");
                self.regenerate(num_samples, seed)
            }
            Err(e) => {
                tracing::warn!("Dataset could not be loaded ({e}), regenerating");
                self.regenerate(num_samples, seed)
            }
        }
    }

    /// Like [`load_or_regenerate`](Self::load_or_regenerate) with a caller-supplied
    /// random source for the regenerated records.
    ///
    /// # Errors
    /// Returns error only if regeneration itself fails.
    pub fn load_or_regenerate_with_rng<R: rand::Rng + ?Sized>(
        &self,
        rng: &mut R,
        num_samples: usize,
    ) -> Result<Vec<PatientRecord>, UroflowError> {
        match self.load() {
            Ok(records) if !records.is_empty() => Ok(records),
            outcome => {
                if let Err(e) = outcome {
                    tracing::warn!("Dataset could not be loaded ({e}), regenerating");
                }
                let records = synthesize_dataset_with_rng(rng, num_samples)?;
                self.save(&records)?;
                Ok(records)
            }
        }
    }

    /// Find a patient in the stored dataset.
    ///
    /// # Errors
    /// Returns `NotFound` for an unknown id, or any load error.
    pub fn find(&self, patient_id: &str) -> Result<PatientRecord, UroflowError> {
        let records = self.load()?;
        find_patient(&records, patient_id).cloned()
    }
}
