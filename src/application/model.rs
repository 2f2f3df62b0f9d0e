//! Trained-artifact slot and its lifecycle.
//!
//! `Untrained -> Trained -> Persisted`, or `Untrained -> Loaded`. Prediction
//! is allowed in every state except `Untrained`.

use std::path::Path;

use super::prediction::predict;
use super::training::{train_with_config, TrainingConfig};
use crate::adapters::{FsArtifactStore, StorageError};
use crate::domain::{CaseInput, PatientRecord, PredictionResult};
use crate::ml::{TrainedArtifacts, TrainingReport};
use crate::ports::ArtifactStore;
use crate::UroflowError;

/// Load a persisted artifact set from `dir`.
///
/// # Errors
/// Returns `NotFound` if the set is missing or incomplete, `Storage` if it
/// fails its integrity checks.
pub fn load_artifacts(dir: impl AsRef<Path>) -> Result<TrainedArtifacts, UroflowError> {
    Ok(FsArtifactStore::new(dir.as_ref()).load()?)
}

/// Persist an artifact set to `dir`.
///
/// # Errors
/// Returns error if any part cannot be written.
pub fn save_artifacts(artifacts: &TrainedArtifacts, dir: impl AsRef<Path>) -> Result<(), UroflowError> {
    FsArtifactStore::new(dir.as_ref()).save(artifacts)?;
    Ok(())
}

/// Lifecycle state of a [`ModelSlot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    /// Nothing trained or loaded
    Untrained,
    /// Trained in memory, not yet persisted
    Trained,
    /// Trained and written to the store
    Persisted,
    /// Read back from the store
    Loaded,
}

impl ModelState {
    /// Whether prediction is allowed.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        !matches!(self, Self::Untrained)
    }
}

/// Holder of the current artifact set.
///
/// Single writer: training and loading take `&mut self`; prediction only
/// reads.
pub struct ModelSlot<S>
where
    S: ArtifactStore,
{
    store: S,
    artifacts: Option<TrainedArtifacts>,
    state: ModelState,
}

fn storage_error<E: Into<StorageError>>(err: E) -> UroflowError {
    let err: StorageError = err.into();
    UroflowError::from(err)
}

impl<S> ModelSlot<S>
where
    S: ArtifactStore,
    S::Error: Into<StorageError>,
{
    /// Create an empty slot backed by `store`.
    pub fn new(store: S) -> Self {
        Self {
            store,
            artifacts: None,
            state: ModelState::Untrained,
        }
    }

    #[must_use]
    pub fn state(&self) -> ModelState {
        self.state
    }

    /// Current artifacts.
    ///
    /// # Errors
    /// Returns `ModelNotLoaded` before any train or load.
    pub fn artifacts(&self) -> Result<&TrainedArtifacts, UroflowError> {
        self.artifacts.as_ref().ok_or_else(|| {
            UroflowError::ModelNotLoaded("train or load a model before predicting".to_string())
        })
    }

    /// Train in memory, replacing any current artifacts.
    ///
    /// # Errors
    /// Propagates training errors; the slot is unchanged on failure.
    pub fn train(
        &mut self,
        records: &[PatientRecord],
        config: &TrainingConfig,
    ) -> Result<TrainingReport, UroflowError> {
        let outcome = train_with_config(records, config)?;
        self.artifacts = Some(outcome.artifacts);
        self.state = ModelState::Trained;
        Ok(outcome.report)
    }

    /// Write the current artifacts to the store.
    ///
    /// # Errors
    /// Returns `ModelNotLoaded` if the slot is empty, or a storage error.
    pub fn persist(&mut self) -> Result<(), UroflowError> {
        let artifacts = self.artifacts()?;
        self.store.save(artifacts).map_err(storage_error)?;
        if self.state == ModelState::Trained {
            self.state = ModelState::Persisted;
        }
        Ok(())
    }

    /// Replace the current artifacts with the stored set.
    ///
    /// # Errors
    /// Returns `NotFound` if nothing is stored; the slot is unchanged on failure.
    pub fn load(&mut self) -> Result<(), UroflowError> {
        let artifacts = self.store.load().map_err(storage_error)?;
        self.artifacts = Some(artifacts);
        self.state = ModelState::Loaded;
        Ok(())
    }

    /// Load the stored set, or train from `records` and persist when there is
    /// no usable stored set.
    ///
    /// `records` is only called when training is needed. Returns the training
    /// report when a new model was trained.
    ///
    /// # Errors
    /// Returns error if loading fails and training or persisting also fails.
    pub fn load_or_train<F>(
        &mut self,
        records: F,
        config: &TrainingConfig,
    ) -> Result<Option<TrainingReport>, UroflowError>
    where
        F: FnOnce() -> Result<Vec<PatientRecord>, UroflowError>,
    {
        match self.load() {
            Ok(()) => return Ok(None),
            Err(UroflowError::NotFound(what)) => {
                tracing::info!("No stored model ({what}), training a new one");
            }
            Err(e) => {
                tracing::warn!("Stored model rejected ({e}), training a new one");
            }
        }

        let records = records()?;
        let report = self.train(&records, config)?;
        self.persist()?;
        Ok(Some(report))
    }

    /// Classify one case with the current artifacts.
    ///
    /// # Errors
    /// Returns `ModelNotLoaded` before any train or load, otherwise see
    /// [`predict`].
    pub fn predict(&self, case: &CaseInput) -> Result<PredictionResult, UroflowError> {
        predict(self.artifacts()?, case)
    }
}
