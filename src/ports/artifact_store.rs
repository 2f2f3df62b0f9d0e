//! Artifact port: Trait for persisting a trained artifact set.

use crate::ml::TrainedArtifacts;

/// Trait for storing classifier, vectorizer and label codec together.
///
/// Implementations must never expose a partially written or mixed set:
/// `load` returns all three parts from the same `save`, or an error.
pub trait ArtifactStore: Send + Sync {
    /// Error type for storage operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Persist the full artifact set.
    ///
    /// # Errors
    /// Returns error if any part cannot be written.
    fn save(&self, artifacts: &TrainedArtifacts) -> Result<(), Self::Error>;

    /// Load the full artifact set.
    ///
    /// # Errors
    /// Returns a not-found error if no complete set exists, or an integrity
    /// error if the stored parts do not belong together.
    fn load(&self) -> Result<TrainedArtifacts, Self::Error>;

    /// Check whether a complete set appears to be stored.
    fn exists(&self) -> bool;
}
