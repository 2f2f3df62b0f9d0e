//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the application and external systems (dataset files, artifact
//! directories).

mod artifact_store;
mod dataset_store;

pub use artifact_store::ArtifactStore;
pub use dataset_store::DatasetStore;
