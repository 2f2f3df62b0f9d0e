//! Filesystem adapter: Implementation of ArtifactStore.
//!
//! Layout of an artifact directory:
//! - `classifier.bin`, `vectorizer.bin`, `label_codec.bin`: bincode blobs
//! - `manifest.json`: format version, creation time, feature width, class
//!   order and the SHA-256 of every blob
//!
//! The manifest is removed before a save starts and written last, so an
//! interrupted save leaves a directory that loads as "not found" rather than
//! a mix of old and new parts. Loading verifies every hash before decoding.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::StorageError;
use crate::ml::{LabelCodec, RandomForest, TfIdfVectorizer, TrainedArtifacts};
use crate::ports::ArtifactStore;

pub const CLASSIFIER_FILE: &str = "classifier.bin";
pub const VECTORIZER_FILE: &str = "vectorizer.bin";
pub const LABEL_CODEC_FILE: &str = "label_codec.bin";
pub const MANIFEST_FILE: &str = "manifest.json";

const MANIFEST_VERSION: u32 = 1;
const BLOB_FILES: [&str; 3] = [CLASSIFIER_FILE, VECTORIZER_FILE, LABEL_CODEC_FILE];

/// Metadata binding the three blobs of one training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    /// Classifier input width
    pub feature_width: usize,
    /// Label order of the codec
    pub classes: Vec<String>,
    /// File name -> lowercase hex SHA-256
    pub files: BTreeMap<String, String>,
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn constant_time_eq_str(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes().iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Write `bytes` to `path` through a temporary sibling and a rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Artifact storage in a local directory.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    dir: PathBuf,
}

impl FsArtifactStore {
    /// Create a store rooted at `dir` (created on first save).
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read and check the manifest without decoding any blob.
    ///
    /// # Errors
    /// Returns `NotFound` if there is no manifest, `Manifest` if it cannot be
    /// parsed and `Integrity` for an unsupported version or missing entries.
    pub fn manifest(&self) -> Result<ArtifactManifest, StorageError> {
        let path = self.dir.join(MANIFEST_FILE);
        if !path.is_file() {
            return Err(StorageError::NotFound(format!(
                "artifact manifest {}",
                path.display()
            )));
        }

        let manifest: ArtifactManifest = serde_json::from_slice(&fs::read(&path)?)?;
        if manifest.version != MANIFEST_VERSION {
            return Err(StorageError::Integrity(format!(
                "unsupported manifest version {}",
                manifest.version
            )));
        }
        for file in BLOB_FILES {
            if !manifest.files.contains_key(file) {
                return Err(StorageError::Integrity(format!(
                    "manifest does not bind {file}"
                )));
            }
        }
        Ok(manifest)
    }

    fn read_verified(&self, manifest: &ArtifactManifest, file: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.dir.join(file);
        if !path.is_file() {
            return Err(StorageError::NotFound(format!("artifact {}", path.display())));
        }
        let bytes = fs::read(&path)?;
        let expected = manifest.files.get(file).map_or("", String::as_str);
        if !constant_time_eq_str(&sha256_hex(&bytes), expected) {
            return Err(StorageError::Integrity(format!("hash mismatch for {file}")));
        }
        Ok(bytes)
    }
}

impl ArtifactStore for FsArtifactStore {
    type Error = StorageError;

    fn save(&self, artifacts: &TrainedArtifacts) -> Result<(), Self::Error> {
        fs::create_dir_all(&self.dir)?;

        let manifest_path = self.dir.join(MANIFEST_FILE);
        if manifest_path.exists() {
            fs::remove_file(&manifest_path)?;
        }

        let blobs = [
            (CLASSIFIER_FILE, bincode::serialize(&artifacts.classifier)?),
            (VECTORIZER_FILE, bincode::serialize(&artifacts.vectorizer)?),
            (LABEL_CODEC_FILE, bincode::serialize(&artifacts.codec)?),
        ];

        let mut files = BTreeMap::new();
        for (name, bytes) in &blobs {
            write_atomic(&self.dir.join(name), bytes)?;
            files.insert((*name).to_string(), sha256_hex(bytes));
        }

        let manifest = ArtifactManifest {
            version: MANIFEST_VERSION,
            created_at: Utc::now(),
            feature_width: artifacts.schema().width(),
            classes: artifacts.codec.classes().to_vec(),
            files,
        };
        write_atomic(&manifest_path, &serde_json::to_vec_pretty(&manifest)?)?;

        tracing::info!(
            "Persisted artifact set ({} features, {} classes)",
            manifest.feature_width,
            manifest.classes.len()
        );
        Ok(())
    }

    fn load(&self) -> Result<TrainedArtifacts, Self::Error> {
        let manifest = self.manifest()?;

        let classifier: RandomForest =
            bincode::deserialize(&self.read_verified(&manifest, CLASSIFIER_FILE)?)?;
        let vectorizer: TfIdfVectorizer =
            bincode::deserialize(&self.read_verified(&manifest, VECTORIZER_FILE)?)?;
        let codec: LabelCodec =
            bincode::deserialize(&self.read_verified(&manifest, LABEL_CODEC_FILE)?)?;

        let artifacts = TrainedArtifacts::new(classifier, vectorizer, codec)
            .map_err(|e| StorageError::Integrity(e.to_string()))?;

        if artifacts.schema().width() != manifest.feature_width
            || artifacts.codec.classes() != manifest.classes.as_slice()
        {
            return Err(StorageError::Integrity(
                "artifact contents disagree with manifest".to_string(),
            ));
        }

        tracing::info!(
            "Loaded artifact set created at {}",
            manifest.created_at.to_rfc3339()
        );
        Ok(artifacts)
    }

    fn exists(&self) -> bool {
        self.dir.join(MANIFEST_FILE).is_file()
            && BLOB_FILES.iter().all(|f| self.dir.join(f).is_file())
    }
}
