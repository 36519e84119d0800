//! Binary persistence of a fitted forest.

use std::path::Path;

use tracing::{debug, info, instrument};

use crate::error::RfError;
use crate::forest::RandomForest;

/// Bumped whenever the node layout or envelope changes.
pub const FORMAT_VERSION: u32 = 1;

#[derive(serde::Serialize)]
struct EnvelopeRef<'a> {
    format_version: u32,
    /// Opaque caller tag, e.g. the id of the run that produced the forest.
    tag: &'a str,
    forest: &'a RandomForest,
}

#[derive(serde::Deserialize)]
struct Envelope {
    format_version: u32,
    tag: String,
    forest: RandomForest,
}

impl RandomForest {
    /// Encode the forest and `tag` in a versioned bincode envelope.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::SerializeModel`] if encoding fails.
    pub fn to_bytes(&self, tag: &str) -> Result<Vec<u8>, RfError> {
        let envelope = EnvelopeRef {
            format_version: FORMAT_VERSION,
            tag,
            forest: self,
        };
        bincode::serialize(&envelope).map_err(|source| RfError::SerializeModel { source })
    }

    /// Write the forest to `path` with an empty tag.
    ///
    /// # Errors
    ///
    /// See [`RandomForest::save_tagged`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RfError> {
        self.save_tagged(path, "")
    }

    /// Write the forest and `tag` to `path`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::SerializeModel`] | encoding failed |
    /// | [`RfError::WriteModel`] | the file could not be written |
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn save_tagged(&self, path: impl AsRef<Path>, tag: &str) -> Result<(), RfError> {
        let path = path.as_ref();
        let bytes = self.to_bytes(tag)?;
        std::fs::write(path, &bytes).map_err(|source| RfError::WriteModel {
            path: path.to_path_buf(),
            source,
        })?;
        info!(size_bytes = bytes.len(), n_trees = self.trees.len(), "forest saved");
        Ok(())
    }

    /// Read a forest written by [`RandomForest::save`], discarding the tag.
    ///
    /// # Errors
    ///
    /// See [`RandomForest::load_tagged`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RfError> {
        Self::load_tagged(path).map(|(forest, _)| forest)
    }

    /// Read a forest and its tag.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::ReadModel`] | the file could not be read |
    /// | [`RfError::DeserializeModel`] | the bytes are not a forest envelope |
    /// | [`RfError::IncompatibleModelVersion`] | written by another format version |
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load_tagged(path: impl AsRef<Path>) -> Result<(Self, String), RfError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| RfError::ReadModel {
            path: path.to_path_buf(),
            source,
        })?;
        let envelope: Envelope =
            bincode::deserialize(&bytes).map_err(|source| RfError::DeserializeModel {
                path: path.to_path_buf(),
                source,
            })?;
        if envelope.format_version != FORMAT_VERSION {
            return Err(RfError::IncompatibleModelVersion {
                expected: FORMAT_VERSION,
                found: envelope.format_version,
                path: path.to_path_buf(),
            });
        }
        let forest = envelope.forest;
        debug!(
            n_trees = forest.trees.len(),
            n_features = forest.n_features,
            tag = %envelope.tag,
            "forest loaded"
        );
        Ok((forest, envelope.tag))
    }
}
