//! Error taxonomy for encoding, training, persistence and prediction.

use std::fmt;
use std::path::PathBuf;

use attrition_io::IoError;
use attrition_rf::RfError;

/// Errors surfaced by the model layer.
///
/// Every variant maps onto one caller-facing [`ErrorKind`].
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Returned when a request is malformed (empty batch, non-finite number, wrong value type).
    #[error("invalid input: {message}")]
    Validation { message: String },

    /// Returned when a prediction is requested before any bundle is loaded.
    #[error("no model is loaded; train or load a model first")]
    ModelNotLoaded,

    /// Returned when a categorical value was never seen during training.
    #[error("unseen value \"{value}\" for categorical column {column}")]
    UnseenCategory { column: String, value: String },

    /// Returned when a record lacks a column the model was trained on.
    #[error("record is missing feature column {column}")]
    MissingFeature { column: String },

    /// Returned when the training CSV does not exist.
    #[error("data file not found: {path}")]
    DataFileNotFound { path: PathBuf },

    /// Returned when the training CSV exists but cannot be used.
    #[error("unusable training data")]
    TrainingData {
        #[source]
        source: IoError,
    },

    /// Returned when training cannot proceed on the given data or settings.
    #[error("training failed: {message}")]
    Training { message: String },

    /// Returned when the forest rejects its input.
    #[error("random forest error")]
    Forest {
        #[from]
        source: RfError,
    },

    /// Returned when a bundle artifact cannot be written.
    #[error("cannot write model artifact {path}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Returned when a persisted bundle is missing, unreadable or inconsistent.
    #[error("model bundle in {dir} is incomplete: {reason}")]
    BundleIncomplete { dir: PathBuf, reason: String },
}

impl ModelError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        ModelError::Validation {
            message: message.into(),
        }
    }

    pub(crate) fn training(message: impl Into<String>) -> Self {
        ModelError::Training {
            message: message.into(),
        }
    }

    /// The caller-facing category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ModelError::Validation { .. } => ErrorKind::Validation,
            ModelError::ModelNotLoaded => ErrorKind::ModelNotLoaded,
            ModelError::UnseenCategory { .. } => ErrorKind::UnseenCategory,
            ModelError::MissingFeature { .. } => ErrorKind::MissingFeature,
            ModelError::DataFileNotFound { .. } => ErrorKind::DataFileNotFound,
            ModelError::TrainingData { .. }
            | ModelError::Training { .. }
            | ModelError::Forest { .. }
            | ModelError::Persist { .. } => ErrorKind::Training,
            ModelError::BundleIncomplete { .. } => ErrorKind::BundleIncomplete,
        }
    }
}

impl From<IoError> for ModelError {
    fn from(source: IoError) -> Self {
        match source {
            IoError::FileNotFound { path, .. } => ModelError::DataFileNotFound { path },
            source => ModelError::TrainingData { source },
        }
    }
}

/// Stable error categories exposed in response envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    #[serde(rename = "ValidationError")]
    Validation,
    #[serde(rename = "ModelNotLoadedError")]
    ModelNotLoaded,
    #[serde(rename = "UnseenCategoryError")]
    UnseenCategory,
    #[serde(rename = "MissingFeatureError")]
    MissingFeature,
    #[serde(rename = "DataFileNotFoundError")]
    DataFileNotFound,
    #[serde(rename = "TrainingError")]
    Training,
    #[serde(rename = "BundleIncompleteError")]
    BundleIncomplete,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "ValidationError",
            ErrorKind::ModelNotLoaded => "ModelNotLoadedError",
            ErrorKind::UnseenCategory => "UnseenCategoryError",
            ErrorKind::MissingFeature => "MissingFeatureError",
            ErrorKind::DataFileNotFound => "DataFileNotFoundError",
            ErrorKind::Training => "TrainingError",
            ErrorKind::BundleIncomplete => "BundleIncompleteError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
