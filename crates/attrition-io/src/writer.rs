//! JSON report writer for CLI and batch outputs.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::ReportName;

/// Which operation produced a report; becomes the file suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Train,
    Predict,
    Analyze,
    Strategies,
    Info,
    Health,
}

impl ReportKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ReportKind::Train => "train",
            ReportKind::Predict => "predict",
            ReportKind::Analyze => "analyze",
            ReportKind::Strategies => "strategies",
            ReportKind::Info => "info",
            ReportKind::Health => "health",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Writes `{name}_{kind}.json` report files into one output directory.
///
/// The directory is created on construction if it does not exist.
pub struct ReportWriter {
    output_dir: PathBuf,
    name: ReportName,
}

impl ReportWriter {
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), report = %name))]
    pub fn new(output_dir: &Path, name: ReportName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|source| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            name,
        })
    }

    /// Path the report of `kind` is written to.
    #[must_use]
    pub fn path_for(&self, kind: ReportKind) -> PathBuf {
        self.output_dir
            .join(format!("{}_{}.json", self.name.as_str(), kind.as_str()))
    }

    /// Wrap `payload` with the report name, kind and a UTC timestamp and
    /// write it as pretty JSON. Returns the written path.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::EncodeReport`] | `payload` failed to serialize |
    /// | [`IoError::WriteFile`] | the file could not be written |
    #[instrument(skip_all, fields(kind = %kind))]
    pub fn write<T: Serialize>(&self, kind: ReportKind, payload: &T) -> Result<PathBuf, IoError> {
        let path = self.path_for(kind);
        let artifact = ReportArtifact {
            report: self.name.as_str(),
            kind: kind.as_str(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            payload,
        };
        let json = serde_json::to_string_pretty(&artifact).map_err(|source| {
            IoError::EncodeReport {
                path: path.clone(),
                source,
            }
        })?;
        fs::write(&path, json).map_err(|source| IoError::WriteFile {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), "report written");
        Ok(path)
    }
}

#[derive(Serialize)]
struct ReportArtifact<'a, T: Serialize> {
    report: &'a str,
    kind: &'a str,
    generated_at: String,
    payload: &'a T,
}
