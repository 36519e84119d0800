//! Model bundles: everything one training run produced, and its on-disk form.
//!
//! A bundle directory holds four artifacts that share one run id:
//!
//! | File | Content |
//! |---|---|
//! | `classifier.bin` | bincode forest envelope tagged with the run id |
//! | `scaler.json` | feature names, per-feature mean and std |
//! | `label_encoders.json` | per-column ordered class lists |
//! | `model_info.json` | feature names, importance map, creation time |
//!
//! Loading checks that the four agree with each other and refuses the
//! directory otherwise.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use attrition_rf::{RandomForest, RankedFeature};
use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::classifier::{Classifier, TOP_FEATURES};
use crate::encoder::{FeatureEncoder, LabelEncoders, Scaler};
use crate::error::ModelError;
use crate::schema::is_categorical;

pub const CLASSIFIER_FILE: &str = "classifier.bin";
pub const SCALER_FILE: &str = "scaler.json";
pub const LABEL_ENCODERS_FILE: &str = "label_encoders.json";
pub const MODEL_INFO_FILE: &str = "model_info.json";

const ARTIFACTS: [&str; 4] = [
    CLASSIFIER_FILE,
    SCALER_FILE,
    LABEL_ENCODERS_FILE,
    MODEL_INFO_FILE,
];

/// A trained classifier with the encoder and importances it was fitted with.
#[derive(Debug, Clone)]
pub struct ModelBundle {
    run_id: Uuid,
    created_at: DateTime<Utc>,
    classifier: Classifier,
    encoder: FeatureEncoder,
    /// Most important first.
    importances: Vec<RankedFeature>,
    /// Aligned with the encoder's feature order.
    importance_by_feature: Vec<f64>,
}

impl ModelBundle {
    /// Assemble a bundle for a fresh training run with a new run id.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Training`] if the parts disagree on features.
    pub fn new(
        classifier: Classifier,
        encoder: FeatureEncoder,
        importances: Vec<RankedFeature>,
    ) -> Result<Self, ModelError> {
        Self::assemble(Uuid::new_v4(), Utc::now(), classifier, encoder, importances)
            .map_err(ModelError::training)
    }

    fn assemble(
        run_id: Uuid,
        created_at: DateTime<Utc>,
        classifier: Classifier,
        encoder: FeatureEncoder,
        mut importances: Vec<RankedFeature>,
    ) -> Result<Self, String> {
        let names = encoder.feature_names();
        if classifier.forest().feature_names() != names {
            return Err("classifier and encoder disagree on feature names".to_string());
        }
        if encoder.scaler().len() != names.len() {
            return Err(format!(
                "scaler has {} columns for {} features",
                encoder.scaler().len(),
                names.len()
            ));
        }
        if let Some(bad) = encoder
            .scaler()
            .std()
            .iter()
            .position(|s| !s.is_finite() || *s <= 0.0)
        {
            return Err(format!("scaler std for {} is not positive", names[bad]));
        }

        let expected: BTreeSet<&str> = names.iter().map(String::as_str).collect();
        let present: BTreeSet<&str> = importances.iter().map(|f| f.name.as_str()).collect();
        if importances.len() != names.len() || expected != present {
            return Err("importance keys differ from feature names".to_string());
        }
        if let Some(bad) = importances
            .iter()
            .find(|f| !f.importance.is_finite() || f.importance < 0.0)
        {
            return Err(format!("importance of {} is negative", bad.name));
        }

        let tables = encoder.label_encoders().tables();
        if let Some(column) = tables
            .keys()
            .find(|c| !expected.contains(c.as_str()) || !is_categorical(c))
        {
            return Err(format!("code table for non-categorical or unknown column {column}"));
        }
        if let Some(column) = names
            .iter()
            .find(|n| is_categorical(n) && !tables.contains_key(*n))
        {
            return Err(format!("no code table for categorical feature {column}"));
        }

        // Ties keep feature order, so a reloaded bundle ranks identically.
        let position = |name: &str| names.iter().position(|n| n == name);
        importances.sort_by(|a, b| {
            b.importance
                .total_cmp(&a.importance)
                .then_with(|| position(&a.name).cmp(&position(&b.name)))
        });
        for (i, feature) in importances.iter_mut().enumerate() {
            feature.rank = i + 1;
        }
        let importance_by_feature = names
            .iter()
            .map(|name| {
                importances
                    .iter()
                    .find(|f| &f.name == name)
                    .map_or(0.0, |f| f.importance)
            })
            .collect();

        Ok(Self {
            run_id,
            created_at,
            classifier,
            encoder,
            importances,
            importance_by_feature,
        })
    }

    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    #[must_use]
    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        self.encoder.feature_names()
    }

    /// Ranked importances, most important first.
    #[must_use]
    pub fn importances(&self) -> &[RankedFeature] {
        &self.importances
    }

    /// Importance of each feature in encoder order.
    #[must_use]
    pub fn importance_by_feature(&self) -> &[f64] {
        &self.importance_by_feature
    }

    /// Summary of the loaded model for callers.
    #[must_use]
    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            run_id: self.run_id,
            created_at: self.created_at,
            features: self.feature_names().to_vec(),
            feature_count: self.feature_names().len(),
            feature_importance: RankedImportance(self.importances.clone()),
            top_features: self
                .importances
                .iter()
                .take(TOP_FEATURES)
                .map(|f| TopFeature {
                    name: f.name.clone(),
                    importance: f.importance,
                })
                .collect(),
        }
    }

    /// Whether `dir` holds any bundle artifact.
    #[must_use]
    pub fn exists(dir: &Path) -> bool {
        ARTIFACTS.iter().any(|name| dir.join(name).exists())
    }

    /// Write the four artifacts into `dir`, creating it if needed.
    ///
    /// Overwrites in place; use [`ModelBundle::publish`] to replace a bundle
    /// that readers may be loading.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::Persist`] | a directory or JSON artifact cannot be written |
    /// | [`ModelError::Forest`] | the classifier cannot be written |
    #[instrument(skip_all, fields(dir = %dir.display(), run_id = %self.run_id))]
    pub fn save(&self, dir: &Path) -> Result<(), ModelError> {
        fs::create_dir_all(dir).map_err(|source| ModelError::Persist {
            path: dir.to_path_buf(),
            source,
        })?;

        let names = self.feature_names().to_vec();
        self.classifier
            .forest()
            .save_tagged(dir.join(CLASSIFIER_FILE), &self.run_id.to_string())?;
        write_json(
            &dir.join(SCALER_FILE),
            &ScalerArtifact {
                run_id: self.run_id,
                feature_names: names.clone(),
                mean: self.encoder.scaler().mean().to_vec(),
                std: self.encoder.scaler().std().to_vec(),
            },
        )?;
        write_json(
            &dir.join(LABEL_ENCODERS_FILE),
            &LabelEncodersArtifact {
                run_id: self.run_id,
                columns: self.encoder.label_encoders().tables().clone(),
            },
        )?;
        write_json(
            &dir.join(MODEL_INFO_FILE),
            &ModelInfoArtifact {
                run_id: self.run_id,
                created_at: self.created_at,
                feature_names: names,
                feature_importance: self
                    .importances
                    .iter()
                    .map(|f| (f.name.clone(), f.importance))
                    .collect(),
            },
        )?;
        info!("model bundle saved");
        Ok(())
    }

    /// Read and cross-check a bundle written by [`ModelBundle::save`].
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::BundleIncomplete`] if any artifact is missing,
    /// unreadable, or inconsistent with the others.
    #[instrument(skip_all, fields(dir = %dir.display()))]
    pub fn load(dir: &Path) -> Result<Self, ModelError> {
        let incomplete = |reason: String| ModelError::BundleIncomplete {
            dir: dir.to_path_buf(),
            reason,
        };

        if let Some(missing) = ARTIFACTS.iter().find(|name| !dir.join(name).is_file()) {
            return Err(incomplete(format!("missing {missing}")));
        }

        let (forest, tag) = RandomForest::load_tagged(dir.join(CLASSIFIER_FILE))
            .map_err(|e| incomplete(format!("cannot read {CLASSIFIER_FILE}: {e}")))?;
        let scaler: ScalerArtifact = read_json(&dir.join(SCALER_FILE)).map_err(&incomplete)?;
        let labels: LabelEncodersArtifact =
            read_json(&dir.join(LABEL_ENCODERS_FILE)).map_err(&incomplete)?;
        let info: ModelInfoArtifact = read_json(&dir.join(MODEL_INFO_FILE)).map_err(&incomplete)?;

        let run_id = info.run_id;
        if tag != run_id.to_string() || scaler.run_id != run_id || labels.run_id != run_id {
            return Err(incomplete("artifacts come from different training runs".to_string()));
        }
        if scaler.feature_names != info.feature_names {
            return Err(incomplete(format!(
                "{SCALER_FILE} and {MODEL_INFO_FILE} list different features"
            )));
        }
        if scaler.mean.len() != scaler.std.len() {
            return Err(incomplete("scaler mean and std lengths differ".to_string()));
        }

        let label_encoders = LabelEncoders::from_tables(labels.columns)
            .map_err(|column| incomplete(format!("code table for {column} is not sorted")))?;
        let encoder = FeatureEncoder::from_parts(
            info.feature_names,
            label_encoders,
            Scaler::from_parts(scaler.mean, scaler.std),
        );
        let importances = info
            .feature_importance
            .into_iter()
            .map(|(name, importance)| RankedFeature {
                name,
                importance,
                rank: 0,
            })
            .collect();

        let bundle = Self::assemble(
            run_id,
            info.created_at,
            Classifier::from_forest(forest),
            encoder,
            importances,
        )
        .map_err(incomplete)?;
        info!(run_id = %run_id, n_features = bundle.feature_names().len(), "model bundle loaded");
        Ok(bundle)
    }

    /// Replace the bundle in `dir` without exposing a partial write.
    ///
    /// The bundle is saved into a sibling staging directory, the old
    /// directory is moved aside, and the staging directory is renamed into
    /// place. The old bundle is deleted only after the swap.
    ///
    /// # Errors
    ///
    /// [`ModelError::Persist`] if staging or either rename fails. On failure
    /// the previous bundle, if any, is left in `dir`.
    #[instrument(skip_all, fields(dir = %dir.display(), run_id = %self.run_id))]
    pub fn publish(&self, dir: &Path) -> Result<(), ModelError> {
        let persist = |path: &Path| {
            let path = path.to_path_buf();
            move |source| ModelError::Persist { path, source }
        };
        let name = dir
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ModelError::Persist {
                path: dir.to_path_buf(),
                source: std::io::Error::other("model directory has no file name"),
            })?;
        let parent = match dir.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(persist(&parent))?;

        let staging = parent.join(format!(".{name}.staging-{}", self.run_id));
        let previous = parent.join(format!(".{name}.previous-{}", self.run_id));
        if staging.exists() {
            warn!(path = %staging.display(), "removing stale staging directory");
            fs::remove_dir_all(&staging).map_err(persist(&staging))?;
        }
        if let Err(e) = self.save(&staging) {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }

        let had_previous = dir.exists();
        if had_previous {
            fs::rename(dir, &previous).map_err(persist(dir))?;
        }
        if let Err(source) = fs::rename(&staging, dir) {
            if had_previous && let Err(e) = fs::rename(&previous, dir) {
                warn!(error = %e, "could not restore previous bundle");
            }
            let _ = fs::remove_dir_all(&staging);
            return Err(ModelError::Persist {
                path: dir.to_path_buf(),
                source,
            });
        }
        if had_previous && let Err(e) = fs::remove_dir_all(&previous) {
            warn!(path = %previous.display(), error = %e, "could not remove previous bundle");
        }
        debug!("bundle swapped into place");
        info!("model bundle published");
        Ok(())
    }
}

/// Caller-facing model summary.
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub features: Vec<String>,
    pub feature_count: usize,
    /// Serialized as an object keyed by feature name, most important first.
    pub feature_importance: RankedImportance,
    pub top_features: Vec<TopFeature>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopFeature {
    pub name: String,
    pub importance: f64,
}

/// Ranked importances that serialize as an ordered `{name: importance}` map.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedImportance(pub Vec<RankedFeature>);

impl Serialize for RankedImportance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for feature in &self.0 {
            map.serialize_entry(&feature.name, &feature.importance)?;
        }
        map.end()
    }
}

#[derive(Serialize, Deserialize)]
struct ScalerArtifact {
    run_id: Uuid,
    feature_names: Vec<String>,
    mean: Vec<f64>,
    std: Vec<f64>,
}

#[derive(Serialize, Deserialize)]
struct LabelEncodersArtifact {
    run_id: Uuid,
    columns: BTreeMap<String, Vec<String>>,
}

#[derive(Serialize, Deserialize)]
struct ModelInfoArtifact {
    run_id: Uuid,
    created_at: DateTime<Utc>,
    feature_names: Vec<String>,
    feature_importance: BTreeMap<String, f64>,
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ModelError> {
    let persist = |source| ModelError::Persist {
        path: path.to_path_buf(),
        source,
    };
    let bytes = serde_json::to_vec_pretty(value).map_err(|e| persist(e.into()))?;
    fs::write(path, bytes).map_err(persist)
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, String> {
    let file_name = path.file_name().map_or_else(
        || path.display().to_string(),
        |n| n.to_string_lossy().into_owned(),
    );
    let text = fs::read_to_string(path).map_err(|e| format!("cannot read {file_name}: {e}"))?;
    serde_json::from_str(&text).map_err(|e| format!("cannot parse {file_name}: {e}"))
}
