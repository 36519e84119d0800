//! Model lifecycle: which bundle is live, and how it gets replaced.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use attrition_io::TrainingData;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::bundle::ModelBundle;
use crate::classifier::TrainingMetrics;
use crate::config::TrainingConfig;
use crate::error::ModelError;
use crate::predictor::Predictor;
use crate::training::{train_bundle, train_from_csv};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Unloaded,
    Loading,
    Ready,
    Retraining,
}

/// Snapshot of a session for health reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub state: SessionState,
    /// Bumped on every bundle install; 0 before the first.
    pub version: u64,
    pub run_id: Option<Uuid>,
    pub model_loaded: bool,
}

struct Inner {
    state: SessionState,
    current: Option<Arc<ModelBundle>>,
    version: u64,
}

/// Owns the live bundle for one model directory.
///
/// Readers take cheap `Arc` snapshots; a retrain keeps serving the old
/// bundle until the new one has been published to disk.
pub struct ModelSession {
    model_dir: PathBuf,
    inner: RwLock<Inner>,
    train_lock: Mutex<()>,
}

impl ModelSession {
    /// An empty session bound to `model_dir`. Nothing is read from disk.
    #[must_use]
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            inner: RwLock::new(Inner {
                state: SessionState::Unloaded,
                current: None,
                version: 0,
            }),
            train_lock: Mutex::new(()),
        }
    }

    /// A session that loads the bundle in `model_dir` if there is one.
    ///
    /// A missing or broken bundle leaves the session unloaded with a warning.
    #[must_use]
    pub fn open(model_dir: impl Into<PathBuf>) -> Self {
        let session = Self::new(model_dir);
        if ModelBundle::exists(&session.model_dir) {
            if let Err(e) = session.load() {
                warn!(error = %e, "could not load existing model bundle");
            }
        } else {
            info!(dir = %session.model_dir.display(), "no model bundle found; starting unloaded");
        }
        session
    }

    #[must_use]
    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    /// Load the bundle from the model directory and make it live.
    ///
    /// # Errors
    ///
    /// [`ModelError::BundleIncomplete`]; the previous state is kept.
    ///
    /// Waits for any retrain in progress to finish first.
    #[instrument(skip_all, fields(dir = %self.model_dir.display()))]
    pub fn load(&self) -> Result<Arc<ModelBundle>, ModelError> {
        let _guard = self.train_lock.lock();
        let previous = self.transition(SessionState::Loading);
        match ModelBundle::load(&self.model_dir) {
            Ok(bundle) => Ok(self.install(bundle)),
            Err(e) => {
                self.inner.write().state = previous;
                Err(e)
            }
        }
    }

    /// Train on a CSV file, publish the result and make it live.
    ///
    /// # Errors
    ///
    /// Any training or persistence error; the previous bundle stays live
    /// and on disk.
    pub fn retrain(
        &self,
        csv_path: &Path,
        config: &TrainingConfig,
    ) -> Result<TrainingMetrics, ModelError> {
        self.retrain_with(|| train_from_csv(csv_path, config))
    }

    /// [`ModelSession::retrain`] on data already in memory.
    ///
    /// # Errors
    ///
    /// As for [`ModelSession::retrain`].
    pub fn retrain_from(
        &self,
        data: &TrainingData,
        config: &TrainingConfig,
    ) -> Result<TrainingMetrics, ModelError> {
        self.retrain_with(|| train_bundle(data, config))
    }

    #[instrument(skip_all, fields(dir = %self.model_dir.display()))]
    fn retrain_with(
        &self,
        train: impl FnOnce() -> Result<(ModelBundle, TrainingMetrics), ModelError>,
    ) -> Result<TrainingMetrics, ModelError> {
        let _guard = self.train_lock.lock();
        let previous = self.transition(SessionState::Retraining);

        let outcome = train().and_then(|(bundle, metrics)| {
            bundle.publish(&self.model_dir)?;
            Ok((bundle, metrics))
        });
        match outcome {
            Ok((bundle, metrics)) => {
                self.install(bundle);
                Ok(metrics)
            }
            Err(e) => {
                warn!(error = %e, "retraining failed; keeping previous model");
                self.inner.write().state = previous;
                Err(e)
            }
        }
    }

    /// Make `bundle` live without touching disk. Returns the shared handle.
    pub fn install(&self, bundle: ModelBundle) -> Arc<ModelBundle> {
        let bundle = Arc::new(bundle);
        let mut inner = self.inner.write();
        inner.version += 1;
        inner.current = Some(Arc::clone(&bundle));
        inner.state = SessionState::Ready;
        info!(version = inner.version, run_id = %bundle.run_id(), "model bundle installed");
        bundle
    }

    /// The live bundle, if any.
    #[must_use]
    pub fn current(&self) -> Option<Arc<ModelBundle>> {
        self.inner.read().current.clone()
    }

    /// A predictor over the live bundle.
    ///
    /// # Errors
    ///
    /// [`ModelError::ModelNotLoaded`] when no bundle is live.
    pub fn predictor(&self) -> Result<Predictor, ModelError> {
        self.current()
            .map(Predictor::new)
            .ok_or(ModelError::ModelNotLoaded)
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        let inner = self.inner.read();
        SessionStatus {
            state: inner.state,
            version: inner.version,
            run_id: inner.current.as_ref().map(|b| b.run_id()),
            model_loaded: inner.current.is_some(),
        }
    }

    fn transition(&self, to: SessionState) -> SessionState {
        let mut inner = self.inner.write();
        std::mem::replace(&mut inner.state, to)
    }
}

#[cfg(test)]
mod tests {
    use attrition_io::EmployeeRecord;
    use tempfile::TempDir;

    use super::*;
    use crate::error::ErrorKind;

    fn data() -> TrainingData {
        let records = (0..40)
            .map(|i| EmployeeRecord {
                job_satisfaction: Some(if i % 4 == 0 { 1.0 } else { 4.0 }),
                age: Some(20.0 + f64::from(i)),
                ..EmployeeRecord::default()
            })
            .collect();
        let labels = (0..40).map(|i| usize::from(i % 4 == 0)).collect();
        TrainingData::new(
            vec!["age".to_string(), "jobSatisfaction".to_string()],
            records,
            labels,
        )
    }

    fn config() -> TrainingConfig {
        TrainingConfig::new().with_n_trees(5)
    }

    #[test]
    fn starts_unloaded() {
        let dir = TempDir::new().unwrap();
        let session = ModelSession::open(dir.path().join("model"));
        let status = session.status();
        assert_eq!(status.state, SessionState::Unloaded);
        assert!(!status.model_loaded);
        assert_eq!(session.predictor().unwrap_err().kind(), ErrorKind::ModelNotLoaded);
    }

    #[test]
    fn retrain_publishes_and_bumps_version() {
        let dir = TempDir::new().unwrap();
        let model_dir = dir.path().join("model");
        let session = ModelSession::new(&model_dir);

        session.retrain_from(&data(), &config()).unwrap();
        let first = session.status();
        assert_eq!(first.state, SessionState::Ready);
        assert_eq!(first.version, 1);
        assert!(ModelBundle::exists(&model_dir));

        session.retrain_from(&data(), &config()).unwrap();
        let second = session.status();
        assert_eq!(second.version, 2);
        assert_ne!(first.run_id, second.run_id);
    }

    #[test]
    fn failed_retrain_keeps_previous_bundle() {
        let dir = TempDir::new().unwrap();
        let session = ModelSession::new(dir.path().join("model"));
        session.retrain_from(&data(), &config()).unwrap();
        let before = session.status();

        let one_class = TrainingData::new(
            vec!["age".to_string()],
            vec![EmployeeRecord { age: Some(30.0), ..EmployeeRecord::default() }; 6],
            vec![0; 6],
        );
        assert!(session.retrain_from(&one_class, &config()).is_err());

        assert_eq!(session.status(), before);
        let on_disk = ModelBundle::load(session.model_dir()).unwrap();
        assert_eq!(Some(on_disk.run_id()), before.run_id);
    }

    #[test]
    fn reopen_loads_published_bundle() {
        let dir = TempDir::new().unwrap();
        let model_dir = dir.path().join("model");
        let trained = ModelSession::new(&model_dir);
        trained.retrain_from(&data(), &config()).unwrap();

        let reopened = ModelSession::open(&model_dir);
        assert_eq!(reopened.status().state, SessionState::Ready);
        assert_eq!(reopened.status().run_id, trained.status().run_id);
    }

    #[test]
    fn load_waits_for_retrain_to_finish() {
        let dir = TempDir::new().unwrap();
        let session = ModelSession::new(dir.path().join("model"));
        session.retrain_from(&data(), &config()).unwrap();

        let guard = session.train_lock.lock();
        std::thread::scope(|scope| {
            let loader = scope.spawn(|| session.load());
            std::thread::sleep(std::time::Duration::from_millis(50));
            assert_eq!(session.status().state, SessionState::Ready);
            assert_eq!(session.status().version, 1);
            drop(guard);
            loader.join().unwrap().unwrap();
        });
        assert_eq!(session.status().state, SessionState::Ready);
        assert_eq!(session.status().version, 2);
    }

    #[test]
    fn failed_load_restores_state() {
        let dir = TempDir::new().unwrap();
        let session = ModelSession::new(dir.path());
        assert_eq!(session.load().unwrap_err().kind(), ErrorKind::BundleIncomplete);
        assert_eq!(session.status().state, SessionState::Unloaded);
    }
}
