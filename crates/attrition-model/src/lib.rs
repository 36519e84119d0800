//! Attrition risk model: feature encoding, forest training with holdout
//! metrics, persisted bundles, prediction and the live-model session.

mod bundle;
mod classifier;
mod config;
mod encoder;
mod error;
mod predictor;
mod schema;
mod session;
mod training;

pub use bundle::{
    CLASSIFIER_FILE, LABEL_ENCODERS_FILE, MODEL_INFO_FILE, ModelBundle, ModelInfo,
    RankedImportance, SCALER_FILE, TopFeature,
};
pub use classifier::{ClassReport, Classifier, Outcome, TOP_FEATURES, TrainingMetrics};
pub use config::TrainingConfig;
pub use encoder::{FeatureEncoder, LabelEncoders, Scaler};
pub use error::{ErrorKind, ModelError};
pub use predictor::{ContributingFactor, PredictionOutput, PredictionResult, Predictor, TOP_FACTORS};
pub use schema::{feature_columns, is_categorical};
pub use session::{ModelSession, SessionState, SessionStatus};
pub use training::{train_bundle, train_from_csv};
