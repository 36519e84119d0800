//! End-to-end training: records in, bundle and holdout metrics out.

use std::path::Path;

use attrition_io::{TrainingData, TrainingDataReader};
use tracing::{info, instrument};

use crate::bundle::ModelBundle;
use crate::classifier::{Classifier, TrainingMetrics};
use crate::config::TrainingConfig;
use crate::encoder::FeatureEncoder;
use crate::error::ModelError;
use crate::schema::feature_columns;

/// Train a bundle on `data`.
///
/// Code tables are fitted on every row and scaling statistics on the
/// training side of the holdout only. Metrics are computed on the held-out
/// rows.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ModelError::Training`] | no HR feature columns, a single class, or bad settings |
/// | [`ModelError::Forest`] | the holdout or forest rejects the data |
/// | [`ModelError::MissingFeature`] | a record lacks a feature column |
/// | [`ModelError::Validation`] | a numeric value is not finite |
#[instrument(skip_all, fields(n_samples = data.n_samples(), n_leavers = data.n_leavers()))]
pub fn train_bundle(
    data: &TrainingData,
    config: &TrainingConfig,
) -> Result<(ModelBundle, TrainingMetrics), ModelError> {
    let names = feature_columns(data.columns());
    if names.is_empty() {
        return Err(ModelError::training("training data has no HR feature columns"));
    }
    let labels = data.labels();
    let n_leavers = data.n_leavers();
    if n_leavers == 0 || n_leavers == labels.len() {
        return Err(ModelError::training(
            "training data must contain both leavers and stayers",
        ));
    }

    let (train_idx, test_idx) = config.holdout()?.split(labels)?;
    let encoder = FeatureEncoder::fit_with_scaling_rows(data.records(), &names, &train_idx)?;
    let x = encoder.transform_batch(data.records())?;

    let pick = |idx: &[usize]| -> (Vec<Vec<f64>>, Vec<usize>) {
        idx.iter().map(|&i| (x[i].clone(), labels[i])).unzip()
    };
    let (x_train, y_train) = pick(&train_idx);
    let (x_test, y_test) = pick(&test_idx);

    let (classifier, importances) = Classifier::fit(&x_train, &y_train, &names, config)?;
    let mut metrics = classifier.evaluate(&x_test, &y_test, importances.clone())?;
    metrics.n_train = y_train.len();

    let bundle = ModelBundle::new(classifier, encoder, importances)?;
    info!(
        run_id = %bundle.run_id(),
        n_features = names.len(),
        accuracy = metrics.accuracy,
        roc_auc = metrics.roc_auc,
        "model trained"
    );
    Ok((bundle, metrics))
}

/// Read a training CSV and train on it.
///
/// # Errors
///
/// [`ModelError::DataFileNotFound`] if the file does not exist,
/// [`ModelError::TrainingData`] if it cannot be parsed, otherwise as for
/// [`train_bundle`].
pub fn train_from_csv(
    path: &Path,
    config: &TrainingConfig,
) -> Result<(ModelBundle, TrainingMetrics), ModelError> {
    let data = TrainingDataReader::new(path).read()?;
    train_bundle(&data, config)
}
