//! Binary Stay/Leave classifier over encoded feature vectors.

use std::fmt;

use attrition_rf::{ClassDistribution, ConfusionMatrix, RandomForest, RankedFeature, roc_auc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::config::TrainingConfig;
use crate::error::ModelError;

/// Number of ranked importances reported as "top features".
pub const TOP_FEATURES: usize = 10;

/// Predicted or observed attrition outcome. Class 0 is Stay, class 1 is Leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Stay,
    Leave,
}

impl Outcome {
    #[must_use]
    pub fn class(self) -> usize {
        match self {
            Outcome::Stay => 0,
            Outcome::Leave => 1,
        }
    }

    #[must_use]
    pub fn from_class(class: usize) -> Self {
        if class == 1 { Outcome::Leave } else { Outcome::Stay }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Outcome::Stay => "Stay",
            Outcome::Leave => "Leave",
        })
    }
}

/// One row of the classification report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassReport {
    pub label: Outcome,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Holdout evaluation of a freshly trained classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub accuracy: f64,
    pub roc_auc: f64,
    pub class_report: Vec<ClassReport>,
    /// `confusion_matrix[actual][predicted]`, Stay first.
    pub confusion_matrix: Vec<Vec<usize>>,
    /// All features, most important first.
    pub feature_importance: Vec<RankedFeature>,
    pub top_features: Vec<RankedFeature>,
    /// Rows used to fit; 0 when evaluated outside a training run.
    pub n_train: usize,
    pub n_test: usize,
}

/// Random forest wrapper that speaks Stay/Leave.
#[derive(Debug, Clone)]
pub struct Classifier {
    forest: RandomForest,
}

impl Classifier {
    pub(crate) fn from_forest(forest: RandomForest) -> Self {
        Self { forest }
    }

    /// Fit on already encoded rows. Labels must be 0 (Stay) or 1 (Leave)
    /// and both must occur.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::Training`] | empty data, a label outside {0, 1}, or only one class |
    /// | [`ModelError::Forest`] | the forest rejects the data or settings |
    #[instrument(skip_all, fields(n_samples = x.len()))]
    pub fn fit(
        x: &[Vec<f64>],
        y: &[usize],
        feature_names: &[String],
        config: &TrainingConfig,
    ) -> Result<(Self, Vec<RankedFeature>), ModelError> {
        check_binary_labels(y)?;
        let result = config.forest_config()?.fit(x, y, feature_names)?;
        let meta = result.metadata();
        info!(
            n_trees = meta.n_trees,
            n_samples = meta.n_samples,
            max_features = meta.max_features_resolved,
            "classifier fitted"
        );
        let importances = result.importances().to_vec();
        Ok((Self::from_forest(result.into_forest()), importances))
    }

    /// Split `x`/`y` with a stratified holdout, fit on the train side and
    /// evaluate on the test side.
    ///
    /// # Errors
    ///
    /// As for [`Classifier::fit`], plus [`ModelError::Forest`] when the
    /// test fraction is invalid or a class is too small to split.
    #[instrument(skip_all, fields(n_samples = x.len(), test_fraction = config.test_fraction()))]
    pub fn train(
        x: &[Vec<f64>],
        y: &[usize],
        feature_names: &[String],
        config: &TrainingConfig,
    ) -> Result<(Self, TrainingMetrics), ModelError> {
        check_binary_labels(y)?;
        let (train_idx, test_idx) = config.holdout()?.split(y)?;
        let pick = |idx: &[usize]| -> (Vec<Vec<f64>>, Vec<usize>) {
            idx.iter().map(|&i| (x[i].clone(), y[i])).unzip()
        };
        let (x_train, y_train) = pick(&train_idx);
        let (x_test, y_test) = pick(&test_idx);

        let (classifier, importances) = Self::fit(&x_train, &y_train, feature_names, config)?;
        let mut metrics = classifier.evaluate(&x_test, &y_test, importances)?;
        metrics.n_train = y_train.len();
        Ok((classifier, metrics))
    }

    /// Score held-out rows.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::Training`] | `x` and `y` differ in length |
    /// | [`ModelError::Forest`] | empty or single-class test data, wrong row width |
    pub fn evaluate(
        &self,
        x: &[Vec<f64>],
        y: &[usize],
        importances: Vec<RankedFeature>,
    ) -> Result<TrainingMetrics, ModelError> {
        if x.len() != y.len() {
            return Err(ModelError::training(format!(
                "{} test rows but {} labels",
                x.len(),
                y.len()
            )));
        }
        let distributions = self.forest.predict_proba_batch(x)?;
        let predicted: Vec<usize> = distributions
            .iter()
            .map(ClassDistribution::predicted_class)
            .collect();
        let scores: Vec<f64> = distributions.iter().map(|d| d.probability(1)).collect();

        let confusion = ConfusionMatrix::from_labels(y, &predicted, 2)?;
        let roc_auc = roc_auc(y, &scores)?;
        let class_report = confusion
            .class_metrics()
            .into_iter()
            .map(|m| ClassReport {
                label: Outcome::from_class(m.class),
                precision: m.precision,
                recall: m.recall,
                f1: m.f1,
                support: m.support,
            })
            .collect();

        let top_features = importances.iter().take(TOP_FEATURES).cloned().collect();
        let metrics = TrainingMetrics {
            accuracy: confusion.accuracy(),
            roc_auc,
            class_report,
            confusion_matrix: confusion.as_rows().to_vec(),
            feature_importance: importances,
            top_features,
            n_train: 0,
            n_test: y.len(),
        };
        info!(
            accuracy = metrics.accuracy,
            roc_auc = metrics.roc_auc,
            n_test = metrics.n_test,
            "holdout evaluation"
        );
        Ok(metrics)
    }

    /// Probability of Leave for each row.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Forest`] if a row has the wrong width.
    pub fn predict_probability(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        Ok(self
            .forest
            .predict_proba_batch(x)?
            .iter()
            .map(|d| d.probability(Outcome::Leave.class()))
            .collect())
    }

    /// Full class distribution for each row.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Forest`] if a row has the wrong width.
    pub fn predict_distribution(&self, x: &[Vec<f64>]) -> Result<Vec<ClassDistribution>, ModelError> {
        Ok(self.forest.predict_proba_batch(x)?)
    }

    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }
}

fn check_binary_labels(y: &[usize]) -> Result<(), ModelError> {
    if y.is_empty() {
        return Err(ModelError::training("no training rows"));
    }
    if let Some(&bad) = y.iter().find(|&&label| label > 1) {
        return Err(ModelError::training(format!(
            "label {bad} is neither Stay (0) nor Leave (1)"
        )));
    }
    let leavers = y.iter().filter(|&&label| label == 1).count();
    if leavers == 0 || leavers == y.len() {
        return Err(ModelError::training(
            "training data must contain both leavers and stayers",
        ));
    }
    Ok(())
}
