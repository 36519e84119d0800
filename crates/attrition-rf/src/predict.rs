//! Prediction methods for the random forest ensemble.

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::error::RfError;
use crate::forest::RandomForest;
use crate::tree::DecisionTree;

/// Averaged class probabilities for one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDistribution {
    probs: Vec<f64>,
}

impl ClassDistribution {
    /// Arg-max class; ties resolve to the lowest class id.
    #[must_use]
    pub fn predicted_class(&self) -> usize {
        let mut best = 0;
        for (class, &p) in self.probs.iter().enumerate().skip(1) {
            if p > self.probs[best] {
                best = class;
            }
        }
        best
    }

    /// Probability of `class`, 0.0 for a class the forest never saw.
    #[must_use]
    pub fn probability(&self, class: usize) -> f64 {
        self.probs.get(class).copied().unwrap_or(0.0)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.probs
    }
}

impl RandomForest {
    /// Predict the class label for a single sample.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<usize, RfError> {
        Ok(self.predict_proba(sample)?.predicted_class())
    }

    /// Average the leaf distributions of every tree for one sample.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<ClassDistribution, RfError> {
        if sample.len() != self.n_features {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }

        let mut sum = vec![0.0f64; self.n_classes];
        for tree in &self.trees {
            for (acc, p) in sum.iter_mut().zip(tree.leaf_distribution(sample)) {
                *acc += p;
            }
        }
        let n = self.trees.len() as f64;
        sum.iter_mut().for_each(|v| *v /= n);

        Ok(ClassDistribution { probs: sum })
    }

    /// Predict class labels for a batch of samples in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] if any sample has the wrong feature count.
    pub fn predict_batch(&self, features: &[Vec<f64>]) -> Result<Vec<usize>, RfError> {
        features
            .into_par_iter()
            .map(|sample| self.predict(sample))
            .collect()
    }

    /// Return probability distributions for a batch of samples in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] if any sample has the wrong feature count.
    pub fn predict_proba_batch(
        &self,
        features: &[Vec<f64>],
    ) -> Result<Vec<ClassDistribution>, RfError> {
        features
            .into_par_iter()
            .map(|sample| self.predict_proba(sample))
            .collect()
    }

    /// Number of features this forest was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Number of classes seen during training.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Number of trees in the ensemble.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    #[must_use]
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Feature names in column order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }
}

#[cfg(test)]
mod tests {
    use super::ClassDistribution;
    use crate::RandomForestConfig;
    use crate::error::RfError;

    #[test]
    fn ties_resolve_to_first_class() {
        let dist = ClassDistribution {
            probs: vec![0.5, 0.5],
        };
        assert_eq!(dist.predicted_class(), 0);
    }

    #[test]
    fn unknown_class_probability_is_zero() {
        let dist = ClassDistribution {
            probs: vec![0.3, 0.7],
        };
        assert_eq!(dist.probability(1), 0.7);
        assert_eq!(dist.probability(5), 0.0);
    }

    #[test]
    fn batch_matches_single() {
        let features = vec![vec![0.0], vec![1.0], vec![5.0], vec![6.0]];
        let labels = vec![0, 0, 1, 1];
        let forest = RandomForestConfig::new(6)
            .unwrap()
            .fit(&features, &labels, &["v".to_string()])
            .unwrap()
            .into_forest();

        let batch = forest.predict_proba_batch(&features).unwrap();
        for (row, dist) in features.iter().zip(&batch) {
            assert_eq!(&forest.predict_proba(row).unwrap(), dist);
        }
    }

    #[test]
    fn wrong_width_is_rejected() {
        let forest = RandomForestConfig::new(2)
            .unwrap()
            .fit(&[vec![0.0], vec![1.0]], &[0, 1], &["v".to_string()])
            .unwrap()
            .into_forest();
        let err = forest.predict_proba(&[0.0, 1.0]).unwrap_err();
        assert!(matches!(
            err,
            RfError::PredictionFeatureMismatch {
                expected: 1,
                got: 2
            }
        ));
    }
}
