//! Random forest training with parallel tree construction.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::config::RandomForestConfig;
use crate::error::RfError;
use crate::importance::aggregate_importances;
use crate::result::{RandomForestResult, TrainingMetadata};
use crate::tree::{DecisionTree, TreeLimits};

/// A fitted random forest ensemble.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RandomForest {
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
    pub(crate) feature_names: Vec<String>,
}

/// Check the shape and finiteness of a row-major training set.
fn validate_dataset(
    features: &[Vec<f64>],
    labels: &[usize],
    feature_names: &[String],
) -> Result<usize, RfError> {
    let Some(first) = features.first() else {
        return Err(RfError::EmptyDataset);
    };
    let n_features = first.len();
    if n_features == 0 {
        return Err(RfError::ZeroFeatures);
    }
    if labels.len() != features.len() {
        return Err(RfError::LabelCountMismatch {
            n_samples: features.len(),
            n_labels: labels.len(),
        });
    }
    if feature_names.len() != n_features {
        return Err(RfError::FeatureNameMismatch {
            n_features,
            n_names: feature_names.len(),
        });
    }
    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(RfError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
            return Err(RfError::NonFiniteValue {
                sample_index,
                feature_index,
            });
        }
    }
    Ok(n_features)
}

/// Draw `n_samples` indices with replacement.
fn bootstrap(n_samples: usize, rng: &mut impl Rng) -> Vec<usize> {
    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
}

#[instrument(skip_all, fields(n_trees = config.n_trees, n_samples = features.len()))]
pub(crate) fn train(
    config: &RandomForestConfig,
    features: &[Vec<f64>],
    labels: &[usize],
    feature_names: &[String],
) -> Result<RandomForestResult, RfError> {
    let n_features = validate_dataset(features, labels, feature_names)?;
    config.validate()?;
    let max_features = config.max_features.resolve(n_features)?;

    let n_samples = features.len();
    let n_classes = labels.iter().max().copied().unwrap_or(0) + 1;

    info!(
        n_trees = config.n_trees,
        n_samples,
        n_features,
        n_classes,
        max_features,
        "training random forest"
    );

    // Column-major copy shared read-only by every tree.
    let columns: Vec<Vec<f64>> = (0..n_features)
        .map(|f| features.iter().map(|row| row[f]).collect())
        .collect();

    let limits = TreeLimits {
        max_depth: config.max_depth,
        min_samples_split: config.min_samples_split,
        min_samples_leaf: config.min_samples_leaf,
        max_features,
    };

    // Seeds are drawn up front so the forest is identical for any pool size.
    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let tree_seeds: Vec<(u64, u64)> = (0..config.n_trees)
        .map(|_| (master_rng.r#gen(), master_rng.r#gen()))
        .collect();

    let trees: Vec<DecisionTree> = tree_seeds
        .into_par_iter()
        .map(|(bootstrap_seed, split_seed)| {
            let mut rng = ChaCha8Rng::seed_from_u64(bootstrap_seed);
            let samples = bootstrap(n_samples, &mut rng);
            DecisionTree::grow(&columns, labels, &samples, n_classes, limits, split_seed)
        })
        .collect();

    debug!(
        total_nodes = trees.iter().map(DecisionTree::n_nodes).sum::<usize>(),
        "tree training complete"
    );

    let per_tree: Vec<Vec<f64>> = trees.iter().map(DecisionTree::feature_importances).collect();
    let importances = aggregate_importances(&per_tree, feature_names);

    let forest = RandomForest {
        trees,
        n_features,
        n_classes,
        feature_names: feature_names.to_vec(),
    };
    let metadata = TrainingMetadata {
        n_trees: config.n_trees,
        n_features,
        n_classes,
        n_samples,
        max_features_resolved: max_features,
    };

    info!("random forest training complete");
    Ok(RandomForestResult::new(forest, importances, metadata))
}

#[cfg(test)]
mod tests {
    use crate::config::{MaxFeatures, RandomForestConfig};
    use crate::error::RfError;

    /// Two well separated classes on feature 0, feature 1 is constant.
    fn make_binary_data() -> (Vec<Vec<f64>>, Vec<usize>, Vec<String>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..30 {
            features.push(vec![i as f64 * 0.1, 1.0]);
            labels.push(0);
        }
        for i in 0..30 {
            features.push(vec![10.0 + i as f64 * 0.1, 1.0]);
            labels.push(1);
        }
        (features, labels, vec!["x".to_string(), "flat".to_string()])
    }

    #[test]
    fn separable_training_accuracy() {
        let (features, labels, names) = make_binary_data();
        let result = RandomForestConfig::new(25)
            .unwrap()
            .with_max_features(MaxFeatures::All)
            .fit(&features, &labels, &names)
            .unwrap();

        let predictions = result.forest().predict_batch(&features).unwrap();
        let correct = predictions.iter().zip(&labels).filter(|(p, l)| p == l).count();
        assert_eq!(correct, labels.len());

        let meta = result.metadata();
        assert_eq!(meta.n_trees, 25);
        assert_eq!(meta.n_samples, labels.len());
        assert_eq!(meta.n_classes, 2);
        assert_eq!(meta.max_features_resolved, 2);
    }

    #[test]
    fn informative_feature_takes_all_importance() {
        let (features, labels, names) = make_binary_data();
        let result = RandomForestConfig::new(10)
            .unwrap()
            .fit(&features, &labels, &names)
            .unwrap();

        let importances = result.importances();
        assert_eq!(importances[0].name, "x");
        assert!((importances[0].importance - 1.0).abs() < 1e-10);
        assert_eq!(importances[1].importance, 0.0);
    }

    #[test]
    fn same_seed_same_forest() {
        let (features, labels, names) = make_binary_data();
        let config = RandomForestConfig::new(8).unwrap().with_seed(7);
        let a = config.fit(&features, &labels, &names).unwrap();
        let b = config.fit(&features, &labels, &names).unwrap();

        let pa = a.forest().predict_proba_batch(&features).unwrap();
        let pb = b.forest().predict_proba_batch(&features).unwrap();
        for (x, y) in pa.iter().zip(&pb) {
            assert_eq!(x.as_slice(), y.as_slice());
        }
    }

    #[test]
    fn depth_limit_applies_to_every_tree() {
        let (features, labels, names) = make_binary_data();
        let result = RandomForestConfig::new(5)
            .unwrap()
            .with_max_depth(Some(1))
            .fit(&features, &labels, &names)
            .unwrap();
        assert!(result.forest().trees.iter().all(|t| t.depth() <= 1));
    }

    #[test]
    fn empty_dataset_error() {
        let config = RandomForestConfig::new(3).unwrap();
        let err = config.fit(&[], &[], &[]).unwrap_err();
        assert!(matches!(err, RfError::EmptyDataset));
    }

    #[test]
    fn label_count_mismatch_error() {
        let config = RandomForestConfig::new(3).unwrap();
        let err = config
            .fit(&[vec![1.0], vec![2.0]], &[0], &["a".to_string()])
            .unwrap_err();
        assert!(matches!(
            err,
            RfError::LabelCountMismatch {
                n_samples: 2,
                n_labels: 1
            }
        ));
    }

    #[test]
    fn non_finite_value_error() {
        let config = RandomForestConfig::new(3).unwrap();
        let err = config
            .fit(&[vec![1.0], vec![f64::NAN]], &[0, 1], &["a".to_string()])
            .unwrap_err();
        assert!(matches!(
            err,
            RfError::NonFiniteValue {
                sample_index: 1,
                feature_index: 0
            }
        ));
    }
}
