//! Accuracy regression tests for attrition-rf.
//!
//! Guard against changes to tree growth or aggregation that silently
//! degrade holdout quality on a deterministic synthetic dataset.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use attrition_rf::{ConfusionMatrix, RandomForestConfig, StratifiedHoldout, roc_auc};

/// 400 samples, 8 features, binary labels with roughly a 1:3 positive ratio.
///
/// Features 0 and 1 carry the signal (positives shifted by +2.0),
/// the remaining six are noise in [0, 1).
fn make_dataset() -> (Vec<Vec<f64>>, Vec<usize>, Vec<String>) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut features = Vec::with_capacity(400);
    let mut labels = Vec::with_capacity(400);
    for i in 0..400 {
        let label = usize::from(i % 4 == 0);
        labels.push(label);
        let row = (0..8)
            .map(|f| {
                let shift = if f < 2 { label as f64 * 2.0 } else { 0.0 };
                shift + rng.r#gen::<f64>()
            })
            .collect();
        features.push(row);
    }
    let names = (0..8).map(|f| format!("f{f}")).collect();
    (features, labels, names)
}

fn select<T: Clone>(items: &[T], idx: &[usize]) -> Vec<T> {
    idx.iter().map(|&i| items[i].clone()).collect()
}

#[test]
fn holdout_accuracy_and_auc_above_threshold() {
    let (features, labels, names) = make_dataset();
    let (train, test) = StratifiedHoldout::new(0.2).unwrap().split(&labels).unwrap();

    let forest = RandomForestConfig::new(60)
        .unwrap()
        .with_min_samples_leaf(2)
        .fit(&select(&features, &train), &select(&labels, &train), &names)
        .unwrap()
        .into_forest();

    let test_x = select(&features, &test);
    let test_y = select(&labels, &test);
    let probs = forest.predict_proba_batch(&test_x).unwrap();
    let predicted: Vec<usize> = probs.iter().map(|d| d.predicted_class()).collect();
    let scores: Vec<f64> = probs.iter().map(|d| d.probability(1)).collect();

    let cm = ConfusionMatrix::from_labels(&test_y, &predicted, 2).unwrap();
    assert!(cm.accuracy() > 0.95, "accuracy {} <= 0.95", cm.accuracy());

    let auc = roc_auc(&test_y, &scores).unwrap();
    assert!(auc > 0.98, "roc_auc {auc} <= 0.98");
}

#[test]
fn signal_features_rank_first() {
    let (features, labels, names) = make_dataset();
    let result = RandomForestConfig::new(60)
        .unwrap()
        .fit(&features, &labels, &names)
        .unwrap();

    let top: Vec<&str> = result.importances()[..2]
        .iter()
        .map(|f| f.name.as_str())
        .collect();
    assert!(top.contains(&"f0"), "top features {top:?}");
    assert!(top.contains(&"f1"), "top features {top:?}");
    let total: f64 = result.importances().iter().map(|f| f.importance).sum();
    assert!((total - 1.0).abs() < 1e-9);
}

#[test]
fn thread_count_does_not_change_the_forest() {
    let (features, labels, names) = make_dataset();
    let cfg = RandomForestConfig::new(16).unwrap().with_seed(3);

    let single = rayon::ThreadPoolBuilder::new()
        .num_threads(1)
        .build()
        .unwrap()
        .install(|| cfg.fit(&features, &labels, &names).unwrap().into_forest());
    let multi = rayon::ThreadPoolBuilder::new()
        .num_threads(4)
        .build()
        .unwrap()
        .install(|| cfg.fit(&features, &labels, &names).unwrap().into_forest());

    assert_eq!(
        single.predict_proba_batch(&features).unwrap(),
        multi.predict_proba_batch(&features).unwrap()
    );
}
