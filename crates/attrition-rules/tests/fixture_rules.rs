//! Rule engines over the shared HR sample table.

use std::path::Path;

use attrition_io::TrainingDataReader;
use attrition_rules::{RetentionConfig, RetentionStrategyGenerator, StrategyOrdering, analyze};

fn fixture() -> attrition_io::TrainingData {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../attrition-io/tests/fixtures/hr_sample.csv");
    TrainingDataReader::new(&path).read().unwrap()
}

#[test]
fn analysis_invariants_hold_for_every_row() {
    for record in fixture().records() {
        let analysis = analyze(record);
        assert_eq!(analysis.total_reasons, analysis.reasons.len());
        assert!(analysis.reasons.windows(2).all(|w| w[0].impact >= w[1].impact));
        assert!((0.0..=100.0).contains(&analysis.preventability_score));
    }
}

#[test]
fn orderings_agree_on_membership() {
    let literal = RetentionStrategyGenerator::default();
    let urgent = RetentionStrategyGenerator::new(
        RetentionConfig::new().with_ordering(StrategyOrdering::UrgencyFirst),
    );
    for record in fixture().records() {
        let a = literal.generate(record, 55.0);
        let b = urgent.generate(record, 55.0);
        assert_eq!(a.total_strategies, b.total_strategies);
        assert_eq!(a.estimated_effectiveness, b.estimated_effectiveness);
        assert!(a.strategies.len() <= 5);
        assert!(a.estimated_effectiveness <= 95);

        let mut x: Vec<_> = a.strategies.iter().map(|s| s.category).collect();
        let mut y: Vec<_> = b.strategies.iter().map(|s| s.category).collect();
        x.sort_unstable();
        y.sort_unstable();
        assert_eq!(x, y);
    }
}
