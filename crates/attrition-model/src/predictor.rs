//! Risk prediction for individual employees.

use std::sync::Arc;

use attrition_io::{EmployeeRecord, RiskLevel};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::bundle::ModelBundle;
use crate::classifier::Outcome;
use crate::error::ModelError;

/// Number of contributing factors kept per prediction.
pub const TOP_FACTORS: usize = 10;

/// One feature's share in a prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContributingFactor {
    pub factor: String,
    pub importance: f64,
    /// Scaled feature value times importance; the sign follows the value.
    pub contribution: f64,
}

/// Prediction for one employee.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub prediction: Outcome,
    /// Probability of Leave.
    pub probability: f64,
    /// `probability * 100`.
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub top_factors: Vec<ContributingFactor>,
}

/// Output of [`Predictor::predict_many`]: a lone request yields a bare object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PredictionOutput {
    Single(PredictionResult),
    Batch(Vec<PredictionResult>),
}

/// Scores records against one immutable bundle snapshot.
#[derive(Debug, Clone)]
pub struct Predictor {
    bundle: Arc<ModelBundle>,
}

impl Predictor {
    #[must_use]
    pub fn new(bundle: Arc<ModelBundle>) -> Self {
        Self { bundle }
    }

    #[must_use]
    pub fn bundle(&self) -> &ModelBundle {
        &self.bundle
    }

    /// Score one record.
    ///
    /// # Errors
    ///
    /// Encoder errors ([`ModelError::MissingFeature`],
    /// [`ModelError::UnseenCategory`], [`ModelError::Validation`]) unchanged.
    pub fn predict(&self, record: &EmployeeRecord) -> Result<PredictionResult, ModelError> {
        let row = self.bundle.encoder().transform(record)?;
        let mut results = self.score(vec![row])?;
        results
            .pop()
            .ok_or_else(|| ModelError::validation("classifier returned no prediction"))
    }

    /// Score every record, failing on the first bad one.
    ///
    /// # Errors
    ///
    /// [`ModelError::Validation`] for an empty batch, otherwise as for
    /// [`Predictor::predict`].
    #[instrument(skip_all, fields(n_records = records.len()))]
    pub fn predict_batch(
        &self,
        records: &[EmployeeRecord],
    ) -> Result<Vec<PredictionResult>, ModelError> {
        if records.is_empty() {
            return Err(ModelError::validation("no employee records to score"));
        }
        let rows = self.bundle.encoder().transform_batch(records)?;
        self.score(rows)
    }

    /// Like [`Predictor::predict_batch`], but a one-element batch comes back
    /// as a single result rather than a list of one.
    ///
    /// # Errors
    ///
    /// As for [`Predictor::predict_batch`].
    pub fn predict_many(&self, records: &[EmployeeRecord]) -> Result<PredictionOutput, ModelError> {
        let mut results = self.predict_batch(records)?;
        if results.len() == 1
            && let Some(only) = results.pop()
        {
            return Ok(PredictionOutput::Single(only));
        }
        Ok(PredictionOutput::Batch(results))
    }

    fn score(&self, rows: Vec<Vec<f64>>) -> Result<Vec<PredictionResult>, ModelError> {
        let distributions = self.bundle.classifier().predict_distribution(&rows)?;
        let results: Vec<PredictionResult> = rows
            .iter()
            .zip(&distributions)
            .map(|(row, dist)| {
                let probability = dist.probability(Outcome::Leave.class());
                let risk_score = probability * 100.0;
                PredictionResult {
                    prediction: Outcome::from_class(dist.predicted_class()),
                    probability,
                    risk_score,
                    risk_level: RiskLevel::from_score(risk_score),
                    top_factors: self.top_factors(row),
                }
            })
            .collect();
        debug!(n_scored = results.len(), "records scored");
        Ok(results)
    }

    fn top_factors(&self, row: &[f64]) -> Vec<ContributingFactor> {
        let mut factors: Vec<ContributingFactor> = self
            .bundle
            .feature_names()
            .iter()
            .zip(self.bundle.importance_by_feature())
            .zip(row)
            .map(|((name, &importance), &value)| ContributingFactor {
                factor: name.clone(),
                importance,
                contribution: value * importance,
            })
            .collect();
        factors.sort_by(|a, b| b.contribution.abs().total_cmp(&a.contribution.abs()));
        factors.truncate(TOP_FACTORS);
        factors
    }
}

#[cfg(test)]
mod tests {
    use attrition_io::CategoryValue;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::classifier::Classifier;
    use crate::config::TrainingConfig;
    use crate::encoder::FeatureEncoder;
    use crate::error::ErrorKind;

    fn records(n: usize, seed: u64) -> (Vec<EmployeeRecord>, Vec<usize>) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..n)
            .map(|i| {
                let leave = usize::from(i % 4 == 0);
                let satisfaction: f64 = if leave == 1 { 1.0 } else { 4.0 };
                let record = EmployeeRecord {
                    job_satisfaction: Some(satisfaction),
                    monthly_income: Some(rng.gen_range(2000.0..12000.0)),
                    age: Some(rng.gen_range(20.0..60.0)),
                    over_time: Some(CategoryValue::from(if leave == 1 { "Yes" } else { "No" })),
                    ..EmployeeRecord::default()
                };
                (record, leave)
            })
            .unzip()
    }

    fn predictor() -> Predictor {
        let (recs, y) = records(80, 3);
        let names: Vec<String> = ["age", "jobSatisfaction", "monthlyIncome", "overTime"]
            .map(String::from)
            .to_vec();
        let encoder = FeatureEncoder::fit(&recs, &names).unwrap();
        let x = encoder.transform_batch(&recs).unwrap();
        let config = TrainingConfig::new().with_n_trees(15).with_seed(7);
        let (classifier, importances) = Classifier::fit(&x, &y, &names, &config).unwrap();
        Predictor::new(Arc::new(ModelBundle::new(classifier, encoder, importances).unwrap()))
    }

    #[test]
    fn risk_fields_are_consistent() {
        let predictor = predictor();
        let (recs, _) = records(5, 11);
        for record in &recs {
            let result = predictor.predict(record).unwrap();
            assert!((0.0..=1.0).contains(&result.probability));
            assert_eq!(result.risk_score, result.probability * 100.0);
            assert_eq!(result.risk_level, RiskLevel::from_score(result.risk_score));
            assert_eq!(result.top_factors.len(), 4);
        }
    }

    #[test]
    fn factors_sorted_by_absolute_contribution() {
        let predictor = predictor();
        let (recs, _) = records(3, 5);
        let result = predictor.predict(&recs[0]).unwrap();
        let magnitudes: Vec<f64> = result.top_factors.iter().map(|f| f.contribution.abs()).collect();
        assert!(magnitudes.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn clear_leaver_is_predicted_to_leave() {
        let predictor = predictor();
        let (recs, y) = records(8, 21);
        let leaver = recs.iter().zip(&y).find(|(_, l)| **l == 1).unwrap().0;
        let result = predictor.predict(leaver).unwrap();
        assert_eq!(result.prediction, Outcome::Leave);
    }

    #[test]
    fn batch_of_one_is_a_single_object() {
        let predictor = predictor();
        let (recs, _) = records(2, 8);

        let one = predictor.predict_many(&recs[..1]).unwrap();
        assert!(matches!(one, PredictionOutput::Single(_)));
        assert!(serde_json::to_value(&one).unwrap().is_object());

        let two = predictor.predict_many(&recs).unwrap();
        assert!(matches!(two, PredictionOutput::Batch(ref v) if v.len() == 2));
        assert!(serde_json::to_value(&two).unwrap().is_array());
    }

    #[test]
    fn empty_batch_is_validation_error() {
        let err = predictor().predict_many(&[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn encoder_errors_propagate() {
        let predictor = predictor();
        let (mut recs, _) = records(1, 2);
        recs[0].over_time = Some(CategoryValue::from("Sometimes"));
        let err = predictor.predict(&recs[0]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnseenCategory);

        recs[0].over_time = None;
        let err = predictor.predict(&recs[0]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingFeature);
    }

    #[test]
    fn serializes_with_wire_names() {
        let predictor = predictor();
        let (recs, _) = records(1, 4);
        let json = serde_json::to_value(predictor.predict(&recs[0]).unwrap()).unwrap();
        assert!(json["prediction"] == "Stay" || json["prediction"] == "Leave");
        for key in ["probability", "risk_score", "risk_level", "top_factors"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert!(json["top_factors"][0].get("factor").is_some());
    }
}
