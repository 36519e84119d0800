//! Label encoding of categorical columns and standard scaling.

use std::collections::BTreeMap;

use attrition_io::{EmployeeRecord, FieldValue};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, instrument};

use crate::error::ModelError;
use crate::schema::is_categorical;

/// Per-column code tables: each observed value maps to its rank in
/// lexicographic (byte) order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelEncoders {
    tables: BTreeMap<String, Vec<String>>,
}

impl LabelEncoders {
    /// Build a table for every categorical column in `columns` from all
    /// values observed in `records`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::MissingFeature`] if a record lacks one of the
    /// categorical columns.
    pub fn fit(records: &[EmployeeRecord], columns: &[String]) -> Result<Self, ModelError> {
        let mut tables = BTreeMap::new();
        for column in columns.iter().filter(|c| is_categorical(c)) {
            let mut classes = Vec::new();
            for record in records {
                let Some(FieldValue::Categorical(value)) = record.field(column) else {
                    return Err(ModelError::MissingFeature {
                        column: column.clone(),
                    });
                };
                classes.push(value.key());
            }
            classes.sort();
            classes.dedup();
            debug!(column = %column, n_classes = classes.len(), "fitted code table");
            tables.insert(column.clone(), classes);
        }
        Ok(Self { tables })
    }

    /// Rebuild from persisted tables. Each class list must be strictly
    /// ascending; returns the offending column otherwise.
    pub(crate) fn from_tables(tables: BTreeMap<String, Vec<String>>) -> Result<Self, String> {
        for (column, classes) in &tables {
            if !classes.windows(2).all(|w| w[0] < w[1]) {
                return Err(column.clone());
            }
        }
        Ok(Self { tables })
    }

    /// Code of `key` in `column`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnseenCategory`] if `column` has no table or
    /// `key` was never observed.
    pub fn code(&self, column: &str, key: &str) -> Result<usize, ModelError> {
        self.tables
            .get(column)
            .and_then(|classes| classes.binary_search_by(|c| c.as_str().cmp(key)).ok())
            .ok_or_else(|| ModelError::UnseenCategory {
                column: column.to_string(),
                value: key.to_string(),
            })
    }

    #[must_use]
    pub fn classes(&self, column: &str) -> Option<&[String]> {
        self.tables.get(column).map(Vec::as_slice)
    }

    #[must_use]
    pub fn tables(&self) -> &BTreeMap<String, Vec<String>> {
        &self.tables
    }
}

/// Per-feature mean and population standard deviation.
#[derive(Debug, Clone, PartialEq)]
pub struct Scaler {
    mean: Vec<f64>,
    std: Vec<f64>,
}

impl Scaler {
    /// Capture statistics from row-major `rows`. A zero deviation is stored
    /// as 1.0 so constant columns scale to 0.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Training`] if `rows` is empty.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self, ModelError> {
        let Some(first) = rows.first() else {
            return Err(ModelError::training("cannot fit scaler on zero rows"));
        };
        let width = first.len();
        let n = rows.len() as f64;

        let mut mean = vec![0.0; width];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut std = vec![0.0; width];
        for row in rows {
            for ((s, v), m) in std.iter_mut().zip(row).zip(&mean) {
                *s += (v - m) * (v - m);
            }
        }
        for s in &mut std {
            *s = (*s / n).sqrt();
            if *s == 0.0 {
                *s = 1.0;
            }
        }
        Ok(Self { mean, std })
    }

    /// Rebuild from persisted statistics.
    pub(crate) fn from_parts(mean: Vec<f64>, std: Vec<f64>) -> Self {
        Self { mean, std }
    }

    pub fn transform(&self, row: &mut [f64]) {
        for ((v, m), s) in row.iter_mut().zip(&self.mean).zip(&self.std) {
            *v = (*v - m) / s;
        }
    }

    #[must_use]
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    #[must_use]
    pub fn std(&self) -> &[f64] {
        &self.std
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.mean.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }
}

/// Turns records into scaled feature vectors in `feature_names` order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureEncoder {
    feature_names: Vec<String>,
    labels: LabelEncoders,
    scaler: Scaler,
}

impl FeatureEncoder {
    /// Fit code tables and scaling statistics on all of `records`.
    ///
    /// # Errors
    ///
    /// See [`FeatureEncoder::fit_with_scaling_rows`].
    pub fn fit(records: &[EmployeeRecord], feature_names: &[String]) -> Result<Self, ModelError> {
        let all: Vec<usize> = (0..records.len()).collect();
        Self::fit_with_scaling_rows(records, feature_names, &all)
    }

    /// Fit code tables on all of `records` but scaling statistics only on
    /// `scaling_rows`, as done for a train/test split.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::Training`] | no features, unknown feature name, or no scaling rows |
    /// | [`ModelError::MissingFeature`] | a record lacks a feature column |
    /// | [`ModelError::Validation`] | a numeric value is not finite |
    #[instrument(skip_all, fields(n_records = records.len(), n_features = feature_names.len()))]
    pub fn fit_with_scaling_rows(
        records: &[EmployeeRecord],
        feature_names: &[String],
        scaling_rows: &[usize],
    ) -> Result<Self, ModelError> {
        if feature_names.is_empty() {
            return Err(ModelError::training("no feature columns to encode"));
        }
        if let Some(unknown) = feature_names
            .iter()
            .find(|name| attrition_io::field_kind(name).is_none())
        {
            return Err(ModelError::training(format!("unknown feature column {unknown}")));
        }

        let labels = LabelEncoders::fit(records, feature_names)?;
        let raw = scaling_rows
            .iter()
            .map(|&i| encode_raw(&records[i], feature_names, &labels))
            .collect::<Result<Vec<_>, _>>()?;
        let scaler = Scaler::fit(&raw)?;

        Ok(Self {
            feature_names: feature_names.to_vec(),
            labels,
            scaler,
        })
    }

    /// Reassemble from persisted parts.
    pub(crate) fn from_parts(feature_names: Vec<String>, labels: LabelEncoders, scaler: Scaler) -> Self {
        Self {
            feature_names,
            labels,
            scaler,
        }
    }

    /// Encode and scale one record.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::MissingFeature`] | a feature column is absent |
    /// | [`ModelError::UnseenCategory`] | a categorical value has no code |
    /// | [`ModelError::Validation`] | a numeric value is not finite |
    pub fn transform(&self, record: &EmployeeRecord) -> Result<Vec<f64>, ModelError> {
        let mut row = encode_raw(record, &self.feature_names, &self.labels)?;
        self.scaler.transform(&mut row);
        Ok(row)
    }

    /// [`FeatureEncoder::transform`] over many records, in parallel.
    ///
    /// # Errors
    ///
    /// The first error encountered, as for [`FeatureEncoder::transform`].
    pub fn transform_batch(&self, records: &[EmployeeRecord]) -> Result<Vec<Vec<f64>>, ModelError> {
        records.par_iter().map(|r| self.transform(r)).collect()
    }

    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    #[must_use]
    pub fn label_encoders(&self) -> &LabelEncoders {
        &self.labels
    }

    #[must_use]
    pub fn scaler(&self) -> &Scaler {
        &self.scaler
    }
}

/// Codes for categorical columns, raw values for numeric ones. No scaling.
fn encode_raw(
    record: &EmployeeRecord,
    feature_names: &[String],
    labels: &LabelEncoders,
) -> Result<Vec<f64>, ModelError> {
    feature_names
        .iter()
        .map(|column| {
            let value = record.field(column).ok_or_else(|| ModelError::MissingFeature {
                column: column.clone(),
            })?;
            match value {
                FieldValue::Categorical(category) => {
                    Ok(labels.code(column, &category.key())? as f64)
                }
                FieldValue::Numeric(n) if n.is_finite() => Ok(n),
                FieldValue::Numeric(n) => Err(ModelError::validation(format!(
                    "{column} must be a finite number, got {n}"
                ))),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use attrition_io::CategoryValue;

    use super::*;
    use crate::error::ErrorKind;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    fn employee(age: f64, department: &str, over_time: CategoryValue) -> EmployeeRecord {
        EmployeeRecord {
            age: Some(age),
            department: Some(CategoryValue::from(department)),
            over_time: Some(over_time),
            ..Default::default()
        }
    }

    fn sample() -> Vec<EmployeeRecord> {
        vec![
            employee(30.0, "Sales", "Yes".into()),
            employee(40.0, "Research & Development", "No".into()),
            employee(50.0, "Human Resources", "No".into()),
            employee(40.0, "Sales", "Yes".into()),
        ]
    }

    #[test]
    fn codes_follow_lexicographic_order() {
        let labels = LabelEncoders::fit(&sample(), &names(&["department", "overTime", "age"])).unwrap();
        assert_eq!(
            labels.classes("department").unwrap(),
            &["Human Resources", "Research & Development", "Sales"]
        );
        assert_eq!(labels.code("department", "Sales").unwrap(), 2);
        assert_eq!(labels.code("overTime", "No").unwrap(), 0);
        assert!(labels.classes("age").is_none());
    }

    #[test]
    fn codes_are_case_sensitive() {
        let labels = LabelEncoders::fit(&sample(), &names(&["department"])).unwrap();
        let err = labels.code("department", "sales").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnseenCategory);
    }

    #[test]
    fn scaler_uses_population_std_and_guards_constants() {
        let scaler = Scaler::fit(&[vec![1.0, 5.0], vec![3.0, 5.0]]).unwrap();
        assert_eq!(scaler.mean(), &[2.0, 5.0]);
        assert_eq!(scaler.std(), &[1.0, 1.0]);

        let mut row = vec![4.0, 5.0];
        scaler.transform(&mut row);
        assert_eq!(row, vec![2.0, 0.0]);
    }

    #[test]
    fn transform_scales_in_feature_order() {
        let features = names(&["age", "department", "overTime"]);
        let encoder = FeatureEncoder::fit(&sample(), &features).unwrap();

        // age mean 40, population std sqrt(50)
        let row = encoder.transform(&sample()[0]).unwrap();
        assert_eq!(row.len(), 3);
        assert!((row[0] - (-10.0 / 50f64.sqrt())).abs() < 1e-12);
        assert_eq!(encoder.feature_names(), features.as_slice());
    }

    #[test]
    fn encoding_is_idempotent() {
        let encoder = FeatureEncoder::fit(&sample(), &names(&["age", "department"])).unwrap();
        let record = &sample()[1];
        assert_eq!(encoder.transform(record).unwrap(), encoder.transform(record).unwrap());
    }

    #[test]
    fn boolean_overtime_uses_yes_no_codes() {
        let encoder = FeatureEncoder::fit(&sample(), &names(&["overTime"])).unwrap();
        let text = encoder.transform(&employee(30.0, "Sales", "Yes".into())).unwrap();
        let flag = encoder.transform(&employee(30.0, "Sales", true.into())).unwrap();
        assert_eq!(text, flag);
    }

    #[test]
    fn unseen_value_is_reported_with_column() {
        let encoder = FeatureEncoder::fit(&sample(), &names(&["department"])).unwrap();
        let err = encoder
            .transform(&employee(30.0, "Legal", "No".into()))
            .unwrap_err();
        assert!(matches!(
            err,
            ModelError::UnseenCategory { ref column, ref value }
                if column == "department" && value == "Legal"
        ));
    }

    #[test]
    fn missing_feature_is_reported() {
        let encoder = FeatureEncoder::fit(&sample(), &names(&["age", "department"])).unwrap();
        let record = EmployeeRecord {
            age: Some(33.0),
            ..Default::default()
        };
        let err = encoder.transform(&record).unwrap_err();
        assert!(matches!(err, ModelError::MissingFeature { ref column } if column == "department"));
    }

    #[test]
    fn fit_requires_every_categorical_value() {
        let mut records = sample();
        records[2].department = None;
        let err = LabelEncoders::fit(&records, &names(&["age", "department"])).unwrap_err();
        assert!(matches!(err, ModelError::MissingFeature { ref column } if column == "department"));
        // Numeric columns get no table, so a missing age is not a fitting error here.
        records[2].department = Some(CategoryValue::from("Sales"));
        records[2].age = None;
        assert!(LabelEncoders::fit(&records, &names(&["age", "department"])).is_ok());
    }

    #[test]
    fn non_finite_number_is_validation_error() {
        let encoder = FeatureEncoder::fit(&sample(), &names(&["age"])).unwrap();
        let record = EmployeeRecord {
            age: Some(f64::NAN),
            ..Default::default()
        };
        assert_eq!(encoder.transform(&record).unwrap_err().kind(), ErrorKind::Validation);
    }

    #[test]
    fn scaling_rows_restrict_statistics_but_not_code_tables() {
        let features = names(&["age", "department"]);
        let encoder = FeatureEncoder::fit_with_scaling_rows(&sample(), &features, &[0, 1]).unwrap();
        assert_eq!(encoder.scaler().mean()[0], 35.0);
        // Human Resources only appears in row 2 but still has a code.
        assert_eq!(encoder.label_encoders().code("department", "Human Resources").unwrap(), 0);
    }

    #[test]
    fn unsorted_persisted_table_is_rejected() {
        let tables = BTreeMap::from([("gender".to_string(), names(&["Male", "Female"]))]);
        assert_eq!(LabelEncoders::from_tables(tables).unwrap_err(), "gender");
    }
}
