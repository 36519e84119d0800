//! Training-data CSV reader with row and column level validation.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::IoError;
use crate::domain::{CategoryValue, EmployeeRecord, FieldKind, TrainingData, field_kind};

/// Name of the required label column.
pub const LABEL_COLUMN: &str = "attrition";

/// Reads a labelled HR table from CSV.
///
/// Expected format: a header row with camelCase field names, one row per
/// employee, and an `attrition` column holding `Yes` or `No`. Columns that
/// are not HR fields (employee ids and the like) are ignored.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | file doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | malformed CSV record |
/// | [`IoError::MissingLabelColumn`] | header has no `attrition` column |
/// | [`IoError::InconsistentRowLength`] | row width differs from the header |
/// | [`IoError::InvalidLabel`] | `attrition` cell is not `Yes`/`No` |
/// | [`IoError::MissingValue`] | an HR field cell is empty |
/// | [`IoError::InvalidNumber`] | numeric cell is NaN, Inf or unparseable |
/// | [`IoError::EmptyDataset`] | zero data rows after the header |
pub struct TrainingDataReader {
    path: PathBuf,
}

impl TrainingDataReader {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<TrainingData, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|source| IoError::FileNotFound {
            path: self.path.clone(),
            source,
        })?;

        // flexible(true) so a short row surfaces as InconsistentRowLength
        // rather than a generic parse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| self.csv_error(e))?.clone();
        let expected = header.len();

        let label_index = header
            .iter()
            .position(|h| h == LABEL_COLUMN)
            .ok_or_else(|| IoError::MissingLabelColumn {
                path: self.path.clone(),
            })?;

        let fields: Vec<(usize, String, FieldKind)> = header
            .iter()
            .enumerate()
            .filter_map(|(i, name)| field_kind(name).map(|kind| (i, name.to_string(), kind)))
            .collect();
        let ignored = expected - fields.len() - 1;
        if ignored > 0 {
            debug!(ignored, "ignoring non-HR columns");
        }
        if fields.is_empty() {
            warn!("header has no recognised HR fields");
        }

        let mut records = Vec::new();
        let mut labels = Vec::new();

        for (row_index, result) in rdr.records().enumerate() {
            let row = result.map_err(|e| self.csv_error(e))?;
            if row.len() != expected {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected,
                    got: row.len(),
                });
            }

            let label = match &row[label_index] {
                "Yes" => 1,
                "No" => 0,
                raw => {
                    return Err(IoError::InvalidLabel {
                        path: self.path.clone(),
                        row_index,
                        raw: raw.to_string(),
                    });
                }
            };

            let mut record = EmployeeRecord::default();
            for (col, name, kind) in &fields {
                let raw = &row[*col];
                if raw.is_empty() {
                    return Err(IoError::MissingValue {
                        path: self.path.clone(),
                        row_index,
                        column: name.clone(),
                    });
                }
                match kind {
                    FieldKind::Numeric => {
                        let value = raw
                            .parse::<f64>()
                            .ok()
                            .filter(|v| v.is_finite())
                            .ok_or_else(|| IoError::InvalidNumber {
                                path: self.path.clone(),
                                row_index,
                                column: name.clone(),
                                raw: raw.to_string(),
                            })?;
                        record.set_numeric(name, value);
                    }
                    FieldKind::Categorical => {
                        record.set_category(name, CategoryValue::from(raw));
                    }
                }
            }

            records.push(record);
            labels.push(label);
        }

        if records.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        let columns: Vec<String> = fields.into_iter().map(|(_, name, _)| name).collect();
        let data = TrainingData::new(columns, records, labels);
        info!(
            n_employees = data.n_samples(),
            n_leavers = data.n_leavers(),
            n_fields = data.columns().len(),
            "training data loaded"
        );
        Ok(data)
    }

    fn csv_error(&self, source: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: source.position().map_or(0, csv::Position::byte),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;
    use crate::domain::FieldValue;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn reads_records_labels_and_present_columns() {
        let f = write_csv(
            "employeeNumber,age,department,overTime,monthlyIncome,attrition\n\
             1,41,Sales,Yes,5993,Yes\n\
             2,49,Research & Development,No,5130,No\n\
             4,37,Research & Development,Yes,2090,Yes\n",
        );
        let data = TrainingDataReader::new(f.path()).read().unwrap();

        assert_eq!(data.n_samples(), 3);
        assert_eq!(data.labels(), &[1, 0, 1]);
        assert_eq!(data.n_leavers(), 2);
        assert_eq!(data.columns(), &["age", "department", "overTime", "monthlyIncome"]);

        let second = &data.records()[1];
        assert_eq!(second.age, Some(49.0));
        assert_eq!(second.field("monthlyIncome"), Some(FieldValue::Numeric(5130.0)));
        assert_eq!(
            second.department,
            Some(CategoryValue::from("Research & Development"))
        );
        assert_eq!(second.job_role, None);
    }

    #[test]
    fn missing_label_column() {
        let f = write_csv("age,department\n30,Sales\n");
        let err = TrainingDataReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::MissingLabelColumn { .. }));
    }

    #[test]
    fn invalid_label_value() {
        let f = write_csv("age,attrition\n30,Yes\n31,maybe\n");
        let err = TrainingDataReader::new(f.path()).read().unwrap_err();
        assert!(matches!(
            err,
            IoError::InvalidLabel { row_index: 1, ref raw, .. } if raw == "maybe"
        ));
    }

    #[test]
    fn malformed_number_reports_row_and_column() {
        let f = write_csv("age,monthlyIncome,attrition\n30,100,No\n31,lots,No\n");
        let err = TrainingDataReader::new(f.path()).read().unwrap_err();
        assert!(matches!(
            err,
            IoError::InvalidNumber { row_index: 1, ref column, .. } if column == "monthlyIncome"
        ));
    }

    #[test]
    fn infinite_number_rejected() {
        let f = write_csv("age,attrition\ninf,No\n");
        let err = TrainingDataReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::InvalidNumber { row_index: 0, .. }));
    }

    #[test]
    fn empty_cell_rejected() {
        let f = write_csv("age,gender,attrition\n30,,No\n");
        let err = TrainingDataReader::new(f.path()).read().unwrap_err();
        assert!(matches!(
            err,
            IoError::MissingValue { row_index: 0, ref column, .. } if column == "gender"
        ));
    }

    #[test]
    fn short_row_rejected() {
        let f = write_csv("age,gender,attrition\n30,Male,No\n31,Female\n");
        let err = TrainingDataReader::new(f.path()).read().unwrap_err();
        assert!(matches!(
            err,
            IoError::InconsistentRowLength {
                row_index: 1,
                expected: 3,
                got: 2,
                ..
            }
        ));
    }

    #[test]
    fn header_only_is_empty() {
        let f = write_csv("age,attrition\n");
        let err = TrainingDataReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::EmptyDataset { .. }));
    }

    #[test]
    fn missing_file() {
        let err = TrainingDataReader::new(Path::new("/nonexistent/hr.csv"))
            .read()
            .unwrap_err();
        assert!(matches!(err, IoError::FileNotFound { .. }));
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let f = write_csv("age , overTime,attrition\n 30 , Yes ,No\n");
        let data = TrainingDataReader::new(f.path()).read().unwrap();
        assert_eq!(data.records()[0].age, Some(30.0));
        assert_eq!(data.records()[0].over_time, Some(CategoryValue::from("Yes")));
    }
}
