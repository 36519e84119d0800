//! Employee records, training-data CSV reading and JSON report writing.

mod domain;
mod error;
mod reader;
mod writer;

pub use domain::{
    CategoryValue, EmployeeRecord, FIELDS, FieldKind, FieldValue, ReportName, RiskLevel,
    TrainingData, field_kind,
};
pub use error::IoError;
pub use reader::{LABEL_COLUMN, TrainingDataReader};
pub use writer::{ReportKind, ReportWriter};
