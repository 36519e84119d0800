//! Integration tests: fixture CSV -> records -> JSON report -> deserialize.

use std::fs;
use std::path::{Path, PathBuf};

use attrition_io::{
    EmployeeRecord, FIELDS, ReportKind, ReportName, ReportWriter, TrainingDataReader,
};
use tempfile::TempDir;

fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn fixture_has_every_hr_field() {
    let data = TrainingDataReader::new(&fixture_path("hr_sample.csv"))
        .read()
        .expect("fixture should parse");

    assert_eq!(data.n_samples(), 12);
    assert_eq!(data.n_leavers(), 3);
    assert_eq!(data.columns().len(), FIELDS.len());
    for record in data.records() {
        for (name, _) in FIELDS {
            assert!(record.field(name).is_some(), "missing {name}");
        }
    }
}

#[test]
fn records_survive_a_report_round_trip() {
    let data = TrainingDataReader::new(&fixture_path("hr_sample.csv"))
        .read()
        .unwrap();

    let dir = TempDir::new().unwrap();
    let writer = ReportWriter::new(dir.path(), ReportName::new("fixture_rt").unwrap()).unwrap();
    let path = writer.write(ReportKind::Analyze, &data.records()).unwrap();

    let content: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let reread: Vec<EmployeeRecord> =
        serde_json::from_value(content["payload"].clone()).unwrap();
    assert_eq!(reread.as_slice(), data.records());

    // Wire names are camelCase.
    assert!(content["payload"][0].get("yearsWithCurrManager").is_some());
    assert!(content["payload"][0].get("years_with_curr_manager").is_none());
}
