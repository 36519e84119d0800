//! Canonical feature order.

use attrition_io::{FIELDS, FieldKind, field_kind};

/// Known HR fields present in `columns`, in canonical model order.
///
/// The canonical order is fixed, so two tables with the same columns in a
/// different header order yield the same feature layout.
#[must_use]
pub fn feature_columns(columns: &[String]) -> Vec<String> {
    FIELDS
        .iter()
        .filter(|(name, _)| columns.iter().any(|c| c == name))
        .map(|(name, _)| (*name).to_string())
        .collect()
}

/// Whether `name` is label-encoded rather than passed through.
#[must_use]
pub fn is_categorical(name: &str) -> bool {
    field_kind(name) == Some(FieldKind::Categorical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_order_ignores_header_order() {
        let header: Vec<String> = ["overTime", "employeeNumber", "age", "jobRole"]
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(feature_columns(&header), vec!["age", "jobRole", "overTime"]);
    }

    #[test]
    fn categorical_columns() {
        for name in [
            "businessTravel",
            "department",
            "educationField",
            "gender",
            "jobRole",
            "maritalStatus",
            "overTime",
        ] {
            assert!(is_categorical(name), "{name}");
        }
        assert!(!is_categorical("monthlyIncome"));
        assert!(!is_categorical("attrition"));
    }
}
