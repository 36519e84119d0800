//! Domain types shared by the model, the rule engines and the CLI.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::IoError;

/// Whether a record field is read as a number or as a category label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Numeric,
    Categorical,
}

/// Every HR field an [`EmployeeRecord`] knows, by wire name, with its kind.
pub const FIELDS: [(&str, FieldKind); 25] = [
    ("age", FieldKind::Numeric),
    ("businessTravel", FieldKind::Categorical),
    ("department", FieldKind::Categorical),
    ("distanceFromHome", FieldKind::Numeric),
    ("education", FieldKind::Numeric),
    ("educationField", FieldKind::Categorical),
    ("environmentSatisfaction", FieldKind::Numeric),
    ("gender", FieldKind::Categorical),
    ("jobInvolvement", FieldKind::Numeric),
    ("jobLevel", FieldKind::Numeric),
    ("jobRole", FieldKind::Categorical),
    ("jobSatisfaction", FieldKind::Numeric),
    ("maritalStatus", FieldKind::Categorical),
    ("monthlyIncome", FieldKind::Numeric),
    ("numCompaniesWorked", FieldKind::Numeric),
    ("overTime", FieldKind::Categorical),
    ("performanceRating", FieldKind::Numeric),
    ("relationshipSatisfaction", FieldKind::Numeric),
    ("stockOptionLevel", FieldKind::Numeric),
    ("trainingTimesLastYear", FieldKind::Numeric),
    ("workLifeBalance", FieldKind::Numeric),
    ("yearsAtCompany", FieldKind::Numeric),
    ("yearsInCurrentRole", FieldKind::Numeric),
    ("yearsSinceLastPromotion", FieldKind::Numeric),
    ("yearsWithCurrManager", FieldKind::Numeric),
];

/// Kind of a known field, `None` for names outside [`FIELDS`].
#[must_use]
pub fn field_kind(name: &str) -> Option<FieldKind> {
    FIELDS
        .iter()
        .find(|(field, _)| *field == name)
        .map(|&(_, kind)| kind)
}

/// A categorical cell as it arrives on the wire.
///
/// JSON callers send text most of the time, but the overtime flag also
/// shows up as a boolean or as 0/1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoryValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl CategoryValue {
    /// Lookup key for label encoding.
    ///
    /// Booleans become `"Yes"`/`"No"`, numbers use their shortest display
    /// form (`1.0` becomes `"1"`), text is kept verbatim.
    #[must_use]
    pub fn key(&self) -> String {
        match self {
            CategoryValue::Flag(true) => "Yes".to_string(),
            CategoryValue::Flag(false) => "No".to_string(),
            CategoryValue::Number(n) => n.to_string(),
            CategoryValue::Text(s) => s.clone(),
        }
    }

    /// `"Yes"`, `1` or `true`.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            CategoryValue::Flag(b) => *b,
            CategoryValue::Number(n) => *n == 1.0,
            CategoryValue::Text(s) => s == "Yes",
        }
    }

    /// Only the literal text `"Yes"`.
    #[must_use]
    pub fn is_yes_text(&self) -> bool {
        matches!(self, CategoryValue::Text(s) if s == "Yes")
    }
}

impl From<&str> for CategoryValue {
    fn from(value: &str) -> Self {
        CategoryValue::Text(value.to_string())
    }
}

impl From<bool> for CategoryValue {
    fn from(value: bool) -> Self {
        CategoryValue::Flag(value)
    }
}

/// Borrowed view of one populated field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Numeric(f64),
    Categorical(&'a CategoryValue),
}

/// One employee's HR attributes. Every field is optional; consumers decide
/// what an absent field means.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_travel: Option<CategoryValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<CategoryValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_from_home: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education_field: Option<CategoryValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_satisfaction: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<CategoryValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_involvement: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_role: Option<CategoryValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_satisfaction: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marital_status: Option<CategoryValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_income: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_companies_worked: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub over_time: Option<CategoryValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_satisfaction: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_option_level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_times_last_year: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_life_balance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub years_at_company: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub years_in_current_role: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub years_since_last_promotion: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub years_with_curr_manager: Option<f64>,
}

impl EmployeeRecord {
    /// Look up a field by wire name. `None` when absent or unknown.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        if let Some(slot) = self.categorical(name) {
            return slot.as_ref().map(FieldValue::Categorical);
        }
        let value = match name {
            "age" => self.age,
            "distanceFromHome" => self.distance_from_home,
            "education" => self.education,
            "environmentSatisfaction" => self.environment_satisfaction,
            "jobInvolvement" => self.job_involvement,
            "jobLevel" => self.job_level,
            "jobSatisfaction" => self.job_satisfaction,
            "monthlyIncome" => self.monthly_income,
            "numCompaniesWorked" => self.num_companies_worked,
            "performanceRating" => self.performance_rating,
            "relationshipSatisfaction" => self.relationship_satisfaction,
            "stockOptionLevel" => self.stock_option_level,
            "trainingTimesLastYear" => self.training_times_last_year,
            "workLifeBalance" => self.work_life_balance,
            "yearsAtCompany" => self.years_at_company,
            "yearsInCurrentRole" => self.years_in_current_role,
            "yearsSinceLastPromotion" => self.years_since_last_promotion,
            "yearsWithCurrManager" => self.years_with_curr_manager,
            _ => None,
        };
        value.map(FieldValue::Numeric)
    }

    fn categorical(&self, name: &str) -> Option<&Option<CategoryValue>> {
        match name {
            "businessTravel" => Some(&self.business_travel),
            "department" => Some(&self.department),
            "educationField" => Some(&self.education_field),
            "gender" => Some(&self.gender),
            "jobRole" => Some(&self.job_role),
            "maritalStatus" => Some(&self.marital_status),
            "overTime" => Some(&self.over_time),
            _ => None,
        }
    }

    fn numeric_slot(&mut self, name: &str) -> Option<&mut Option<f64>> {
        let slot = match name {
            "age" => &mut self.age,
            "distanceFromHome" => &mut self.distance_from_home,
            "education" => &mut self.education,
            "environmentSatisfaction" => &mut self.environment_satisfaction,
            "jobInvolvement" => &mut self.job_involvement,
            "jobLevel" => &mut self.job_level,
            "jobSatisfaction" => &mut self.job_satisfaction,
            "monthlyIncome" => &mut self.monthly_income,
            "numCompaniesWorked" => &mut self.num_companies_worked,
            "performanceRating" => &mut self.performance_rating,
            "relationshipSatisfaction" => &mut self.relationship_satisfaction,
            "stockOptionLevel" => &mut self.stock_option_level,
            "trainingTimesLastYear" => &mut self.training_times_last_year,
            "workLifeBalance" => &mut self.work_life_balance,
            "yearsAtCompany" => &mut self.years_at_company,
            "yearsInCurrentRole" => &mut self.years_in_current_role,
            "yearsSinceLastPromotion" => &mut self.years_since_last_promotion,
            "yearsWithCurrManager" => &mut self.years_with_curr_manager,
            _ => return None,
        };
        Some(slot)
    }

    fn categorical_slot(&mut self, name: &str) -> Option<&mut Option<CategoryValue>> {
        let slot = match name {
            "businessTravel" => &mut self.business_travel,
            "department" => &mut self.department,
            "educationField" => &mut self.education_field,
            "gender" => &mut self.gender,
            "jobRole" => &mut self.job_role,
            "maritalStatus" => &mut self.marital_status,
            "overTime" => &mut self.over_time,
            _ => return None,
        };
        Some(slot)
    }

    /// Store a numeric field. Returns `false` if `name` is not a numeric field.
    pub fn set_numeric(&mut self, name: &str, value: f64) -> bool {
        self.numeric_slot(name).map(|slot| *slot = Some(value)).is_some()
    }

    /// Store a categorical field. Returns `false` if `name` is not categorical.
    pub fn set_category(&mut self, name: &str, value: CategoryValue) -> bool {
        self.categorical_slot(name)
            .map(|slot| *slot = Some(value))
            .is_some()
    }

    /// Clear a field. Returns `false` for unknown names.
    pub fn clear(&mut self, name: &str) -> bool {
        if let Some(slot) = self.numeric_slot(name) {
            *slot = None;
            return true;
        }
        self.categorical_slot(name).map(|slot| *slot = None).is_some()
    }
}

/// Qualitative band of a 0-100 risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Urgent,
}

impl RiskLevel {
    /// `>= 75` urgent, `>= 60` high, `>= 40` medium, otherwise low.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 75.0 {
            RiskLevel::Urgent
        } else if score >= 60.0 {
            RiskLevel::High
        } else if score >= 40.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Urgent => "urgent",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Training table as read from CSV.
#[derive(Debug, Clone)]
pub struct TrainingData {
    /// Known HR fields present in the header, in header order.
    columns: Vec<String>,
    records: Vec<EmployeeRecord>,
    /// 1 = left, 0 = stayed.
    labels: Vec<usize>,
}

impl TrainingData {
    /// Assemble a table from parts; `records[i]` is labelled `labels[i]`.
    #[must_use]
    pub fn new(columns: Vec<String>, records: Vec<EmployeeRecord>, labels: Vec<usize>) -> Self {
        debug_assert_eq!(records.len(), labels.len());
        Self {
            columns,
            records,
            labels,
        }
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn records(&self) -> &[EmployeeRecord] {
        &self.records
    }

    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.records.len()
    }

    /// Number of rows labelled as leavers.
    #[must_use]
    pub fn n_leavers(&self) -> usize {
        self.labels.iter().filter(|&&l| l == 1).count()
    }
}

/// A validated name used as the prefix of report files.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportName(String);

impl ReportName {
    /// # Errors
    ///
    /// Returns [`IoError::InvalidReportName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: impl Into<String>) -> Result<Self, IoError> {
        let name = name.into();
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(IoError::InvalidReportName { name });
        }
        Ok(Self(name))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReportName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
