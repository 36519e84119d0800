//! Why an employee might leave, derived from raw HR fields.
//!
//! Each rule looks at one field and fires only when the field is present;
//! an absent field never produces a reason.

use attrition_io::EmployeeRecord;
use serde::Serialize;
use tracing::debug;

use crate::thresholds::{
    BELOW_MARKET_RATIO, LONG_COMMUTE_DISTANCE, LOW_SURVEY_SCORE, MARKET_MONTHLY_INCOME,
    STALLED_PROMOTION_YEARS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Moderate,
    Major,
    Critical,
}

/// One triggered rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaveReason {
    pub category: &'static str,
    pub reason: &'static str,
    pub severity: Severity,
    /// 0–100.
    pub impact: u8,
    pub preventable: bool,
}

/// All reasons for one employee, highest impact first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaveReasonAnalysis {
    pub total_reasons: usize,
    pub reasons: Vec<LeaveReason>,
    /// Percentage of reasons that are preventable; 0 with no reasons.
    pub preventability_score: f64,
}

struct Rule {
    category: &'static str,
    reason: &'static str,
    impact: u8,
    preventable: bool,
    /// Severity if the rule fires.
    check: fn(&EmployeeRecord) -> Option<Severity>,
}

fn when(fired: bool, severity: Severity) -> Option<Severity> {
    fired.then_some(severity)
}

const RULES: [Rule; 9] = [
    Rule {
        category: "Job Satisfaction",
        reason: "Low job satisfaction indicates employee is unhappy with their role",
        impact: 85,
        preventable: true,
        check: |r| {
            let score = r.job_satisfaction.filter(|s| *s <= LOW_SURVEY_SCORE)?;
            Some(if score == 1.0 {
                Severity::Critical
            } else {
                Severity::Major
            })
        },
    },
    Rule {
        category: "Work-Life Balance",
        reason: "Poor work-life balance causing stress and burnout",
        impact: 80,
        preventable: true,
        check: |r| when(r.work_life_balance? <= LOW_SURVEY_SCORE, Severity::Critical),
    },
    Rule {
        category: "Overtime",
        reason: "Frequent overtime leading to exhaustion",
        impact: 70,
        preventable: true,
        check: |r| when(r.over_time.as_ref()?.is_truthy(), Severity::Major),
    },
    Rule {
        category: "Compensation",
        reason: "Below-market compensation",
        impact: 90,
        preventable: true,
        check: |r| {
            when(
                r.monthly_income? < MARKET_MONTHLY_INCOME * BELOW_MARKET_RATIO,
                Severity::Critical,
            )
        },
    },
    Rule {
        category: "Career Growth",
        reason: "No career advancement in 5+ years",
        impact: 75,
        preventable: true,
        check: |r| {
            when(
                r.years_since_last_promotion? >= STALLED_PROMOTION_YEARS,
                Severity::Major,
            )
        },
    },
    Rule {
        category: "Commute",
        reason: "Long commute distance causing daily stress",
        impact: 50,
        preventable: false,
        check: |r| when(r.distance_from_home? > LONG_COMMUTE_DISTANCE, Severity::Moderate),
    },
    Rule {
        category: "Work Environment",
        reason: "Poor workplace environment satisfaction",
        impact: 65,
        preventable: true,
        check: |r| when(r.environment_satisfaction? <= LOW_SURVEY_SCORE, Severity::Major),
    },
    Rule {
        category: "Relationships",
        reason: "Poor workplace relationships",
        impact: 60,
        preventable: true,
        check: |r| when(r.relationship_satisfaction? <= LOW_SURVEY_SCORE, Severity::Moderate),
    },
    Rule {
        category: "Professional Development",
        reason: "No training or skill development opportunities",
        impact: 55,
        preventable: true,
        check: |r| when(r.training_times_last_year? == 0.0, Severity::Moderate),
    },
];

/// Run every rule against `record`.
#[must_use]
pub fn analyze(record: &EmployeeRecord) -> LeaveReasonAnalysis {
    let mut reasons: Vec<LeaveReason> = RULES
        .iter()
        .filter_map(|rule| {
            (rule.check)(record).map(|severity| LeaveReason {
                category: rule.category,
                reason: rule.reason,
                severity,
                impact: rule.impact,
                preventable: rule.preventable,
            })
        })
        .collect();
    reasons.sort_by(|a, b| b.impact.cmp(&a.impact));

    let preventable = reasons.iter().filter(|r| r.preventable).count();
    let preventability_score = preventable as f64 / reasons.len().max(1) as f64 * 100.0;
    debug!(n_reasons = reasons.len(), preventability_score, "leave reasons analysed");

    LeaveReasonAnalysis {
        total_reasons: reasons.len(),
        reasons,
        preventability_score,
    }
}
