//! Retention strategies for an employee at a given risk score.
//!
//! Unlike the leave-reason rules, absent fields here fall back to a neutral
//! default: income 0, work-life balance 3, training 1, tenure 0,
//! job satisfaction 3 and performance rating 3.

use std::cmp::Reverse;

use attrition_io::{EmployeeRecord, RiskLevel};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::thresholds::{
    DEVELOPMENT_PLAN_TENURE_YEARS, HIGH_IMPACT_WEIGHT, LOW_SURVEY_SCORE, MAX_EFFECTIVENESS,
    MAX_STRATEGIES, RECOGNITION_RATING, SALARY_REVIEW_INCOME, STRATEGY_WEIGHT,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Cost {
    Low,
    Medium,
    High,
}

/// One recommended action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetentionStrategy {
    pub category: &'static str,
    pub action: &'static str,
    pub timeline: &'static str,
    pub impact: Impact,
    pub cost: Cost,
    /// 1 or 2.
    pub priority: u8,
}

/// How triggered strategies are ordered before truncation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyOrdering {
    /// Descending by `(priority, impact is high)`: priority 2 comes first.
    #[default]
    Literal,
    /// Priority 1 first, high impact first within a priority.
    UrgencyFirst,
}

/// Generator settings.
///
/// # Defaults
///
/// | Parameter  | Default   |
/// |------------|-----------|
/// | `ordering` | `Literal` |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionConfig {
    ordering: StrategyOrdering,
}

impl RetentionConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_ordering(mut self, ordering: StrategyOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    #[must_use]
    pub fn ordering(&self) -> StrategyOrdering {
        self.ordering
    }
}

/// Recommended actions for one employee.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetentionPlan {
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    /// At most five, in the configured order.
    pub strategies: Vec<RetentionStrategy>,
    /// Percentage, capped at 95; counts every triggered strategy.
    pub estimated_effectiveness: u32,
    /// Triggered strategies before truncation.
    pub total_strategies: usize,
}

const COMPENSATION: RetentionStrategy = RetentionStrategy {
    category: "Compensation",
    action: "Salary review and adjustment (+10-15% market rate comparison)",
    timeline: "Immediate (1-2 weeks)",
    impact: Impact::High,
    cost: Cost::High,
    priority: 1,
};

const WORK_LIFE_BALANCE: RetentionStrategy = RetentionStrategy {
    category: "Work-Life Balance",
    action: "Reduce overtime, implement flexible schedule, remote work options",
    timeline: "Short-term (2-4 weeks)",
    impact: Impact::High,
    cost: Cost::Low,
    priority: 1,
};

const CAREER_DEVELOPMENT: RetentionStrategy = RetentionStrategy {
    category: "Career Development",
    action: "Create personalized development plan, assign mentor, discuss promotion path",
    timeline: "Medium-term (1-3 months)",
    impact: Impact::High,
    cost: Cost::Medium,
    priority: 2,
};

const JOB_REDESIGN: RetentionStrategy = RetentionStrategy {
    category: "Job Redesign",
    action: "One-on-one discussion, role adjustment, task variety increase",
    timeline: "Short-term (2-4 weeks)",
    impact: Impact::High,
    cost: Cost::Low,
    priority: 1,
};

const RECOGNITION: RetentionStrategy = RetentionStrategy {
    category: "Recognition & Rewards",
    action: "Employee recognition program, spot bonuses, public acknowledgment",
    timeline: "Immediate (1 week)",
    impact: Impact::Medium,
    cost: Cost::Low,
    priority: 2,
};

/// Builds [`RetentionPlan`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetentionStrategyGenerator {
    config: RetentionConfig,
}

impl RetentionStrategyGenerator {
    #[must_use]
    pub fn new(config: RetentionConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &RetentionConfig {
        &self.config
    }

    /// Plan for `record` at `risk_score` (0–100, as produced by prediction).
    #[must_use]
    pub fn generate(&self, record: &EmployeeRecord, risk_score: f64) -> RetentionPlan {
        let mut strategies = triggered(record);
        match self.config.ordering {
            StrategyOrdering::Literal => {
                strategies.sort_by_key(|s| Reverse((s.priority, s.impact == Impact::High)));
            }
            StrategyOrdering::UrgencyFirst => {
                strategies.sort_by_key(|s| (s.priority, Reverse(s.impact)));
            }
        }

        let total = strategies.len();
        let high_impact = strategies.iter().filter(|s| s.impact == Impact::High).count();
        let estimated_effectiveness = (high_impact as u32 * HIGH_IMPACT_WEIGHT
            + total as u32 * STRATEGY_WEIGHT)
            .min(MAX_EFFECTIVENESS);
        strategies.truncate(MAX_STRATEGIES);
        debug!(total, estimated_effectiveness, "retention strategies generated");

        RetentionPlan {
            risk_score,
            risk_level: RiskLevel::from_score(risk_score),
            strategies,
            estimated_effectiveness,
            total_strategies: total,
        }
    }
}

/// Shorthand for [`RetentionStrategyGenerator::generate`] with default settings.
#[must_use]
pub fn generate(record: &EmployeeRecord, risk_score: f64) -> RetentionPlan {
    RetentionStrategyGenerator::default().generate(record, risk_score)
}

fn triggered(record: &EmployeeRecord) -> Vec<RetentionStrategy> {
    let overtime = record.over_time.as_ref().is_some_and(|v| v.is_yes_text());
    let checks = [
        (record.monthly_income.unwrap_or(0.0) < SALARY_REVIEW_INCOME, COMPENSATION),
        (
            overtime || record.work_life_balance.unwrap_or(3.0) <= LOW_SURVEY_SCORE,
            WORK_LIFE_BALANCE,
        ),
        (
            record.training_times_last_year.unwrap_or(1.0) == 0.0
                || record.years_at_company.unwrap_or(0.0) >= DEVELOPMENT_PLAN_TENURE_YEARS,
            CAREER_DEVELOPMENT,
        ),
        (record.job_satisfaction.unwrap_or(3.0) <= LOW_SURVEY_SCORE, JOB_REDESIGN),
        (record.performance_rating.unwrap_or(3.0) >= RECOGNITION_RATING, RECOGNITION),
    ];
    checks
        .into_iter()
        .filter_map(|(fired, strategy)| fired.then_some(strategy))
        .collect()
}
