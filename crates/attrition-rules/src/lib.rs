//! Deterministic HR rule engines: why an employee might leave, and what to
//! do about it. Neither engine touches the trained model, and neither fails
//! on a well-formed record.

mod leave_reasons;
mod retention;
pub mod thresholds;

pub use leave_reasons::{LeaveReason, LeaveReasonAnalysis, Severity, analyze};
pub use retention::{
    Cost, Impact, RetentionConfig, RetentionPlan, RetentionStrategy, RetentionStrategyGenerator,
    StrategyOrdering, generate,
};
