//! Cut-offs shared by the rule engines.
//!
//! Satisfaction-style fields use the 1–4 HR survey scale.

/// Survey score at or below which a satisfaction field counts as low.
pub const LOW_SURVEY_SCORE: f64 = 2.0;

/// Industry average monthly income used as the compensation benchmark.
pub const MARKET_MONTHLY_INCOME: f64 = 6500.0;

/// Share of the benchmark below which pay counts as below market.
pub const BELOW_MARKET_RATIO: f64 = 0.8;

/// Years without promotion that count as stalled career growth.
pub const STALLED_PROMOTION_YEARS: f64 = 5.0;

/// Commute distance above which the commute is a risk factor.
pub const LONG_COMMUTE_DISTANCE: f64 = 20.0;

/// Monthly income below which a salary review is recommended.
pub const SALARY_REVIEW_INCOME: f64 = 5000.0;

/// Tenure at which a development plan is recommended.
pub const DEVELOPMENT_PLAN_TENURE_YEARS: f64 = 5.0;

/// Performance rating at which recognition is recommended.
pub const RECOGNITION_RATING: f64 = 3.0;

/// Impact points per high-impact strategy in the effectiveness estimate.
pub const HIGH_IMPACT_WEIGHT: u32 = 25;

/// Points per triggered strategy in the effectiveness estimate.
pub const STRATEGY_WEIGHT: u32 = 10;

/// Ceiling of the effectiveness estimate.
pub const MAX_EFFECTIVENESS: u32 = 95;

/// Strategies returned per employee.
pub const MAX_STRATEGIES: usize = 5;
