//! Employee attrition risk engine.
//!
//! The heavy lifting lives in the workspace crates; this crate ties them
//! together behind [`AttritionService`] and ships the `attrition` CLI.

pub mod service;

pub use service::{
    AttritionService, Envelope, ErrorBody, HealthStatus, PredictRequest, RetentionRequest,
    TrainRequest, TrainResponse, parse_request,
};
