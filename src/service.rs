//! Request/response facade over the model session and the rule engines.
//!
//! Every operation returns an [`Envelope`] so callers see one shape for
//! success and failure alike.

use std::error::Error as _;
use std::path::PathBuf;

use attrition_io::EmployeeRecord;
use attrition_model::{
    ErrorKind, ModelError, ModelInfo, ModelSession, PredictionOutput, SessionStatus,
    TrainingConfig, TrainingMetrics,
};
use attrition_rules::{
    LeaveReasonAnalysis, RetentionConfig, RetentionPlan, RetentionStrategyGenerator, analyze,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// `{success, data?, error?}` wrapper around every service response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}

impl<T> Envelope<T> {
    #[must_use]
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Failure envelope; the message includes the error's source chain.
    #[must_use]
    pub fn err(error: &ModelError) -> Self {
        let mut message = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        warn!(kind = %error.kind(), %message, "request failed");
        Self {
            success: false,
            data: None,
            error: Some(ErrorBody {
                kind: error.kind(),
                message,
            }),
        }
    }

    #[must_use]
    pub fn from_result(result: Result<T, ModelError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::err(&e),
        }
    }
}

/// Prediction input: a bare employee, a list, or `{"employees": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictRequest {
    Batch(Vec<EmployeeRecord>),
    Employees { employees: Vec<EmployeeRecord> },
    Single(EmployeeRecord),
}

impl PredictRequest {
    #[must_use]
    pub fn records(&self) -> &[EmployeeRecord] {
        match self {
            PredictRequest::Batch(records) | PredictRequest::Employees { employees: records } => {
                records
            }
            PredictRequest::Single(record) => std::slice::from_ref(record),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainRequest {
    pub csv_path: PathBuf,
    /// Overrides the service's configured holdout fraction.
    #[serde(default)]
    pub test_fraction: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionRequest {
    pub employee: EmployeeRecord,
    #[serde(default)]
    pub risk_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainResponse {
    pub message: String,
    pub metrics: TrainingMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    #[serde(flatten)]
    pub session: SessionStatus,
}

/// Parse a JSON request body, reporting malformed input as a validation error.
///
/// # Errors
///
/// [`ModelError::Validation`] when `json` does not match `T`.
pub fn parse_request<T: for<'de> Deserialize<'de>>(json: &str) -> Result<T, ModelError> {
    serde_json::from_str(json).map_err(|e| ModelError::Validation {
        message: format!("malformed request: {e}"),
    })
}

/// The attrition engine behind one model directory.
pub struct AttritionService {
    session: ModelSession,
    training: TrainingConfig,
    retention: RetentionStrategyGenerator,
}

impl AttritionService {
    /// Serve from `model_dir`, loading an existing bundle if there is one.
    #[must_use]
    pub fn open(model_dir: impl Into<PathBuf>) -> Self {
        Self::with_session(ModelSession::open(model_dir))
    }

    #[must_use]
    pub fn with_session(session: ModelSession) -> Self {
        Self {
            session,
            training: TrainingConfig::default(),
            retention: RetentionStrategyGenerator::default(),
        }
    }

    #[must_use]
    pub fn with_training_config(mut self, training: TrainingConfig) -> Self {
        self.training = training;
        self
    }

    #[must_use]
    pub fn with_retention_config(mut self, retention: RetentionConfig) -> Self {
        self.retention = RetentionStrategyGenerator::new(retention);
        self
    }

    #[must_use]
    pub fn session(&self) -> &ModelSession {
        &self.session
    }

    /// Score one employee or a batch. A batch of one yields a single object.
    /// An empty employee object is rejected before the model is consulted.
    pub fn predict(&self, request: &PredictRequest) -> Envelope<PredictionOutput> {
        let result = match request {
            PredictRequest::Single(record) => require_employee(record)
                .and_then(|()| self.session.predictor())
                .and_then(|predictor| predictor.predict(record).map(PredictionOutput::Single)),
            batch => self
                .session
                .predictor()
                .and_then(|predictor| predictor.predict_many(batch.records())),
        };
        Envelope::from_result(result)
    }

    /// Leave reasons for one employee.
    pub fn analyze(&self, employee: &EmployeeRecord) -> Envelope<LeaveReasonAnalysis> {
        Envelope::from_result(require_employee(employee).map(|()| analyze(employee)))
    }

    /// Retention plan for one employee at the given risk score.
    pub fn generate_strategies(&self, request: &RetentionRequest) -> Envelope<RetentionPlan> {
        Envelope::from_result(
            require_employee(&request.employee)
                .map(|()| self.retention.generate(&request.employee, request.risk_score)),
        )
    }

    /// Train on a CSV file, publish the bundle and start serving it.
    #[instrument(skip_all, fields(csv = %request.csv_path.display()))]
    pub fn train(&self, request: &TrainRequest) -> Envelope<TrainResponse> {
        let config = match request.test_fraction {
            Some(fraction) => self.training.clone().with_test_fraction(fraction),
            None => self.training.clone(),
        };
        let result = self.session.retrain(&request.csv_path, &config).map(|metrics| {
            info!(accuracy = metrics.accuracy, "training request completed");
            TrainResponse {
                message: "Model trained successfully".to_string(),
                metrics,
            }
        });
        Envelope::from_result(result)
    }

    /// Features and importances of the live model.
    pub fn model_info(&self) -> Envelope<ModelInfo> {
        Envelope::from_result(
            self.session
                .current()
                .map(|bundle| bundle.info())
                .ok_or(ModelError::ModelNotLoaded),
        )
    }

    #[must_use]
    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            status: "healthy",
            session: self.session.status(),
        }
    }
}

fn require_employee(employee: &EmployeeRecord) -> Result<(), ModelError> {
    if *employee == EmployeeRecord::default() {
        return Err(ModelError::Validation {
            message: "no employee data provided".to_string(),
        });
    }
    Ok(())
}
