use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontierError {
    #[error("Invalid input: {field} — {reason}")]
    Validation { field: String, reason: String },

    #[error("Unusable price history{}: {reason}", ticker_suffix(.ticker))]
    Data {
        ticker: Option<String>,
        reason: String,
    },

    #[error("Optimization failed ({objective}, {constraints}): {reason}")]
    Optimization {
        objective: String,
        constraints: String,
        reason: String,
    },

    #[error("Numeric invariant violated in {context} (value: {value})")]
    Numeric { context: String, value: f64 },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

fn ticker_suffix(ticker: &Option<String>) -> String {
    ticker
        .as_ref()
        .map(|t| format!(" for {}", t))
        .unwrap_or_default()
}

/// Machine-readable failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ValidationError,
    DataError,
    OptimizationError,
    NumericError,
    SerializationError,
}

/// Structured form of a [`FrontierError`] for transport layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
    pub details: serde_json::Value,
}

impl FrontierError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        FrontierError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn data(ticker: Option<&str>, reason: impl Into<String>) -> Self {
        FrontierError::Data {
            ticker: ticker.map(str::to_string),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FrontierError::Validation { .. } => ErrorKind::ValidationError,
            FrontierError::Data { .. } => ErrorKind::DataError,
            FrontierError::Optimization { .. } => ErrorKind::OptimizationError,
            FrontierError::Numeric { .. } => ErrorKind::NumericError,
            FrontierError::Serialization(_) => ErrorKind::SerializationError,
        }
    }

    pub fn report(&self) -> ErrorReport {
        let details = match self {
            FrontierError::Validation { field, reason } => {
                serde_json::json!({ "field": field, "reason": reason })
            }
            FrontierError::Data { ticker, reason } => {
                serde_json::json!({ "ticker": ticker, "reason": reason })
            }
            FrontierError::Optimization {
                objective,
                constraints,
                reason,
            } => serde_json::json!({
                "objective": objective,
                "constraints": constraints,
                "reason": reason,
            }),
            FrontierError::Numeric { context, value } => {
                // NaN/inf are not representable in JSON
                let value = if value.is_finite() {
                    serde_json::json!(value)
                } else {
                    serde_json::json!(value.to_string())
                };
                serde_json::json!({ "context": context, "value": value })
            }
            FrontierError::Serialization(msg) => serde_json::json!({ "reason": msg }),
        };
        ErrorReport {
            kind: self.kind(),
            message: self.to_string(),
            details,
        }
    }
}

impl From<serde_json::Error> for FrontierError {
    fn from(e: serde_json::Error) -> Self {
        FrontierError::Serialization(e.to_string())
    }
}
