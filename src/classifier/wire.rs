use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ClassificationResult, Label};

pub const PREDICT_PATH: &str = "predict";

#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("classifier did not answer within {0:?}")]
    Timeout(std::time::Duration),
    #[error("classifier request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("classifier returned HTTP {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("classifier reported an error: {0}")]
    Service(String),
    #[error("unexpected classifier response: {0}")]
    Malformed(String),
}

#[derive(Debug, Serialize)]
pub struct PredictRequest<'a> {
    pub url: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct PredictResponse {
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// A successful classification plus the optional note the service attaches
/// when it falls back to a placeholder model.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub result: ClassificationResult,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub model_loaded: Option<bool>,
}

pub fn parse_predict(status: StatusCode, body: &str) -> Result<Prediction, ClassificationError> {
    let parsed = serde_json::from_str::<PredictResponse>(body);

    if !status.is_success() {
        let message = parsed
            .ok()
            .and_then(|resp| resp.error)
            .unwrap_or_else(|| truncate(body, 200));
        return Err(ClassificationError::Status { status, message });
    }

    let response = parsed.map_err(|err| ClassificationError::Malformed(err.to_string()))?;
    if let Some(error) = response.error {
        return Err(ClassificationError::Service(error));
    }

    let label = match response.result.as_deref() {
        Some("Legitimate") => Label::Legitimate,
        Some("Phishing") => Label::Phishing,
        Some(other) => {
            return Err(ClassificationError::Malformed(format!(
                "unknown result label {other:?}"
            )))
        }
        None => return Err(ClassificationError::Malformed("missing result".into())),
    };
    let confidence = response
        .confidence
        .ok_or_else(|| ClassificationError::Malformed("missing confidence".into()))?;

    Ok(Prediction {
        result: ClassificationResult { label, confidence },
        note: response.note,
    })
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
