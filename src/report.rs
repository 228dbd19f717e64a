use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::time::timeout;
use url::Url;

use crate::config::BackendConfig;

pub const REPORT_PATH: &str = "report";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Please enter a description.")]
    EmptyDescription,
    #[error("screenshot is not valid base64: {0}")]
    InvalidScreenshot(#[from] base64::DecodeError),
    /// Message from the report service, passed to the UI as is.
    #[error("{0}")]
    Rejected(String),
    #[error("report service returned HTTP {0}")]
    Status(StatusCode),
    #[error("report service did not answer within {0:?}")]
    Timeout(Duration),
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected report response: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub url: String,
    pub description: String,
    #[serde(default)]
    pub screenshot: Option<String>,
}

impl ReportRequest {
    pub fn validate(&self) -> Result<(), ReportError> {
        if self.description.trim().is_empty() {
            return Err(ReportError::EmptyDescription);
        }
        if let Some(screenshot) = &self.screenshot {
            STANDARD.decode(screenshot)?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ReportResponse {
    #[serde(default)]
    report_id: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

pub struct ReportClient {
    http: Client,
    report_url: Url,
    timeout: Duration,
}

impl ReportClient {
    pub fn new(http: Client, config: &BackendConfig) -> Result<Self, url::ParseError> {
        Ok(Self {
            http,
            report_url: config.base_url.join(REPORT_PATH)?,
            timeout: config.report_timeout,
        })
    }

    /// Submits a user report and returns the id assigned by the service.
    pub async fn submit(&self, report: &ReportRequest) -> Result<String, ReportError> {
        report.validate()?;

        let request = async {
            let response = self.http.post(self.report_url.clone()).json(report).send().await?;
            let status = response.status();
            let body = response.text().await?;
            parse_report_response(status, &body)
        };

        let report_id = timeout(self.timeout, request)
            .await
            .map_err(|_| ReportError::Timeout(self.timeout))??;
        tracing::info!(target: "report", url = %report.url, report_id = %report_id, "report submitted");
        Ok(report_id)
    }
}

fn parse_report_response(status: StatusCode, body: &str) -> Result<String, ReportError> {
    let parsed = serde_json::from_str::<ReportResponse>(body);
    match parsed {
        Ok(ReportResponse {
            error: Some(error), ..
        }) => Err(ReportError::Rejected(error)),
        Ok(_) if !status.is_success() => Err(ReportError::Status(status)),
        Ok(ReportResponse {
            report_id: Some(Value::String(id)),
            ..
        }) => Ok(id),
        Ok(ReportResponse {
            report_id: Some(Value::Number(id)),
            ..
        }) => Ok(id.to_string()),
        Ok(_) => Err(ReportError::Malformed("missing report_id".into())),
        Err(_) if !status.is_success() => Err(ReportError::Status(status)),
        Err(err) => Err(ReportError::Malformed(err.to_string())),
    }
}
