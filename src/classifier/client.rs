use async_trait::async_trait;
use reqwest::Client;
use tokio::time::timeout;
use url::Url;

use crate::{config::BackendConfig, domain::ClassificationResult};

use super::wire::{
    parse_predict, ClassificationError, HealthStatus, PredictRequest, Prediction, PREDICT_PATH,
};

#[async_trait]
pub trait ClassificationClient: Send + Sync {
    async fn classify(&self, url: &str) -> Result<Prediction, ClassificationError>;
}

/// Classifies `url`, degrading every failure to `Label::Error`.
pub async fn classify_or_fail_open(
    client: &dyn ClassificationClient,
    url: &str,
) -> ClassificationResult {
    match client.classify(url).await {
        Ok(prediction) => {
            if let Some(note) = prediction.note.as_deref() {
                tracing::warn!(target: "classifier", url, note, "classifier attached a note");
            }
            prediction.result
        }
        Err(err) => {
            tracing::warn!(
                target: "classifier",
                url,
                error = %err,
                "classification unavailable; failing open"
            );
            ClassificationResult::error()
        }
    }
}

#[derive(Clone)]
pub struct HttpClassifier {
    http: Client,
    config: BackendConfig,
    predict_url: Url,
}

impl HttpClassifier {
    pub fn new(http: Client, config: BackendConfig) -> Result<Self, url::ParseError> {
        let predict_url = config.base_url.join(PREDICT_PATH)?;
        Ok(Self {
            http,
            config,
            predict_url,
        })
    }

    pub async fn health(&self) -> Result<HealthStatus, ClassificationError> {
        let request = async {
            let status = self
                .http
                .get(self.config.base_url.clone())
                .send()
                .await?
                .error_for_status()?
                .json::<HealthStatus>()
                .await?;
            Ok::<_, ClassificationError>(status)
        };
        timeout(self.config.request_timeout, request)
            .await
            .map_err(|_| ClassificationError::Timeout(self.config.request_timeout))?
    }
}

#[async_trait]
impl ClassificationClient for HttpClassifier {
    async fn classify(&self, url: &str) -> Result<Prediction, ClassificationError> {
        let request = async {
            let response = self
                .http
                .post(self.predict_url.clone())
                .header(reqwest::header::ACCEPT, "application/json")
                .json(&PredictRequest { url })
                .send()
                .await?;
            let status = response.status();
            let body = response.text().await?;
            parse_predict(status, &body)
        };

        timeout(self.config.request_timeout, request)
            .await
            .map_err(|_| ClassificationError::Timeout(self.config.request_timeout))?
    }
}
