//! reqwest-backed transport implementing the remote wire contract: one POST
//! per record with Basic auth, a unique `X-Request-Id` header per attempt,
//! and the structured record as the JSON body.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::config::ApiConfig;
use crate::domain::model::{StructuredRecord, SubmitResponse};
use crate::domain::ports::RecordSubmitter;
use crate::utils::error::{ConfigError, SubmitError};

pub struct HttpSubmitter {
    client: Client,
    endpoint: String,
    client_id: String,
    client_secret: String,
    timeout: Duration,
}

impl HttpSubmitter {
    pub fn new(config: &ApiConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: config.api_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            timeout: config.timeout,
        })
    }

    fn classify(&self, error: reqwest::Error) -> SubmitError {
        if error.is_timeout() {
            SubmitError::Timeout(self.timeout.as_secs())
        } else if error.is_connect() {
            SubmitError::Connection(error.to_string())
        } else {
            SubmitError::Transport(error.to_string())
        }
    }
}

#[async_trait]
impl RecordSubmitter for HttpSubmitter {
    async fn submit(
        &self,
        request_id: &str,
        record: &StructuredRecord,
    ) -> Result<SubmitResponse, SubmitError> {
        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header("X-Request-Id", request_id)
            .json(record)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status().as_u16();
        // Empty or non-JSON bodies are fine; the status code decides.
        let body = response.json::<Value>().await.ok();
        Ok(SubmitResponse { status, body })
    }
}
