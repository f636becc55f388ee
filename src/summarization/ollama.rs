//! Ollama-backed summarization model.
//!
//! The client issues `POST /api/generate` requests directly against the runtime. The loader
//! confirms the configured model exists via `POST /api/show` before handing out a client, so
//! an absent runtime or model degrades the engine to its fallback at construction time.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

use super::{LengthBounds, ModelLoader, SummarizationClientError, SummarizationModel};

/// Summarization model served by an Ollama runtime.
pub struct OllamaSummarizationClient {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaSummarizationClient {
    /// Build a client for `model` served at `base_url`.
    pub fn new(base_url: String, model: String) -> Result<Self, SummarizationClientError> {
        let http = Client::builder()
            .user_agent("docsum/summary")
            .build()
            .map_err(|error| {
                SummarizationClientError::ProviderUnavailable(format!(
                    "failed to construct HTTP client: {error}"
                ))
            })?;
        Ok(Self {
            http,
            base_url,
            model,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Confirm the runtime is reachable and knows the configured model.
    pub async fn ensure_model(&self) -> Result<(), SummarizationClientError> {
        let response = self
            .http
            .post(self.endpoint("/api/show"))
            .json(&json!({ "model": self.model }))
            .send()
            .await
            .map_err(|error| {
                SummarizationClientError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(SummarizationClientError::ProviderUnavailable(format!(
                "model '{}' is not available in Ollama",
                self.model
            ))),
            status => Err(SummarizationClientError::ProviderUnavailable(format!(
                "Ollama returned {status} while checking model '{}'",
                self.model
            ))),
        }
    }
}

fn build_prompt(text: &str, bounds: LengthBounds) -> String {
    format!(
        "Summarize the following document in plain sentences. Use at least {min} and at most {max} words. Prefer neutral tone. Do not use lists or headings.\n\n{text}",
        min = bounds.min_length,
        max = bounds.max_length,
    )
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

#[async_trait]
impl SummarizationModel for OllamaSummarizationClient {
    async fn summarize(
        &self,
        text: &str,
        bounds: LengthBounds,
    ) -> Result<String, SummarizationClientError> {
        let payload = json!({
            "model": self.model,
            "prompt": build_prompt(text, bounds),
            "stream": false,
            "options": {
                // Lower temperature for deterministic summaries.
                "temperature": 0.1,
                "num_predict": bounds.max_length.saturating_mul(2),
            }
        });

        let response = self
            .http
            .post(self.endpoint("/api/generate"))
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                SummarizationClientError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(SummarizationClientError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404",
                self.endpoint("/api/generate")
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizationClientError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            SummarizationClientError::InvalidResponse(format!(
                "failed to decode Ollama response: {error}"
            ))
        })?;

        if !body.done {
            return Err(SummarizationClientError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.response.trim().to_string())
    }
}

/// Loader that builds an [`OllamaSummarizationClient`] after verifying the model.
pub struct OllamaModelLoader {
    base_url: String,
    model: String,
}

impl OllamaModelLoader {
    /// Create a loader for `model` served at `base_url`.
    pub fn new(base_url: String, model: String) -> Self {
        Self { base_url, model }
    }
}

#[async_trait]
impl ModelLoader for OllamaModelLoader {
    async fn load(&self) -> Result<Arc<dyn SummarizationModel>, SummarizationClientError> {
        let client = OllamaSummarizationClient::new(self.base_url.clone(), self.model.clone())?;
        client.ensure_model().await?;
        tracing::debug!(base_url = %self.base_url, model = %self.model, "Ollama model verified");
        Ok(Arc::new(client))
    }
}
