// SPDX-FileCopyrightText: 2026 Tiller Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP semantic classifier.
//!
//! One non-streaming chat-completions call per ambiguous turn, no retries:
//! a slow or failing service must cost the turn at most one timeout.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use tiller_config::model::SemanticConfig;
use tiller_core::{Category, SemanticClassifier, TillerError};
use tracing::debug;

use crate::types::{ApiErrorResponse, ChatMessage, ChatRequest, ChatResponse};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn classifier_err(message: String, source: Option<BoxError>) -> TillerError {
    TillerError::Classifier { message, source }
}

/// Classifies text by asking a chat model to choose a category name.
#[derive(Debug, Clone)]
pub struct HttpSemanticClassifier {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl HttpSemanticClassifier {
    /// Builds a client from the `[semantic]` configuration section.
    pub fn new(config: &SemanticConfig) -> Result<Self, TillerError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = config.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", key.trim()))
                .map_err(|e| TillerError::Config(format!("invalid semantic.api_key: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| {
                classifier_err(format!("failed to build HTTP client: {e}"), Some(Box::new(e)))
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
        })
    }

    fn request(&self, text: &str, categories: &[Category]) -> ChatRequest {
        let names: Vec<&str> = categories.iter().map(Category::as_str).collect();
        let system = format!(
            "You label the task in the user's message. Answer with exactly one of: {}. \
             Use `simple` for greetings, chit-chat, and quick questions. \
             Reply with the label only.",
            names.join(", ")
        );
        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::system(system), ChatMessage::user(text)],
            temperature: 0.0,
            max_tokens: 8,
        }
    }
}

#[async_trait]
impl SemanticClassifier for HttpSemanticClassifier {
    async fn classify(&self, text: &str, categories: &[Category]) -> Result<String, TillerError> {
        let request = self.request(text, categories);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| classifier_err(format!("HTTP request failed: {e}"), Some(Box::new(e))))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            classifier_err(format!("failed to read response body: {e}"), Some(Box::new(e)))
        })?;
        debug!(status = %status, "semantic classifier response received");

        if !status.is_success() {
            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_err) => format!(
                    "classifier API error ({}): {}",
                    api_err.error.type_.as_deref().unwrap_or("unknown"),
                    api_err.error.message
                ),
                Err(_) => format!("classifier API returned {status}: {body}"),
            };
            return Err(classifier_err(message, None));
        }

        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            classifier_err(format!("failed to parse classifier response: {e}"), Some(Box::new(e)))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|content| content.trim().to_string())
            .filter(|label| !label.is_empty())
            .ok_or_else(|| classifier_err("classifier returned no content".to_string(), None))
    }
}
