//! HTTP embedding service client.
//!
//! Implements [`EmbeddingProvider`] against a JSON embedding endpoint. The
//! request carries the model identifier and input text; the response is the
//! raw (not necessarily normalized) vector. A dimension mismatch between the
//! response and the configured dimension is an error — it signals model
//! version skew, never something to truncate or pad over.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::EmbeddingProvider;
use crate::config::EmbeddingConfig;

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// Embedding provider backed by an external HTTP service.
pub struct RemoteEmbeddingProvider {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    dimensions: usize,
}

impl RemoteEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        anyhow::ensure!(
            config.dimensions > 0,
            "embedding dimensions must be positive, got {}",
            config.dimensions
        );

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }
}

impl EmbeddingProvider for RemoteEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&EmbedRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .with_context(|| format!("embedding service unreachable at {}", self.endpoint))?;

        anyhow::ensure!(
            response.status().is_success(),
            "embedding service returned HTTP {}",
            response.status()
        );

        let body: EmbedResponse = response
            .json()
            .context("malformed embedding service response")?;

        anyhow::ensure!(
            body.embedding.len() == self.dimensions,
            "embedding dimension mismatch: service returned {}, configured {}",
            body.embedding.len(),
            self.dimensions
        );

        Ok(body.embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
