//! HTTP clients for the NLP and vision collaborators.
//!
//! One client type serves all three endpoints; the trait impls differ only in
//! the request/response payloads. These services are best-effort — callers in
//! [`crate::features`] and [`crate::memory::engine`] catch errors and degrade.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{
    EntityTagger, PhotoDescription, Sentiment, SentimentAnalyzer, TaggedToken, VisionProvider,
};

#[derive(Debug, Serialize)]
struct TextRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct TagResponse {
    tokens: Vec<TaggedToken>,
}

#[derive(Debug, Serialize)]
struct DescribeRequest<'a> {
    url: &'a str,
}

/// A JSON-over-HTTP client for one collaborator endpoint.
pub struct RemoteNlpClient {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl RemoteNlpClient {
    pub fn new(endpoint: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    fn post<Req: Serialize, Resp: serde::de::DeserializeOwned>(&self, req: &Req) -> Result<Resp> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(req)
            .send()
            .with_context(|| format!("collaborator unreachable at {}", self.endpoint))?;

        anyhow::ensure!(
            response.status().is_success(),
            "collaborator returned HTTP {}",
            response.status()
        );

        response.json().context("malformed collaborator response")
    }
}

impl EntityTagger for RemoteNlpClient {
    fn tag(&self, text: &str) -> Result<Vec<TaggedToken>> {
        let body: TagResponse = self.post(&TextRequest { text })?;
        Ok(body.tokens)
    }
}

impl SentimentAnalyzer for RemoteNlpClient {
    fn analyze(&self, text: &str) -> Result<Sentiment> {
        self.post(&TextRequest { text })
    }
}

impl VisionProvider for RemoteNlpClient {
    fn describe(&self, photo_url: &str) -> Result<PhotoDescription> {
        self.post(&DescribeRequest { url: photo_url })
    }
}
