//! Client for the Quest store Graph endpoint.
//!
//! All store reads go through one GraphQL endpoint that takes the query
//! document id, a forced locale, and a JSON-encoded `variables` object as
//! query parameters. Responses arrive as `{data: {node: ...}}` envelopes.

pub mod catalog;
pub mod config;
pub mod detail;

use crate::headsets::Headset;
use crate::http::build_client;
use crate::scraper::CatalogSource;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct MetaClient {
    graph_url: String,
    access_token: String,
    http: Client,
}

#[derive(Debug, Error)]
pub enum MetaError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("invalid response: {0}")]
    Deserialize(String),
    #[error("response missing `{0}`")]
    Missing(&'static str),
}

#[derive(Debug, Deserialize)]
struct GraphEnvelope<T> {
    data: Option<GraphData<T>>,
}

#[derive(Debug, Deserialize)]
struct GraphData<T> {
    node: Option<T>,
}

impl MetaClient {
    pub fn from_env() -> Option<Self> {
        let access_token = std::env::var("OCULUS_ACCESS_TOKEN").ok()?;
        Some(Self {
            graph_url: config::GRAPH_URL.clone(),
            access_token,
            http: build_client(),
        })
    }

    /// POSTs one query and unwraps the `data.node` envelope.
    pub(crate) async fn post_query<T, V>(
        &self,
        doc_id: Option<&str>,
        forced_locale: &str,
        variables: &V,
    ) -> Result<T, MetaError>
    where
        T: DeserializeOwned,
        V: Serialize,
    {
        let variables =
            serde_json::to_string(variables).map_err(|err| MetaError::Request(err.to_string()))?;
        let mut params = vec![
            ("access_token", self.access_token.clone()),
            ("forced_locale", forced_locale.to_string()),
            ("variables", variables),
        ];
        if let Some(doc_id) = doc_id {
            params.push(("doc_id", doc_id.to_string()));
        }

        let response = self
            .http
            .post(&self.graph_url)
            .query(&params)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|err| MetaError::Request(err.to_string()))?;

        if !response.status().is_success() {
            return Err(MetaError::Request(format!("HTTP {}", response.status())));
        }

        let envelope: GraphEnvelope<T> = response
            .json()
            .await
            .map_err(|err| MetaError::Deserialize(err.to_string()))?;
        envelope
            .data
            .and_then(|data| data.node)
            .ok_or(MetaError::Missing("data.node"))
    }

    /// Plain byte download for cover images; not a Graph query.
    pub async fn cover_image(&self, uri: &str) -> Result<Vec<u8>, MetaError> {
        let response = self
            .http
            .get(uri)
            .send()
            .await
            .map_err(|err| MetaError::Request(err.to_string()))?;
        if !response.status().is_success() {
            return Err(MetaError::Request(format!("HTTP {}", response.status())));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|err| MetaError::Request(err.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl CatalogSource for MetaClient {
    async fn applications_count(&self, headset: &Headset) -> Result<u64, MetaError> {
        MetaClient::applications_count(self, headset).await
    }

    async fn applications_page(
        &self,
        headset: &Headset,
        page_size: u64,
        cursor: Option<&str>,
    ) -> Result<catalog::ListingPage, MetaError> {
        MetaClient::applications_page(self, headset, page_size, cursor).await
    }

    async fn supported_languages(&self, meta_id: &str) -> Result<Vec<String>, MetaError> {
        MetaClient::supported_languages(self, meta_id).await
    }

    async fn application_detail(
        &self,
        meta_id: &str,
        locale: &str,
    ) -> Result<detail::DetailPayload, MetaError> {
        MetaClient::application_detail(self, meta_id, locale).await
    }

    async fn cover_image(&self, uri: &str) -> Result<Vec<u8>, MetaError> {
        MetaClient::cover_image(self, uri).await
    }
}
