use crate::http::build_client;
use crate::scraper::RecordStore;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;

const STORAGE_LIST_LIMIT: u32 = 3000;
const IMAGE_CONTENT_TYPE: &str = "image/jpeg";
const IMAGE_CACHE_CONTROL: &str = "public, max-age=31536000";

#[derive(Debug, Clone)]
pub struct SupabaseClient {
    base_url: String,
    service_key: String,
    http: Client,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("invalid response: {0}")]
    Deserialize(String),
}

impl SupabaseClient {
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("SUPABASE_URL").ok()?;
        let service_key = std::env::var("SUPABASE_SERVICE_ROLE_KEY")
            .or_else(|_| std::env::var("SUPABASE_SERVICE_KEY"))
            .or_else(|_| std::env::var("SUPABASE_KEY"))
            .ok()?;
        Some(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
            http: build_client(),
        })
    }

    fn rest_url(&self, entity: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, entity)
    }

    fn storage_url(&self, path: &str) -> String {
        format!("{}/storage/v1/{}", self.base_url, path)
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
    }

    async fn send_checked(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, StoreError> {
        let response = self
            .authed(request)
            .send()
            .await
            .map_err(|err| StoreError::Request(err.to_string()))?;
        if !response.status().is_success() {
            return Err(StoreError::Request(format!("HTTP {}", response.status())));
        }
        Ok(response)
    }
}

/// Parses the total from a PostgREST `content-range` header (`0-24/3573`).
fn parse_content_range(raw: &str) -> Option<u64> {
    raw.rsplit('/').next()?.parse().ok()
}

#[async_trait]
impl RecordStore for SupabaseClient {
    async fn create_record(&self, entity: &str, fields: &Value) -> Result<(), StoreError> {
        let request = self
            .http
            .post(self.rest_url(entity))
            .header("Prefer", "return=minimal")
            .json(fields);
        self.send_checked(request).await?;
        Ok(())
    }

    async fn list_records(&self, entity: &str, select: &str) -> Result<Vec<Value>, StoreError> {
        let request = self
            .http
            .get(self.rest_url(entity))
            .query(&[("select", select)]);
        self.send_checked(request)
            .await?
            .json()
            .await
            .map_err(|err| StoreError::Deserialize(err.to_string()))
    }

    async fn count_records(&self, entity: &str) -> Result<u64, StoreError> {
        let request = self
            .http
            .head(self.rest_url(entity))
            .query(&[("select", "*")])
            .header("Prefer", "count=exact");
        let response = self.send_checked(request).await?;
        response
            .headers()
            .get("content-range")
            .and_then(|value| value.to_str().ok())
            .and_then(parse_content_range)
            .ok_or_else(|| StoreError::Deserialize("missing content-range total".to_string()))
    }

    async fn update_record(&self, entity: &str, id: i64, fields: &Value) -> Result<(), StoreError> {
        let request = self
            .http
            .patch(self.rest_url(entity))
            .query(&[("id", format!("eq.{id}"))])
            .json(fields);
        self.send_checked(request).await?;
        Ok(())
    }

    async fn record_by_field(
        &self,
        entity: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<Value>, StoreError> {
        let request = self
            .http
            .get(self.rest_url(entity))
            .query(&[(field, format!("eq.{value}")), ("select", "*".to_string())])
            .query(&[("limit", 1)]);
        let mut rows: Vec<Value> = self
            .send_checked(request)
            .await?
            .json()
            .await
            .map_err(|err| StoreError::Deserialize(err.to_string()))?;
        Ok(rows.pop())
    }

    async fn delete_record(&self, entity: &str, id: i64) -> Result<(), StoreError> {
        let request = self
            .http
            .delete(self.rest_url(entity))
            .query(&[("id", format!("eq.{id}"))]);
        self.send_checked(request).await?;
        Ok(())
    }

    async fn list_blobs(&self, bucket: &str) -> Result<Vec<String>, StoreError> {
        #[derive(Deserialize)]
        struct Entry {
            name: String,
        }
        let request = self
            .http
            .post(self.storage_url(&format!("object/list/{bucket}")))
            .json(&json!({ "limit": STORAGE_LIST_LIMIT, "offset": 0, "prefix": "" }));
        let entries: Vec<Entry> = self
            .send_checked(request)
            .await?
            .json()
            .await
            .map_err(|err| StoreError::Deserialize(err.to_string()))?;
        Ok(entries.into_iter().map(|entry| entry.name).collect())
    }

    async fn upload_blob(&self, bucket: &str, name: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        let request = self
            .http
            .post(self.storage_url(&format!("object/{bucket}/{name}")))
            .header("Content-Type", IMAGE_CONTENT_TYPE)
            .header("Cache-Control", IMAGE_CACHE_CONTROL)
            .body(bytes);
        self.send_checked(request).await?;
        Ok(())
    }

    async fn delete_blob(&self, bucket: &str, name: &str) -> Result<(), StoreError> {
        let request = self
            .http
            .delete(self.storage_url(&format!("object/{bucket}/{name}")));
        self.send_checked(request).await?;
        Ok(())
    }
}
