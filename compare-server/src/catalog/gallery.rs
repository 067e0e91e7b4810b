//! Asset gallery catalog source.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use models_compare_common::ModelDescriptor;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{CatalogSource, FetchError};

/// Fetches the playground model list from the asset gallery API.
pub struct AssetGalleryClient {
    http_client: Client,
    url: String,
}

impl AssetGalleryClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http_client: Client::builder().timeout(timeout).build()?,
            url: url.to_string(),
        })
    }
}

/// Response from the gallery models endpoint.
///
/// Records are kept as raw JSON so one odd record cannot sink the payload.
#[derive(Debug, Deserialize)]
struct GalleryResponse {
    #[serde(default)]
    summaries: Vec<Value>,
}

/// Query for free-playground models labelled "latest", sorted by display name.
fn gallery_query() -> Value {
    json!({
        "filters": [
            {"field": "freePlayground", "values": ["true"], "operator": "eq"},
            {"field": "labels", "values": ["latest"], "operator": "eq"}
        ],
        "order": [{"field": "displayName", "direction": "Asc"}]
    })
}

#[async_trait]
impl CatalogSource for AssetGalleryClient {
    async fn fetch(&self) -> Result<Vec<ModelDescriptor>, FetchError> {
        tracing::debug!("Fetching model catalog from {}", self.url);

        let response = self
            .http_client
            .post(&self.url)
            .json(&gallery_query())
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }

        let payload: GalleryResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        let models = descriptors_from_records(&payload.summaries);
        if models.is_empty() {
            return Err(FetchError::Empty);
        }
        Ok(models)
    }
}

/// Map raw records, skipping those without a name and later duplicates.
fn descriptors_from_records(records: &[Value]) -> Vec<ModelDescriptor> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter_map(descriptor_from_record)
        .filter(|m| seen.insert(m.id.clone()))
        .collect()
}

fn descriptor_from_record(record: &Value) -> Option<ModelDescriptor> {
    let id = string_at(record, "/name").filter(|id| !id.is_empty())?;

    Some(ModelDescriptor {
        display_name: string_at(record, "/displayName").unwrap_or_else(|| id.clone()),
        publisher: string_at(record, "/publisher").unwrap_or_else(|| "Unknown".to_string()),
        summary: string_at(record, "/summary").unwrap_or_default(),
        version: string_at(record, "/version").unwrap_or_default(),
        context_window: record
            .pointer("/modelLimits/textLimits/inputContextWindow")
            .and_then(Value::as_u64)
            .unwrap_or(0),
        supported_languages: strings_at(record, "/modelLimits/supportedLanguages"),
        popularity: record
            .pointer("/popularity")
            .and_then(Value::as_f64)
            .unwrap_or(0.0),
        keywords: strings_at(record, "/keywords"),
        asset_id: string_at(record, "/assetId").unwrap_or_default(),
        id,
    })
}

fn string_at(record: &Value, pointer: &str) -> Option<String> {
    record
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn strings_at(record: &Value, pointer: &str) -> Vec<String> {
    record
        .pointer(pointer)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
