//! Supabase storage and PostgREST client.

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use super::catalog::{CatalogStore, TrackPatch, TrackRecord};
use super::storage::{ObjectStorage, PutMode};
use crate::error::IngestError;
use crate::sanitize::redact_url;

/// Maximum length for error bodies kept in errors and logs.
const MAX_ERROR_BODY_LENGTH: usize = 200;

fn truncate_body(body: &str) -> String {
    if body.len() > MAX_ERROR_BODY_LENGTH {
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated)", &body[..end])
    } else {
        body.to_string()
    }
}

/// Percent-encodes each segment of a slash-separated object path.
fn encode_object_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Pulls the row id out of a `return=representation` response, which is
/// either a single object or an array of rows. Numeric ids are stringified.
fn parse_track_id(body: &Value) -> Option<String> {
    let row = match body {
        Value::Array(rows) => rows.first()?,
        other => other,
    };
    match row.get("id")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

/// Client for a Supabase project: one storage bucket plus the `tracks` table.
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    service_key: SecretString,
    bucket: String,
}

impl SupabaseClient {
    pub fn new(base_url: &str, service_key: SecretString, bucket: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
            bucket: bucket.to_string(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            self.bucket,
            encode_object_path(path)
        )
    }

    fn tracks_url(&self) -> String {
        format!("{}/rest/v1/tracks", self.base_url)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let key = self.service_key.expose_secret();
        builder
            .header("Authorization", format!("Bearer {}", key))
            .header("apikey", key)
    }

    async fn error_body(response: Response) -> String {
        truncate_body(&response.text().await.unwrap_or_default())
    }
}

#[async_trait]
impl ObjectStorage for SupabaseClient {
    async fn put_object(
        &self,
        path: &str,
        body: Vec<u8>,
        content_type: &str,
        mode: PutMode,
    ) -> Result<(), IngestError> {
        let url = self.object_url(path);
        let request = match mode {
            PutMode::Create => self.client.post(&url),
            PutMode::Upsert => self.client.put(&url).header("x-upsert", "true"),
        };

        debug!("Storage {:?} {}", mode, redact_url(&url));
        let response = self
            .authorized(request)
            .header("Content-Type", content_type)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        Err(IngestError::UploadFailed {
            status: status.as_u16(),
            body: Self::error_body(response).await,
        })
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            self.bucket,
            encode_object_path(path)
        )
    }
}

#[async_trait]
impl CatalogStore for SupabaseClient {
    async fn insert_track(&self, record: &TrackRecord) -> Result<Option<String>, IngestError> {
        let response = self
            .authorized(self.client.post(self.tracks_url()))
            .header("Prefer", "return=representation")
            .json(record)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::Catalog {
                status: status.as_u16(),
                body: Self::error_body(response).await,
            });
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let body: Value = response.json().await?;
        Ok(parse_track_id(&body))
    }

    async fn patch_track(&self, id: &str, patch: &TrackPatch) -> Result<(), IngestError> {
        let url = format!("{}?id=eq.{}", self.tracks_url(), urlencoding::encode(id));
        let response = self
            .authorized(self.client.patch(&url))
            .header("Prefer", "return=minimal")
            .json(patch)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        Err(IngestError::Catalog {
            status: status.as_u16(),
            body: Self::error_body(response).await,
        })
    }
}
