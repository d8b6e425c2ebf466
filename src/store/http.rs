//! HTTP comment store client.
//!
//! Thin `reqwest` wrapper over the plugin's REST endpoints. URL assembly and
//! body decoding are plain functions for testability.

use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;

use super::types::{
    BucketEntry, CommentStore, CreateBucketReply, CreateCommentReply, DeleteCommentReply, NewComment, StoreError,
};
use crate::config::BoardConfig;

const BUCKET_SEGMENT: &str = "index";
const COMMENT_SEGMENT: &str = "comment";

// =============================================================================
// CLIENT
// =============================================================================

pub struct HttpCommentStore {
    http: reqwest::Client,
    base: reqwest::Url,
    /// Prefix and API root, split into path segments.
    root: Vec<String>,
}

impl HttpCommentStore {
    /// # Errors
    ///
    /// Returns an error if the base URL is unusable or the HTTP client fails
    /// to build.
    pub fn new(config: &BoardConfig) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| StoreError::HttpClientBuild(e.to_string()))?;
        let base = reqwest::Url::parse(&config.base_url).map_err(|e| StoreError::Url(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(StoreError::Url(format!("{base} cannot carry a path")));
        }
        let root = config
            .api_prefix
            .split('/')
            .chain(config.api_root.split('/'))
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();
        Ok(Self { http, base, root })
    }

    /// Absolute URL for `tail` below the API root. Segments are percent-encoded.
    pub(crate) fn endpoint(&self, tail: &[&str]) -> Result<reqwest::Url, StoreError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| StoreError::Url(format!("{} cannot carry a path", self.base)))?
            .pop_if_empty()
            .extend(self.root.iter().map(String::as_str).chain(tail.iter().copied()));
        Ok(url)
    }

    async fn send_raw(&self, request: reqwest::RequestBuilder) -> Result<String, StoreError> {
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        if !status.is_success() {
            return Err(StoreError::Status { status: status.as_u16(), body: text });
        }
        Ok(text)
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T, StoreError> {
        let text = self.send_raw(request).await?;
        decode_body(&text)
    }
}

fn decode_body<T: DeserializeOwned>(text: &str) -> Result<T, StoreError> {
    serde_json::from_str(text).map_err(|e| StoreError::Decode(e.to_string()))
}

// =============================================================================
// STORE IMPL
// =============================================================================

#[async_trait::async_trait]
impl CommentStore for HttpCommentStore {
    async fn ensure_default_bucket(&self) -> Result<(), StoreError> {
        let url = self.endpoint(&[BUCKET_SEGMENT])?;
        self.send_raw(self.http.put(url)).await.map(|_| ())
    }

    async fn list_buckets(&self) -> Result<Vec<BucketEntry>, StoreError> {
        let url = self.endpoint(&[BUCKET_SEGMENT])?;
        self.send(self.http.get(url)).await
    }

    async fn create_bucket(&self, name: &str) -> Result<CreateBucketReply, StoreError> {
        let url = self.endpoint(&[BUCKET_SEGMENT, name])?;
        self.send(self.http.put(url)).await
    }

    async fn list_comments(&self, size: usize) -> Result<serde_json::Value, StoreError> {
        let url = self.endpoint(&[COMMENT_SEGMENT])?;
        self.send(self.http.get(url).query(&[("size", size)])).await
    }

    async fn create_comment(&self, comment: &NewComment) -> Result<CreateCommentReply, StoreError> {
        let url = self.endpoint(&[COMMENT_SEGMENT])?;
        self.send(self.http.put(url).json(comment)).await
    }

    async fn delete_comment(&self, bucket: &str, id: &str) -> Result<DeleteCommentReply, StoreError> {
        let url = self.endpoint(&[COMMENT_SEGMENT, bucket, id])?;
        self.send(self.http.delete(url)).await
    }
}

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;
