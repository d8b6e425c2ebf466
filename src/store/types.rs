//! Store-neutral types: errors, wire payloads, and the `CommentStore` trait.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

// =============================================================================
// ERROR TYPE
// =============================================================================

/// Anything that stopped a store call from producing a usable reply.
///
/// The controller folds every variant into the same "network error" banner;
/// the variants exist for logs.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The request never completed.
    #[error("store request failed: {0}")]
    Request(String),

    /// The store answered with a non-success HTTP status.
    #[error("store response error: status {status}")]
    Status { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("store response decode failed: {0}")]
    Decode(String),

    /// An endpoint URL could not be assembled.
    #[error("invalid store URL: {0}")]
    Url(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

// =============================================================================
// BUCKETS
// =============================================================================

/// One entry of the bucket listing. Extra fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BucketEntry {
    pub index: String,
}

/// Structured rejection the store attaches to a failed mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StoreRejection {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Rejection type the store reports when a bucket name is taken.
pub const BUCKET_EXISTS: &str = "index_already_exists_exception";

impl StoreRejection {
    #[must_use]
    pub fn is_bucket_exists(&self) -> bool {
        self.kind.as_deref() == Some(BUCKET_EXISTS)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CreateBucketReply {
    #[serde(default)]
    pub acknowledged: bool,
    #[serde(default)]
    pub error: Option<StoreRejection>,
}

// =============================================================================
// COMMENTS
// =============================================================================

/// Comment as the store lists it. `date` stays raw until display formatting.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StoredComment {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    #[serde(default, alias = "_index")]
    pub index: String,
    #[serde(default)]
    pub date: serde_json::Value,
    #[serde(default)]
    pub body: String,
}

/// Body of a create-comment request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewComment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    pub comment: CommentFields,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentFields {
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CreateCommentReply {
    #[serde(default)]
    pub created: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DeleteCommentReply {
    #[serde(default)]
    pub deleted: bool,
}

/// Normalize a comment listing. Anything but an array is an empty page, and
/// array items that do not look like comments are skipped.
#[must_use]
pub fn parse_comment_listing(payload: serde_json::Value) -> Vec<StoredComment> {
    let serde_json::Value::Array(items) = payload else {
        return Vec::new();
    };
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(comment) => Some(comment),
            Err(e) => {
                tracing::debug!(error = %e, "skipping unreadable comment in listing");
                None
            }
        })
        .collect()
}

// =============================================================================
// STORE TRAIT
// =============================================================================

/// The comment store capability. Enables mocking in tests.
#[async_trait::async_trait]
pub trait CommentStore: Send + Sync {
    /// Create the default bucket, or confirm it already exists.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the request fails.
    async fn ensure_default_bucket(&self) -> Result<(), StoreError>;

    /// List every bucket the store knows.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the request fails or the reply is malformed.
    async fn list_buckets(&self) -> Result<Vec<BucketEntry>, StoreError>;

    /// Create the bucket named `name`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the request fails or the reply is malformed.
    async fn create_bucket(&self, name: &str) -> Result<CreateBucketReply, StoreError>;

    /// Fetch the newest `size` comments. The payload is returned raw; callers
    /// normalize it with [`parse_comment_listing`].
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the request fails or the body is not JSON.
    async fn list_comments(&self, size: usize) -> Result<serde_json::Value, StoreError>;

    /// # Errors
    ///
    /// Returns a [`StoreError`] if the request fails or the reply is malformed.
    async fn create_comment(&self, comment: &NewComment) -> Result<CreateCommentReply, StoreError>;

    /// # Errors
    ///
    /// Returns a [`StoreError`] if the request fails or the reply is malformed.
    async fn delete_comment(&self, bucket: &str, id: &str) -> Result<DeleteCommentReply, StoreError>;
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
