//! Capability traits for the managed backend.
//!
//! The gallery never talks to a vendor SDK directly. Authentication, the
//! document database and the blob store are reached through the three traits
//! below, so services can be exercised against [`super::memory`] in tests and
//! wired to a real backend in production.
//!
//! Documents are plain JSON (`serde_json::Value`). Queries support the
//! handful of shapes the gallery needs: equality filters, one sort key, and a
//! limit.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

// ── Auth ─────────────────────────────────────────────────────────────────

/// Machine-readable reason an auth request failed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthErrorCode {
    EmailAlreadyInUse,
    WeakPassword,
    UserNotFound,
    WrongPassword,
    InvalidEmail,
    UserDisabled,
    PopupClosedByUser,
    /// Any code without a dedicated variant, kept verbatim.
    Other(String),
}

impl AuthErrorCode {
    /// Parse a provider code such as `auth/wrong-password`.
    pub fn from_code(code: &str) -> Self {
        match code.trim_start_matches("auth/") {
            "email-already-in-use" => Self::EmailAlreadyInUse,
            "weak-password" => Self::WeakPassword,
            "user-not-found" => Self::UserNotFound,
            "wrong-password" => Self::WrongPassword,
            "invalid-email" => Self::InvalidEmail,
            "user-disabled" => Self::UserDisabled,
            "popup-closed-by-user" => Self::PopupClosedByUser,
            _ => Self::Other(code.to_string()),
        }
    }

    /// The provider's wire code.
    pub fn as_code(&self) -> &str {
        match self {
            Self::EmailAlreadyInUse => "auth/email-already-in-use",
            Self::WeakPassword => "auth/weak-password",
            Self::UserNotFound => "auth/user-not-found",
            Self::WrongPassword => "auth/wrong-password",
            Self::InvalidEmail => "auth/invalid-email",
            Self::UserDisabled => "auth/user-disabled",
            Self::PopupClosedByUser => "auth/popup-closed-by-user",
            Self::Other(code) => code,
        }
    }
}

impl fmt::Display for AuthErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// A failed auth request as reported by the provider.
#[derive(Debug, Clone, Error)]
#[error("{code}: {message}")]
pub struct AuthFailure {
    pub code: AuthErrorCode,
    /// Provider's own (not user-facing) message; may be empty.
    pub message: String,
}

impl AuthFailure {
    pub fn new(code: AuthErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Federated identity providers offered at sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FederatedProvider {
    Google,
}

impl FederatedProvider {
    /// OAuth scopes requested from the provider.
    pub fn scopes(self) -> &'static [&'static str] {
        match self {
            Self::Google => &["profile", "email"],
        }
    }
}

/// The signed-in user as seen by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub email_verified: bool,
}

/// Email/password and federated authentication with session state.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Create an account and sign it in.
    async fn create_user(&self, email: &str, password: &str) -> Result<Session, AuthFailure>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthFailure>;

    /// Sign in through a federated provider (popup flow in browsers).
    async fn sign_in_federated(&self, provider: FederatedProvider)
        -> Result<Session, AuthFailure>;

    async fn sign_out(&self) -> Result<(), AuthFailure>;

    async fn current_session(&self) -> Option<Session>;

    /// Stream of session changes; yields the current value first.
    fn watch_session(&self) -> BoxStream<'static, Option<Session>>;

    /// Set the display name of the signed-in user.
    async fn update_display_name(&self, display_name: &str) -> Result<(), AuthFailure>;

    /// Send a verification email to the signed-in user.
    async fn send_email_verification(&self) -> Result<(), AuthFailure>;

    async fn send_password_reset(&self, email: &str) -> Result<(), AuthFailure>;
}

// ── Documents ────────────────────────────────────────────────────────────

/// Document store failures.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("document '{id}' not found in '{collection}'")]
    NotFound { collection: String, id: String },

    #[error("{0}")]
    Backend(String),
}

/// A stored document and its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

/// Sort direction for [`Query::order_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Ascending,
    Descending,
}

/// A field filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    /// Top-level `field == value`.
    Eq(String, Value),
}

impl Filter {
    pub fn matches(&self, data: &Value) -> bool {
        match self {
            Filter::Eq(field, expected) => data.get(field).unwrap_or(&Value::Null) == expected,
        }
    }
}

/// A collection query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<Filter>,
    pub order_by: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            collection: name.into(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(field.into(), value.into()));
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn matches(&self, data: &Value) -> bool {
        self.filters.iter().all(|f| f.matches(data))
    }
}

/// Total order over JSON values used for sorting: null < bool < number <
/// string < everything else.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// CRUD plus realtime queries over JSON documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert with a generated id.
    async fn create(&self, collection: &str, data: Value) -> Result<String, StoreError>;

    /// Insert or replace under a known id.
    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    /// Shallow-merge `patch` into an existing document.
    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<(), StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError>;

    /// Live query: yields the current result set, then a fresh one after
    /// every change to the collection.
    async fn subscribe(
        &self,
        query: Query,
    ) -> Result<BoxStream<'static, Result<Vec<Document>, StoreError>>, StoreError>;
}

// ── Blobs ────────────────────────────────────────────────────────────────

/// Blob store failures.
#[derive(Debug, Clone, Error)]
pub enum BlobError {
    #[error("blob '{0}' not found")]
    NotFound(String),

    #[error("{0}")]
    Backend(String),
}

/// Where an uploaded blob lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRef {
    pub path: String,
    pub download_url: String,
}

/// Upload progress sink: `(bytes_transferred, total_bytes)`.
pub type UploadProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Binary object storage with download URLs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        progress: Option<UploadProgressFn>,
    ) -> Result<BlobRef, BlobError>;

    async fn download_url(&self, path: &str) -> Result<String, BlobError>;

    async fn delete(&self, path: &str) -> Result<(), BlobError>;
}
