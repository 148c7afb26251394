//! In-process backends for tests, demos and offline use.
//!
//! State lives behind `tokio::sync::RwLock`. Document changes are announced
//! on a broadcast channel so live queries can re-run; the auth session is a
//! `watch` channel.

use super::backend::{
    compare_values, AuthErrorCode, AuthFailure, AuthProvider, BlobError, BlobRef, BlobStore,
    Direction, Document, DocumentStore, FederatedProvider, Query, Session, StoreError,
    UploadProgressFn,
};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex, RwLock};
use tokio_stream::wrappers::{BroadcastStream, WatchStream};
use tracing::debug;
use uuid::Uuid;

/// Chunk size used to report blob upload progress.
pub const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

const MIN_PASSWORD_CHARS: usize = 6;
const CHANGE_CHANNEL_CAPACITY: usize = 64;

// ── Documents ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct StoredDoc {
    seq: u64,
    data: Value,
}

#[derive(Debug)]
struct DocState {
    collections: RwLock<HashMap<String, HashMap<String, StoredDoc>>>,
    next_seq: AtomicU64,
    changes: broadcast::Sender<String>,
}

impl DocState {
    async fn run_query(&self, query: &Query) -> Vec<Document> {
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(&query.collection) else {
            return Vec::new();
        };

        let mut hits: Vec<(&String, &StoredDoc)> =
            docs.iter().filter(|(_, d)| query.matches(&d.data)).collect();

        // Ties on the sort key fall back to insertion order in the same
        // direction, so "newest first" stays stable within one millisecond.
        match &query.order_by {
            Some((field, direction)) => hits.sort_by(|(_, a), (_, b)| {
                let key = |d: &StoredDoc| d.data.get(field).cloned().unwrap_or(Value::Null);
                let ord = compare_values(&key(*a), &key(*b)).then(a.seq.cmp(&b.seq));
                match direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            }),
            None => hits.sort_by_key(|(_, d)| d.seq),
        }

        hits.into_iter()
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|(id, d)| Document {
                id: id.clone(),
                data: d.data.clone(),
            })
            .collect()
    }

    fn notify(&self, collection: &str) {
        // No receivers is fine.
        let _ = self.changes.send(collection.to_string());
    }

    fn seq(&self) -> u64 {
        self.next_seq.fetch_add(1, AtomicOrdering::Relaxed)
    }
}

/// [`DocumentStore`] backed by in-memory maps.
#[derive(Debug, Clone)]
pub struct MemoryDocumentStore {
    state: Arc<DocState>,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            state: Arc::new(DocState {
                collections: RwLock::new(HashMap::new()),
                next_seq: AtomicU64::new(0),
                changes,
            }),
        }
    }

    /// Number of documents in a collection.
    pub async fn len(&self, collection: &str) -> usize {
        self.state
            .collections
            .read()
            .await
            .get(collection)
            .map_or(0, HashMap::len)
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create(&self, collection: &str, data: Value) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        self.set(collection, &id, data).await?;
        Ok(id)
    }

    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError> {
        if !data.is_object() {
            return Err(StoreError::Backend(format!(
                "document body for '{collection}/{id}' must be a JSON object"
            )));
        }
        {
            let mut collections = self.state.collections.write().await;
            let docs = collections.entry(collection.to_string()).or_default();
            let seq = match docs.get(id) {
                Some(existing) => existing.seq,
                None => self.state.seq(),
            };
            docs.insert(id.to_string(), StoredDoc { seq, data });
        }
        debug!("set {}/{}", collection, id);
        self.state.notify(collection);
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        Ok(self
            .state
            .collections
            .read()
            .await
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|d| d.data.clone()))
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<(), StoreError> {
        let Value::Object(fields) = patch else {
            return Err(StoreError::Backend("update patch must be a JSON object".into()));
        };
        {
            let mut collections = self.state.collections.write().await;
            let doc = collections
                .get_mut(collection)
                .and_then(|docs| docs.get_mut(id))
                .ok_or_else(|| StoreError::NotFound {
                    collection: collection.to_string(),
                    id: id.to_string(),
                })?;
            if let Value::Object(target) = &mut doc.data {
                target.extend(fields);
            }
        }
        debug!("update {}/{}", collection, id);
        self.state.notify(collection);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let removed = self
            .state
            .collections
            .write()
            .await
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .is_some();
        if removed {
            debug!("delete {}/{}", collection, id);
            self.state.notify(collection);
        }
        Ok(())
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        Ok(self.state.run_query(query).await)
    }

    async fn subscribe(
        &self,
        query: Query,
    ) -> Result<BoxStream<'static, Result<Vec<Document>, StoreError>>, StoreError> {
        // Subscribe before the first read so no change slips in between.
        let rx = self.state.changes.subscribe();
        let initial = self.state.run_query(&query).await;
        let state = Arc::clone(&self.state);

        let updates = BroadcastStream::new(rx).filter_map(move |changed| {
            let state = Arc::clone(&state);
            let query = query.clone();
            async move {
                match changed {
                    Ok(collection) if collection != query.collection => None,
                    // A lagged receiver missed some changes; re-reading covers them.
                    _ => Some(Ok(state.run_query(&query).await)),
                }
            }
        });

        Ok(stream::once(async move { Ok(initial) })
            .chain(updates)
            .boxed())
    }
}

// ── Blobs ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct StoredBlob {
    bytes: Vec<u8>,
    content_type: String,
}

/// [`BlobStore`] that keeps bytes in memory and hands out `memory://` URLs.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<RwLock<HashMap<String, StoredBlob>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn url_for(path: &str) -> String {
        format!("memory://{path}")
    }

    pub async fn contains(&self, path: &str) -> bool {
        self.blobs.read().await.contains_key(path)
    }

    /// Stored bytes and content type.
    pub async fn get(&self, path: &str) -> Option<(Vec<u8>, String)> {
        self.blobs
            .read()
            .await
            .get(path)
            .map(|b| (b.bytes.clone(), b.content_type.clone()))
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        progress: Option<UploadProgressFn>,
    ) -> Result<BlobRef, BlobError> {
        if path.is_empty() {
            return Err(BlobError::Backend("blob path must not be empty".into()));
        }

        let total = bytes.len() as u64;
        if let Some(report) = &progress {
            report(0, total);
            let mut sent = 0u64;
            for chunk in bytes.chunks(UPLOAD_CHUNK_BYTES) {
                sent += chunk.len() as u64;
                report(sent, total);
                tokio::task::yield_now().await;
            }
        }

        self.blobs.write().await.insert(
            path.to_string(),
            StoredBlob {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        debug!("uploaded {} bytes to {}", total, path);

        Ok(BlobRef {
            path: path.to_string(),
            download_url: Self::url_for(path),
        })
    }

    async fn download_url(&self, path: &str) -> Result<String, BlobError> {
        if self.contains(path).await {
            Ok(Self::url_for(path))
        } else {
            Err(BlobError::NotFound(path.to_string()))
        }
    }

    async fn delete(&self, path: &str) -> Result<(), BlobError> {
        match self.blobs.write().await.remove(path) {
            Some(_) => Ok(()),
            None => Err(BlobError::NotFound(path.to_string())),
        }
    }
}

// ── Auth ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Account {
    uid: String,
    email: String,
    /// `None` for accounts that only sign in through a federated provider.
    password: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
    email_verified: bool,
    disabled: bool,
}

impl Account {
    fn session(&self) -> Session {
        Session {
            uid: self.uid.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            photo_url: self.photo_url.clone(),
            email_verified: self.email_verified,
        }
    }
}

/// Identity returned by the next federated sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedIdentity {
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

/// Kind of email the provider was asked to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    Verification,
    PasswordReset,
}

/// An email the in-memory provider "sent".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub kind: EmailKind,
    pub to: String,
}

/// [`AuthProvider`] with accounts kept in memory.
///
/// Rejects passwords shorter than six characters and emails without `@`.
/// Federated sign-in succeeds only when an identity was queued with
/// [`set_federated_identity`](Self::set_federated_identity); otherwise it
/// behaves like a closed popup.
#[derive(Debug, Clone)]
pub struct MemoryAuthProvider {
    accounts: Arc<RwLock<HashMap<String, Account>>>,
    session: Arc<watch::Sender<Option<Session>>>,
    federated: Arc<Mutex<Option<FederatedIdentity>>>,
    outbox: Arc<Mutex<Vec<SentEmail>>>,
}

impl Default for MemoryAuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAuthProvider {
    pub fn new() -> Self {
        let (session, _) = watch::channel(None);
        Self {
            accounts: Arc::new(RwLock::new(HashMap::new())),
            session: Arc::new(session),
            federated: Arc::new(Mutex::new(None)),
            outbox: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn set_federated_identity(&self, identity: FederatedIdentity) {
        *self.federated.lock().await = Some(identity);
    }

    pub async fn disable_user(&self, email: &str) -> bool {
        match self.accounts.write().await.get_mut(&normalize(email)) {
            Some(account) => {
                account.disabled = true;
                true
            }
            None => false,
        }
    }

    /// Emails sent so far, oldest first.
    pub async fn sent_emails(&self) -> Vec<SentEmail> {
        self.outbox.lock().await.clone()
    }

    fn publish(&self, session: Option<Session>) {
        self.session.send_replace(session);
    }

    fn current_uid(&self) -> Option<String> {
        self.session.borrow().as_ref().map(|s| s.uid.clone())
    }

    /// Apply `f` to the signed-in account and republish its session.
    async fn with_current_account(
        &self,
        f: impl FnOnce(&mut Account),
    ) -> Result<Session, AuthFailure> {
        let uid = self.current_uid().ok_or_else(no_current_user)?;
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .values_mut()
            .find(|a| a.uid == uid)
            .ok_or_else(no_current_user)?;
        f(account);
        let session = account.session();
        self.publish(Some(session.clone()));
        Ok(session)
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_email(email: &str) -> Result<(), AuthFailure> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(AuthFailure::new(
            AuthErrorCode::InvalidEmail,
            format!("'{email}' is not a valid email address"),
        )),
    }
}

fn no_current_user() -> AuthFailure {
    AuthFailure::new(
        AuthErrorCode::Other("auth/no-current-user".into()),
        "No user is signed in",
    )
}

#[async_trait]
impl AuthProvider for MemoryAuthProvider {
    async fn create_user(&self, email: &str, password: &str) -> Result<Session, AuthFailure> {
        check_email(email)?;
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(AuthFailure::new(
                AuthErrorCode::WeakPassword,
                format!("Password should be at least {MIN_PASSWORD_CHARS} characters"),
            ));
        }

        let key = normalize(email);
        let session = {
            let mut accounts = self.accounts.write().await;
            if accounts.contains_key(&key) {
                return Err(AuthFailure::new(AuthErrorCode::EmailAlreadyInUse, ""));
            }
            let account = Account {
                uid: Uuid::new_v4().to_string(),
                email: email.trim().to_string(),
                password: Some(password.to_string()),
                display_name: None,
                photo_url: None,
                email_verified: false,
                disabled: false,
            };
            let session = account.session();
            accounts.insert(key, account);
            session
        };

        self.publish(Some(session.clone()));
        Ok(session)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthFailure> {
        check_email(email)?;
        let session = {
            let accounts = self.accounts.read().await;
            let account = accounts
                .get(&normalize(email))
                .ok_or_else(|| AuthFailure::new(AuthErrorCode::UserNotFound, ""))?;
            if account.disabled {
                return Err(AuthFailure::new(AuthErrorCode::UserDisabled, ""));
            }
            if account.password.as_deref() != Some(password) {
                return Err(AuthFailure::new(AuthErrorCode::WrongPassword, ""));
            }
            account.session()
        };

        self.publish(Some(session.clone()));
        Ok(session)
    }

    async fn sign_in_federated(
        &self,
        provider: FederatedProvider,
    ) -> Result<Session, AuthFailure> {
        let identity = self.federated.lock().await.take().ok_or_else(|| {
            AuthFailure::new(
                AuthErrorCode::PopupClosedByUser,
                format!("{provider:?} sign-in was cancelled"),
            )
        })?;

        let session = {
            let mut accounts = self.accounts.write().await;
            let account = accounts
                .entry(normalize(&identity.email))
                .or_insert_with(|| Account {
                    uid: Uuid::new_v4().to_string(),
                    email: identity.email.clone(),
                    password: None,
                    display_name: identity.display_name.clone(),
                    photo_url: identity.photo_url.clone(),
                    email_verified: true,
                    disabled: false,
                });
            if account.disabled {
                return Err(AuthFailure::new(AuthErrorCode::UserDisabled, ""));
            }
            account.session()
        };

        self.publish(Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AuthFailure> {
        self.publish(None);
        Ok(())
    }

    async fn current_session(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    fn watch_session(&self) -> BoxStream<'static, Option<Session>> {
        WatchStream::new(self.session.subscribe()).boxed()
    }

    async fn update_display_name(&self, display_name: &str) -> Result<(), AuthFailure> {
        let name = display_name.to_string();
        self.with_current_account(|a| a.display_name = Some(name))
            .await
            .map(|_| ())
    }

    async fn send_email_verification(&self) -> Result<(), AuthFailure> {
        let session = self.current_session().await.ok_or_else(no_current_user)?;
        self.outbox.lock().await.push(SentEmail {
            kind: EmailKind::Verification,
            to: session.email,
        });
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), AuthFailure> {
        check_email(email)?;
        let to = self
            .accounts
            .read()
            .await
            .get(&normalize(email))
            .map(|a| a.email.clone())
            .ok_or_else(|| AuthFailure::new(AuthErrorCode::UserNotFound, ""))?;
        self.outbox.lock().await.push(SentEmail {
            kind: EmailKind::PasswordReset,
            to,
        });
        Ok(())
    }
}
