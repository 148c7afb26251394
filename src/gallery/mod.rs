//! Gallery, auth and storage services.
//!
//! ```text
//!   PhotoService ──┬──▶ DocumentStore   (photos, users)
//!                  ├──▶ BlobStore       (original bytes)
//!                  └──▶ preprocess()    (inline data URIs)
//!   AuthService  ──┬──▶ AuthProvider
//!                  └──▶ DocumentStore   (profiles)
//! ```
//!
//! Services hold `Arc<dyn Trait>` handles, so any backend that implements
//! the traits in [`backend`] can be plugged in. [`memory`] provides
//! in-process implementations.

pub mod auth;
pub mod backend;
pub mod memory;
pub mod model;
pub mod photos;
pub mod status;
pub mod validate;

pub use auth::AuthService;
pub use backend::{
    AuthErrorCode, AuthFailure, AuthProvider, BlobError, BlobRef, BlobStore, Direction, Document,
    DocumentStore, FederatedProvider, Filter, Query, Session, StoreError, UploadProgressFn,
};
pub use model::{
    PaginatedResponse, Photo, PhotoPatch, PhotoUploadData, ProfilePatch, Theme, UserPreferences,
    UserProfile, ViewMode,
};
pub use photos::PhotoService;
pub use status::{LoadingGuard, LoadingTracker, UploadStatus};
pub use validate::ValidationError;
