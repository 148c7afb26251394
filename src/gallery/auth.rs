//! Account flows on top of an [`AuthProvider`], with profiles kept in the
//! `users` collection.

use super::backend::{
    AuthErrorCode, AuthFailure, AuthProvider, DocumentStore, FederatedProvider, Session,
};
use super::model::{ProfilePatch, UserPreferences, UserProfile, USERS_COLLECTION};
use crate::error::GalleryError;
use chrono::Utc;
use futures::stream::BoxStream;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// Fallback when the provider gives no usable message.
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// User-facing text for an auth failure.
pub fn user_message(failure: &AuthFailure) -> String {
    let text = match &failure.code {
        AuthErrorCode::EmailAlreadyInUse => "Email is already registered",
        AuthErrorCode::WeakPassword => "Password is too weak",
        AuthErrorCode::UserNotFound => "User not found",
        AuthErrorCode::WrongPassword => "Invalid password",
        AuthErrorCode::InvalidEmail => "Invalid email address",
        AuthErrorCode::UserDisabled => "User account has been disabled",
        AuthErrorCode::PopupClosedByUser => "Sign-in popup was closed",
        AuthErrorCode::Other(_) if !failure.message.trim().is_empty() => failure.message.as_str(),
        AuthErrorCode::Other(_) => UNEXPECTED_ERROR_MESSAGE,
    };
    text.to_string()
}

/// Registration, sign-in and profile management.
#[derive(Clone)]
pub struct AuthService {
    auth: Arc<dyn AuthProvider>,
    documents: Arc<dyn DocumentStore>,
}

impl AuthService {
    pub fn new(auth: Arc<dyn AuthProvider>, documents: Arc<dyn DocumentStore>) -> Self {
        Self { auth, documents }
    }

    /// Create the account, name it, store its profile and send a
    /// verification email. Returns the signed-in session.
    pub async fn register_with_email(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<Session, GalleryError> {
        let session = self.auth.create_user(email, password).await?;
        self.auth.update_display_name(display_name).await?;

        let session = Session {
            display_name: Some(display_name.to_string()),
            ..session
        };
        self.write_profile(&new_profile(&session)).await?;
        self.auth.send_email_verification().await?;

        info!("Registered {}", session.uid);
        Ok(session)
    }

    pub async fn login_with_email(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, GalleryError> {
        let session = self.auth.sign_in(email, password).await?;
        self.touch_last_login(&session.uid).await?;
        debug!("Signed in {}", session.uid);
        Ok(session)
    }

    /// Federated sign-in. First-time users get a profile document.
    pub async fn login_with_provider(
        &self,
        provider: FederatedProvider,
    ) -> Result<Session, GalleryError> {
        let session = self.auth.sign_in_federated(provider).await?;
        if self.get_user_profile(&session.uid).await?.is_none() {
            self.write_profile(&new_profile(&session)).await?;
            info!("Created profile for {} via {:?}", session.uid, provider);
        } else {
            self.touch_last_login(&session.uid).await?;
        }
        Ok(session)
    }

    pub async fn logout(&self) -> Result<(), GalleryError> {
        self.auth.sign_out().await?;
        Ok(())
    }

    pub async fn reset_password(&self, email: &str) -> Result<(), GalleryError> {
        self.auth.send_password_reset(email).await?;
        Ok(())
    }

    pub async fn current_user(&self) -> Option<Session> {
        self.auth.current_session().await
    }

    /// Session changes, starting with the current value.
    pub fn watch_current_user(&self) -> BoxStream<'static, Option<Session>> {
        self.auth.watch_session()
    }

    pub async fn is_signed_in(&self) -> bool {
        self.current_user().await.is_some()
    }

    /// Profile of the signed-in user; `None` when signed out or missing.
    pub async fn current_user_profile(&self) -> Result<Option<UserProfile>, GalleryError> {
        match self.current_user().await {
            Some(session) => self.get_user_profile(&session.uid).await,
            None => Ok(None),
        }
    }

    pub async fn get_user_profile(&self, uid: &str) -> Result<Option<UserProfile>, GalleryError> {
        match self.documents.get(USERS_COLLECTION, uid).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Merge `patch` into the profile and stamp `updatedAt`.
    pub async fn update_user_profile(
        &self,
        uid: &str,
        patch: ProfilePatch,
    ) -> Result<(), GalleryError> {
        let mut value = serde_json::to_value(&patch)?;
        if let Value::Object(fields) = &mut value {
            fields.insert("updatedAt".into(), json!(Utc::now().timestamp_millis()));
        }
        self.documents.update(USERS_COLLECTION, uid, value).await?;
        debug!("Updated profile {}", uid);
        Ok(())
    }

    async fn write_profile(&self, profile: &UserProfile) -> Result<(), GalleryError> {
        self.documents
            .set(USERS_COLLECTION, &profile.uid, serde_json::to_value(profile)?)
            .await?;
        Ok(())
    }

    /// Profiles created elsewhere may be missing; that is not an error here.
    async fn touch_last_login(&self, uid: &str) -> Result<(), GalleryError> {
        if self.documents.get(USERS_COLLECTION, uid).await?.is_some() {
            let patch = json!({ "lastLoginAt": Utc::now().timestamp_millis() });
            self.documents.update(USERS_COLLECTION, uid, patch).await?;
        }
        Ok(())
    }
}

fn new_profile(session: &Session) -> UserProfile {
    let now = Utc::now();
    UserProfile {
        uid: session.uid.clone(),
        email: session.email.clone(),
        display_name: session.display_name.clone().unwrap_or_default(),
        photo_url: session.photo_url.clone().unwrap_or_default(),
        email_verified: session.email_verified,
        created_at: now,
        last_login_at: now,
        updated_at: None,
        bio: None,
        website: None,
        location: None,
        preferences: UserPreferences::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::memory::{
        EmailKind, FederatedIdentity, MemoryAuthProvider, MemoryDocumentStore,
    };
    use crate::gallery::model::Theme;

    fn service() -> (AuthService, MemoryAuthProvider, MemoryDocumentStore) {
        let auth = MemoryAuthProvider::new();
        let docs = MemoryDocumentStore::new();
        let svc = AuthService::new(Arc::new(auth.clone()), Arc::new(docs.clone()));
        (svc, auth, docs)
    }

    #[test]
    fn messages_for_known_codes() {
        let msg = |code| user_message(&AuthFailure::new(code, "raw"));
        assert_eq!(msg(AuthErrorCode::EmailAlreadyInUse), "Email is already registered");
        assert_eq!(msg(AuthErrorCode::WeakPassword), "Password is too weak");
        assert_eq!(msg(AuthErrorCode::UserNotFound), "User not found");
        assert_eq!(msg(AuthErrorCode::WrongPassword), "Invalid password");
        assert_eq!(msg(AuthErrorCode::InvalidEmail), "Invalid email address");
        assert_eq!(msg(AuthErrorCode::UserDisabled), "User account has been disabled");
        assert_eq!(msg(AuthErrorCode::PopupClosedByUser), "Sign-in popup was closed");
    }

    #[test]
    fn unknown_codes_use_provider_message_or_fallback() {
        let other = AuthErrorCode::Other("auth/network-request-failed".into());
        assert_eq!(
            user_message(&AuthFailure::new(other.clone(), "Network down")),
            "Network down"
        );
        assert_eq!(
            user_message(&AuthFailure::new(other, "  ")),
            UNEXPECTED_ERROR_MESSAGE
        );
    }

    #[tokio::test]
    async fn register_creates_profile_and_sends_verification() {
        let (svc, auth, _) = service();
        let session = svc
            .register_with_email("ann@example.com", "secret1", "Ann")
            .await
            .unwrap();
        assert_eq!(session.display_name.as_deref(), Some("Ann"));

        let profile = svc.current_user_profile().await.unwrap().unwrap();
        assert_eq!(profile.display_name, "Ann");
        assert_eq!(profile.preferences.theme, Theme::Auto);
        assert!(profile.updated_at.is_none());

        let sent = auth.sent_emails().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, EmailKind::Verification);
    }

    #[tokio::test]
    async fn register_duplicate_maps_message() {
        let (svc, _, _) = service();
        svc.register_with_email("a@example.com", "secret1", "A")
            .await
            .unwrap();
        let err = svc
            .register_with_email("a@example.com", "secret1", "A")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Email is already registered");
    }

    #[tokio::test]
    async fn federated_login_creates_profile_once() {
        let (svc, auth, docs) = service();
        let identity = FederatedIdentity {
            email: "g@example.com".into(),
            display_name: Some("Gee".into()),
            photo_url: Some("https://img/g.png".into()),
        };

        auth.set_federated_identity(identity.clone()).await;
        let first = svc.login_with_provider(FederatedProvider::Google).await.unwrap();
        auth.set_federated_identity(identity).await;
        let second = svc.login_with_provider(FederatedProvider::Google).await.unwrap();

        assert_eq!(first.uid, second.uid);
        assert_eq!(docs.len(USERS_COLLECTION).await, 1);
        let profile = svc.get_user_profile(&first.uid).await.unwrap().unwrap();
        assert_eq!(profile.photo_url, "https://img/g.png");
    }

    #[tokio::test]
    async fn closed_popup_is_reported() {
        let (svc, _, _) = service();
        let err = svc
            .login_with_provider(FederatedProvider::Google)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Sign-in popup was closed");
    }

    #[tokio::test]
    async fn update_profile_stamps_updated_at() {
        let (svc, _, _) = service();
        let s = svc
            .register_with_email("p@example.com", "secret1", "P")
            .await
            .unwrap();
        svc.update_user_profile(
            &s.uid,
            ProfilePatch {
                bio: Some("Hello".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let profile = svc.get_user_profile(&s.uid).await.unwrap().unwrap();
        assert_eq!(profile.bio.as_deref(), Some("Hello"));
        assert_eq!(profile.display_name, "P");
        assert!(profile.updated_at.is_some());
    }

    #[tokio::test]
    async fn update_missing_profile_is_not_found() {
        let (svc, _, _) = service();
        let err = svc
            .update_user_profile("ghost", ProfilePatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GalleryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn logout_clears_session() {
        let (svc, _, _) = service();
        svc.register_with_email("l@example.com", "secret1", "L")
            .await
            .unwrap();
        assert!(svc.is_signed_in().await);
        svc.logout().await.unwrap();
        assert!(svc.current_user().await.is_none());
        assert!(svc.current_user_profile().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn login_and_reset_password() {
        let (svc, auth, _) = service();
        svc.register_with_email("r@example.com", "secret1", "R")
            .await
            .unwrap();
        svc.logout().await.unwrap();

        let err = svc.login_with_email("r@example.com", "wrong!!").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid password");
        svc.login_with_email("r@example.com", "secret1").await.unwrap();

        svc.reset_password("r@example.com").await.unwrap();
        assert_eq!(
            auth.sent_emails().await.last().map(|m| m.kind),
            Some(EmailKind::PasswordReset)
        );
    }
}
