//! Gallery records as stored in the document database.
//!
//! Field names are camelCase on the wire so documents written by this crate
//! and by a browser client are interchangeable. Timestamps are stored as
//! epoch milliseconds, which sort correctly as plain numbers.

use super::backend::Document;
use crate::pipeline::input::ImageInput;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Collection holding photo documents.
pub const PHOTOS_COLLECTION: &str = "photos";

/// Collection holding user profile documents, keyed by uid.
pub const USERS_COLLECTION: &str = "users";

/// One photo in the gallery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    /// Document id; not part of the stored body.
    #[serde(default, skip_serializing)]
    pub id: String,
    pub title: String,
    pub filename: String,
    /// Inline data URI, or a blob download URL.
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub uploaded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    /// Blob path when the image lives in the blob store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl Photo {
    pub fn from_document(doc: Document) -> Result<Self, serde_json::Error> {
        let mut photo: Photo = serde_json::from_value(doc.data)?;
        photo.id = doc.id;
        Ok(photo)
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// True when the image is stored inline rather than in the blob store.
    pub fn is_inline(&self) -> bool {
        self.url.starts_with("data:")
    }

    /// Case-insensitive match on title, filename or description.
    pub fn matches_term(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.title.to_lowercase().contains(&term)
            || self.filename.to_lowercase().contains(&term)
            || self.description.to_lowercase().contains(&term)
    }
}

/// What the user submitted for an upload.
#[derive(Debug, Clone)]
pub struct PhotoUploadData {
    pub input: ImageInput,
    /// Explicit title; when absent one is derived from the file name.
    pub title: Option<String>,
    pub description: Option<String>,
}

impl PhotoUploadData {
    pub fn new(input: ImageInput) -> Self {
        Self {
            input,
            title: None,
            description: None,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn filename(&self) -> String {
        self.input.name().unwrap_or("image").to_string()
    }
}

/// Partial photo update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<bool>,
}

impl PhotoPatch {
    pub fn is_empty(&self) -> bool {
        *self == PhotoPatch::default()
    }
}

/// Which subset of photos a list shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ViewMode {
    /// Everything not in the trash. (default)
    #[default]
    Normal,
    /// Favorites not in the trash.
    Favorites,
    /// Trashed photos only.
    Trash,
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total_count: usize,
    pub page: usize,
    pub page_size: usize,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

/// Colour theme preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    Auto,
}

/// Per-user settings stored with the profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub theme: Theme,
    pub language: String,
    pub email_notifications: bool,
    pub push_notifications: bool,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            theme: Theme::Auto,
            language: "en".to_string(),
            email_notifications: true,
            push_notifications: true,
        }
    }
}

/// Profile document in [`USERS_COLLECTION`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    pub email: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, rename = "photoURL")]
    pub photo_url: String,
    pub email_verified: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_login_at: DateTime<Utc>,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub preferences: UserPreferences,
}

/// Partial profile update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "photoURL")]
    pub photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences: Option<UserPreferences>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn photo() -> Photo {
        Photo {
            id: "abc".into(),
            title: "Sunset".into(),
            filename: "sunset.jpg".into(),
            url: "data:image/jpeg;base64,AAAA".into(),
            description: "Over the bay".into(),
            is_favorite: true,
            deleted: false,
            uploaded_at: Utc.timestamp_millis_opt(1_700_000_000_123).unwrap(),
            owner_id: None,
            storage_path: None,
            width: Some(10),
            height: Some(5),
        }
    }

    #[test]
    fn photo_body_omits_id_and_uses_camel_case() {
        let v = photo().to_value().unwrap();
        assert!(v.get("id").is_none());
        assert_eq!(v["isFavorite"], json!(true));
        assert_eq!(v["uploadedAt"], json!(1_700_000_000_123i64));
        assert!(v.get("storagePath").is_none());
    }

    #[test]
    fn photo_from_document_restores_id() {
        let p = photo();
        let doc = Document {
            id: "xyz".into(),
            data: p.to_value().unwrap(),
        };
        let back = Photo::from_document(doc).unwrap();
        assert_eq!(back.id, "xyz");
        assert_eq!(back.title, p.title);
        assert_eq!(back.uploaded_at, p.uploaded_at);
        assert!(back.is_inline());
    }

    #[test]
    fn missing_flags_default_to_false() {
        let doc = Document {
            id: "1".into(),
            data: json!({
                "title": "t", "filename": "f.png", "url": "memory://x", "uploadedAt": 0
            }),
        };
        let p = Photo::from_document(doc).unwrap();
        assert!(!p.is_favorite && !p.deleted);
        assert_eq!(p.description, "");
    }

    #[test]
    fn search_term_is_case_insensitive() {
        let p = photo();
        assert!(p.matches_term("SUN"));
        assert!(p.matches_term("bay"));
        assert!(!p.matches_term("mountain"));
    }

    #[test]
    fn patch_serialises_only_set_fields() {
        let patch = PhotoPatch {
            is_favorite: Some(false),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&patch).unwrap(), json!({"isFavorite": false}));
        assert!(PhotoPatch::default().is_empty());
    }

    #[test]
    fn default_preferences() {
        let p = UserPreferences::default();
        assert_eq!(p.theme, Theme::Auto);
        assert_eq!(p.language, "en");
        assert!(p.email_notifications && p.push_notifications);
        assert_eq!(serde_json::to_value(p).unwrap()["theme"], json!("auto"));
    }
}
