//! Upload form rules, checked before any backend call.

use super::model::PhotoUploadData;
use crate::pipeline::input::ImageInput;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Largest accepted source file: 10 MiB.
pub const MAX_FILE_BYTES: usize = 10 * 1024 * 1024;
pub const TITLE_MIN_CHARS: usize = 3;
pub const TITLE_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 500;

/// Title used when neither an explicit title nor a usable file stem exists.
pub const FALLBACK_TITLE: &str = "Untitled";

static TITLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9\s\-_.,!?]+$").expect("valid title regex"));

/// A rejected upload field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please select a valid image file")]
    NotAnImage,

    #[error("File size must be less than {}MB", .max_bytes / (1024 * 1024))]
    FileTooLarge { max_bytes: usize },

    #[error("Title is required")]
    TitleRequired,

    #[error("Title must be at least {min} characters")]
    TitleTooShort { min: usize },

    #[error("Title must be no more than {max} characters")]
    TitleTooLong { max: usize },

    #[error("Title may only contain letters, numbers, spaces and - _ . , ! ?")]
    TitleInvalidCharacters,

    #[error("Description must be no more than {max} characters")]
    DescriptionTooLong { max: usize },
}

/// File must carry an `image/*` MIME type and be at most [`MAX_FILE_BYTES`].
pub fn validate_file(input: &ImageInput) -> Result<(), ValidationError> {
    if !input.is_image() {
        return Err(ValidationError::NotAnImage);
    }
    if input.len() > MAX_FILE_BYTES {
        return Err(ValidationError::FileTooLarge {
            max_bytes: MAX_FILE_BYTES,
        });
    }
    Ok(())
}

/// Reports the first failing title rule.
pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    let len = title.chars().count();
    if len == 0 {
        return Err(ValidationError::TitleRequired);
    }
    if len < TITLE_MIN_CHARS {
        return Err(ValidationError::TitleTooShort {
            min: TITLE_MIN_CHARS,
        });
    }
    if len > TITLE_MAX_CHARS {
        return Err(ValidationError::TitleTooLong {
            max: TITLE_MAX_CHARS,
        });
    }
    if !TITLE_PATTERN.is_match(title) {
        return Err(ValidationError::TitleInvalidCharacters);
    }
    Ok(())
}

pub fn validate_description(description: &str) -> Result<(), ValidationError> {
    if description.chars().count() > DESCRIPTION_MAX_CHARS {
        return Err(ValidationError::DescriptionTooLong {
            max: DESCRIPTION_MAX_CHARS,
        });
    }
    Ok(())
}

/// All rules for an upload; collects every failure.
///
/// Title rules apply only to an explicit title. A derived title is taken as
/// is.
pub fn validate_upload(data: &PhotoUploadData) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = validate_file(&data.input) {
        errors.push(e);
    }
    if let Some(title) = &data.title {
        if let Err(e) = validate_title(title) {
            errors.push(e);
        }
    }
    if let Some(description) = &data.description {
        if let Err(e) = validate_description(description) {
            errors.push(e);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// File name up to the first `.`; `"beach.day.jpg"` becomes `"beach"`.
pub fn default_title(filename: &str) -> String {
    let stem = filename.split('.').next().unwrap_or("").trim();
    if stem.is_empty() {
        FALLBACK_TITLE.to_string()
    } else {
        stem.to_string()
    }
}
