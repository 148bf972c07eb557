//! Submitted-data validation for posts and comments.
//!
//! A form is checked in full before anything is written: every failing field
//! is reported together, and a cleaned value only exists once all checks pass.

use crate::error::{field_errors, push_field_error, AppError, AppResult};
use crate::models::Group;
use crate::services::upload::{decode_image, ImageFormat, MAX_FILE_SIZE};
use sea_orm::{ConnectionTrait, EntityTrait};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

pub const MSG_REQUIRED: &str = "This field is required.";
pub const MSG_INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";
pub const MSG_INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";
pub const MSG_IMAGE_TOO_LARGE: &str = "Image must not exceed 5 MB.";
pub const MSG_IMAGE_CONTRADICTION: &str =
    "Please either submit a file or check the clear checkbox, not both.";

/// Rejects empty and whitespace-only text.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message(MSG_REQUIRED.into()));
    }
    Ok(())
}

/// ASCII letters, digits, hyphens and underscores.
pub fn valid_slug(value: &str) -> Result<(), ValidationError> {
    let ok = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !ok {
        return Err(ValidationError::new("slug").with_message(
            "Enter a valid slug consisting of letters, numbers, underscores or hyphens.".into(),
        ));
    }
    Ok(())
}

/// Letters, digits and `@.+-_`.
pub fn valid_username(value: &str) -> Result<(), ValidationError> {
    let ok = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_alphanumeric() || "@.+-_".contains(c));
    if !ok {
        return Err(ValidationError::new("username").with_message(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
                .into(),
        ));
    }
    Ok(())
}

/// Raw post submission: text, optional group id, optional image bytes and
/// the "clear image" checkbox.
#[derive(Debug, Default, Validate)]
pub struct PostForm {
    #[validate(custom(function = "not_blank"))]
    pub text: String,
    pub group: Option<String>,
    pub image: Option<Vec<u8>>,
    pub image_clear: bool,
}

#[derive(Debug)]
pub struct ValidImage {
    pub data: Vec<u8>,
    pub format: ImageFormat,
}

/// What a submission does to the post's image.
#[derive(Debug, Default)]
pub enum ImageChange {
    /// Nothing uploaded: an existing image stays.
    #[default]
    Keep,
    Replace(ValidImage),
    Clear,
}

/// A post submission that passed every check.
#[derive(Debug)]
pub struct CleanPost {
    pub text: String,
    pub group_id: Option<i32>,
    pub image: ImageChange,
}

impl PostForm {
    pub async fn clean<C: ConnectionTrait>(self, db: &C) -> AppResult<CleanPost> {
        let mut errors = self.validate().err().map(field_errors).unwrap_or_default();

        let group_id = match parse_group_choice(self.group.as_deref()) {
            Ok(Some(id)) => {
                if Group::find_by_id(id).one(db).await?.is_some() {
                    Some(id)
                } else {
                    push_field_error(&mut errors, "group", MSG_INVALID_CHOICE);
                    None
                }
            }
            Ok(None) => None,
            Err(msg) => {
                push_field_error(&mut errors, "group", msg);
                None
            }
        };

        let upload = self.image.filter(|data| !data.is_empty());
        let image = match upload {
            Some(_) if self.image_clear => {
                push_field_error(&mut errors, "image", MSG_IMAGE_CONTRADICTION);
                ImageChange::Keep
            }
            Some(data) => match check_image(&data) {
                Ok(format) => ImageChange::Replace(ValidImage { data, format }),
                Err(msg) => {
                    push_field_error(&mut errors, "image", msg);
                    ImageChange::Keep
                }
            },
            None if self.image_clear => ImageChange::Clear,
            None => ImageChange::Keep,
        };

        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        Ok(CleanPost {
            text: self.text.trim().to_string(),
            group_id,
            image,
        })
    }
}

/// Absent or empty means "no group"; anything else must be a numeric id.
fn parse_group_choice(raw: Option<&str>) -> Result<Option<i32>, &'static str> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse::<i32>().map(Some).map_err(|_| MSG_INVALID_CHOICE),
    }
}

fn check_image(data: &[u8]) -> Result<ImageFormat, &'static str> {
    if data.len() > MAX_FILE_SIZE {
        return Err(MSG_IMAGE_TOO_LARGE);
    }
    decode_image(data).ok_or(MSG_INVALID_IMAGE)
}

/// Comment submission.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CommentForm {
    /// Comment text
    #[validate(custom(function = "not_blank"))]
    pub text: String,
}

impl CommentForm {
    /// Returns the trimmed text.
    pub fn clean(self) -> AppResult<String> {
        self.validate()?;
        Ok(self.text.trim().to_string())
    }
}
