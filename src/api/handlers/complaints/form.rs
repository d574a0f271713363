//! Multipart form parsing shared by the complaint mutation endpoints.

use axum::extract::Multipart;
use std::str::FromStr;
use tracing::warn;
use uuid::Uuid;

use super::types::ComplaintStatus;
use crate::api::error::{ApiError, FieldErrors};

const MAX_IMAGE_BYTES: usize = 2048 * 1024;
const ALLOWED_IMAGE_TYPES: [&str; 3] = ["image/jpeg", "image/jpg", "image/png"];

/// Fields accepted by create and update. Everything is optional at the
/// parse layer; each endpoint applies its own required-field rules.
#[derive(Default)]
pub(crate) struct ComplaintForm {
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) category_id: Option<Uuid>,
    pub(crate) status: Option<ComplaintStatus>,
    pub(crate) images: Vec<Vec<u8>>,
}

/// Drain the multipart stream into a [`ComplaintForm`], collecting every
/// per-field validation failure instead of stopping at the first.
pub(crate) async fn parse_complaint_form(
    mut multipart: Multipart,
) -> Result<ComplaintForm, ApiError> {
    let mut form = ComplaintForm::default();
    let mut errors = FieldErrors::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                warn!("Malformed multipart payload: {err}");
                return Err(ApiError::field("form", "Malformed multipart payload"));
            }
        };

        let Some(name) = field.name().map(ToString::to_string) else {
            continue;
        };
        match name.as_str() {
            "title" => form.title = Some(text_value(field, &name, &mut errors).await),
            "description" => {
                form.description = Some(text_value(field, &name, &mut errors).await);
            }
            "category_id" => {
                let value = text_value(field, &name, &mut errors).await;
                match Uuid::parse_str(value.trim()) {
                    Ok(id) => form.category_id = Some(id),
                    Err(_) => push(
                        &mut errors,
                        "category_id",
                        "The category id must be a valid UUID",
                    ),
                }
            }
            "status" => {
                let value = text_value(field, &name, &mut errors).await;
                match ComplaintStatus::from_str(value.trim()) {
                    Ok(status) => form.status = Some(status),
                    Err(_) => push(&mut errors, "status", "The selected status is invalid"),
                }
            }
            "images" | "images[]" => {
                let content_type = field.content_type().map(ToString::to_string);
                match field.bytes().await {
                    Ok(bytes) => {
                        if let Err(message) = validate_image(content_type.as_deref(), bytes.len())
                        {
                            push(&mut errors, "images", message);
                        } else {
                            form.images.push(bytes.to_vec());
                        }
                    }
                    Err(err) => {
                        warn!("Failed to read image field: {err}");
                        push(&mut errors, "images", "The file must be an image.");
                    }
                }
            }
            other => {
                warn!("Ignoring unknown form field: {other}");
            }
        }
    }

    if errors.is_empty() {
        Ok(form)
    } else {
        Err(ApiError::Validation(errors))
    }
}

async fn text_value(
    field: axum::extract::multipart::Field<'_>,
    name: &str,
    errors: &mut FieldErrors,
) -> String {
    match field.text().await {
        Ok(value) => value,
        Err(err) => {
            warn!("Failed to read {name} field: {err}");
            push(errors, name, &format!("The {name} field is invalid"));
            String::new()
        }
    }
}

/// Per-file constraints: jpeg or png, at most 2048 kilobytes.
fn validate_image(content_type: Option<&str>, len: usize) -> Result<(), &'static str> {
    let Some(content_type) = content_type else {
        return Err("The file must be an image.");
    };
    if !ALLOWED_IMAGE_TYPES.contains(&content_type) {
        return Err("The image must be in jpg, jpeg, or png format.");
    }
    if len > MAX_IMAGE_BYTES {
        return Err("The image field must not be greater than 2048 kilobytes.");
    }
    Ok(())
}

fn push(errors: &mut FieldErrors, field: &str, message: &str) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_supported_image_types() {
        assert!(validate_image(Some("image/jpeg"), 1024).is_ok());
        assert!(validate_image(Some("image/jpg"), 1024).is_ok());
        assert!(validate_image(Some("image/png"), MAX_IMAGE_BYTES).is_ok());
    }

    #[test]
    fn rejects_non_image_types() {
        assert_eq!(
            validate_image(Some("application/pdf"), 10),
            Err("The image must be in jpg, jpeg, or png format.")
        );
        assert_eq!(validate_image(None, 10), Err("The file must be an image."));
    }

    #[test]
    fn rejects_oversized_images() {
        assert_eq!(
            validate_image(Some("image/png"), MAX_IMAGE_BYTES + 1),
            Err("The image field must not be greater than 2048 kilobytes.")
        );
    }

    #[test]
    fn push_accumulates_messages_per_field() {
        let mut errors = FieldErrors::new();
        push(&mut errors, "images", "first");
        push(&mut errors, "images", "second");
        assert_eq!(errors["images"].len(), 2);
    }
}
