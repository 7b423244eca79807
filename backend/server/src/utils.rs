use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use axum::{
    body::Bytes,
    extract::{Multipart, multipart::MultipartError},
    http::StatusCode,
};
use tracing::warn;
use tracker_model::{
    Attachment, ValidationErrors,
    forms::{ATTACHMENT_TOO_LARGE, file_extension, validate_attachment},
};
use uuid::Uuid;

use crate::{
    database::{Database, NewAttachment},
    error::AppError,
};

pub const ATTACHMENT_FIELD: &str = "attached_file";
pub const ATTACHMENT_DIR: &str = "ticket_attachments";

pub struct Upload {
    pub file_name: String,
    pub bytes: Bytes,
}

/// Pulls the `attached_file` part out of a multipart body. Other parts are ignored.
pub async fn read_upload(mut multipart: Multipart) -> Result<Upload, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        if field.name() != Some(ATTACHMENT_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(upload_error)?;

        return Ok(Upload { file_name, bytes });
    }

    Err(ValidationErrors::single(ATTACHMENT_FIELD, "No file was submitted.").into())
}

/// A body cut off by the request size limit is an oversized attachment.
fn upload_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ValidationErrors::single(ATTACHMENT_FIELD, ATTACHMENT_TOO_LARGE).into()
    } else {
        e.into()
    }
}

/// Validates and writes the upload under the media root.
/// Returns the cleaned file name and the stored path relative to `media_root`.
pub async fn store_upload(media_root: &Path, upload: &Upload) -> Result<(String, String), AppError> {
    let file_name = validate_attachment(&upload.file_name, upload.bytes.len())?;
    let extension = file_extension(&file_name).unwrap_or_default();

    let relative = PathBuf::from(ATTACHMENT_DIR).join(format!("{}.{extension}", Uuid::new_v4()));
    let absolute = media_root.join(&relative);

    if let Some(parent) = absolute.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&absolute, &upload.bytes).await?;

    Ok((file_name, relative.to_string_lossy().into_owned()))
}

/// Stores the upload and records it on the ticket. The file is removed again
/// when the row cannot be written.
pub async fn save_attachment(
    db: &Database,
    media_root: &Path,
    ticket_id: i64,
    uploaded_by: i64,
    upload: &Upload,
) -> Result<Attachment, AppError> {
    let (file_name, stored_path) = store_upload(media_root, upload).await?;

    let new = NewAttachment {
        ticket_id,
        file_name,
        stored_path,
        size_bytes: upload.bytes.len() as i64,
        uploaded_by,
    };

    match db.add_attachment(&new) {
        Ok(attachment) => Ok(attachment),
        Err(e) => {
            if let Err(remove) = tokio::fs::remove_file(media_root.join(&new.stored_path)).await {
                warn!("Failed to remove orphaned upload {}: {remove}", new.stored_path);
            }
            Err(e.into())
        }
    }
}

pub async fn read_attachment(media_root: &Path, attachment: &Attachment) -> Result<Vec<u8>, AppError> {
    match tokio::fs::read(media_root.join(&attachment.stored_path)).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!("Attachment {} is missing {}", attachment.id, attachment.stored_path);
            Err(AppError::NotFound("Attachment"))
        }
        Err(e) => Err(e.into()),
    }
}

pub fn content_type(file_name: &str) -> &'static str {
    match file_extension(file_name).as_deref() {
        Some("pdf") => "application/pdf",
        Some("doc") => "application/msword",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}

/// `Content-Disposition` value; characters a quoted header string cannot hold become `_`.
pub fn content_disposition(file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .map(|c| match c {
            ' '..='~' if c != '"' && c != '\\' => c,
            _ => '_',
        })
        .collect();

    format!("attachment; filename=\"{safe}\"")
}
