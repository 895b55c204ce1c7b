use std::path::Path;

use bytes::Bytes;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Form field the photo is sent under.
pub const PHOTO_FIELD: &str = "photo";

/// A selected photo, read into memory.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoUpload {
    /// File name presented to the endpoint.
    pub file_name: String,
    /// MIME type, when it can be inferred.
    pub content_type: Option<String>,
    /// File contents.
    pub data: Bytes,
}

impl PhotoUpload {
    /// Create an upload from in-memory contents.  The content type is inferred
    /// from the file name's extension.
    pub fn new(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let file_name = file_name.into();
        let content_type = content_type_for(&file_name).map(String::from);
        Self {
            file_name,
            content_type,
            data: data.into(),
        }
    }

    /// Read a photo from disk.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                Error::validation(
                    format!("{} does not name a file", path.display()),
                    Some(PHOTO_FIELD.to_string()),
                )
            })?
            .to_string();
        let data = tokio::fs::read(path)
            .await
            .map_err(|err| Error::io(format!("failed to read {}", path.display()), err))?;
        Ok(Self::new(file_name, data))
    }

    /// The lowercased extension of the file name, if any.
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.file_name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True for a zero-byte file.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Check the upload against an extension allow-list and a size limit.
    pub fn validate(&self, allowed_extensions: &[String], max_bytes: u64) -> Result<()> {
        let param = || Some(PHOTO_FIELD.to_string());
        if self.is_empty() {
            return Err(Error::validation("file is empty", param()));
        }
        match self.extension() {
            Some(ext)
                if allowed_extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(&ext)) => {}
            Some(ext) => {
                return Err(Error::validation(
                    format!("file type .{ext} is not allowed"),
                    param(),
                ));
            }
            None => {
                return Err(Error::validation("file has no extension", param()));
            }
        }
        if self.len() as u64 > max_bytes {
            return Err(Error::validation(
                format!("file size {} exceeds the {max_bytes} byte limit", self.len()),
                param(),
            ));
        }
        Ok(())
    }
}

/// The reply to a photo upload.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct UploadResponse {
    /// Where the stored photo can be fetched.  Absent when the endpoint did
    /// not store anything.
    #[serde(default)]
    pub photo_url: Option<String>,
}

fn content_type_for(file_name: &str) -> Option<&'static str> {
    let (_, ext) = file_name.rsplit_once('.')?;
    match ext.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}
