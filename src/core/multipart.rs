use crate::core::error::IntakeError;
use bytes::Bytes;
use std::path::Path;
use uuid::Uuid;

const CRLF: &[u8] = b"\r\n";

/// The one file carried by a multipart body.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl FilePart {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Reads the whole file into memory.
    pub async fn from_path(
        path: impl AsRef<Path>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Result<Self, IntakeError> {
        let bytes = tokio::fs::read(path.as_ref()).await?;
        Ok(Self::new(file_name, content_type, bytes))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct MultipartBody {
    pub body: Vec<u8>,
    /// `multipart/form-data; boundary=...`
    pub content_type: String,
}

pub fn generate_boundary() -> String {
    format!("----RxIntakeBoundary{}", Uuid::new_v4().simple())
}

/// Encodes `fields` (in order) followed by `file` under the part name `file`.
pub fn build(fields: &[(String, String)], file: &FilePart) -> Result<MultipartBody, IntakeError> {
    build_with_boundary(fields, file, &generate_boundary())
}

pub async fn build_from_path(
    fields: &[(String, String)],
    path: impl AsRef<Path>,
    file_name: &str,
    content_type: &str,
) -> Result<MultipartBody, IntakeError> {
    let file = FilePart::from_path(path, file_name, content_type).await?;
    build(fields, &file)
}

fn build_with_boundary(
    fields: &[(String, String)],
    file: &FilePart,
    boundary: &str,
) -> Result<MultipartBody, IntakeError> {
    let delimiter = format!("--{}", boundary);
    let mut body = Vec::with_capacity(file.len() + fields.len() * 128 + 256);

    for (name, value) in fields {
        let name = escape_header_param(name)?;
        if value.contains(&delimiter) {
            return Err(IntakeError::UnsafeMultipartValue(name));
        }
        body.extend_from_slice(delimiter.as_bytes());
        body.extend_from_slice(CRLF);
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"", name).as_bytes(),
        );
        body.extend_from_slice(CRLF);
        body.extend_from_slice(CRLF);
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(CRLF);
    }

    let file_name = escape_header_param(&file.file_name)?;
    if file.content_type.contains(['\r', '\n']) {
        return Err(IntakeError::UnsafeMultipartValue("Content-Type".to_string()));
    }
    body.extend_from_slice(delimiter.as_bytes());
    body.extend_from_slice(CRLF);
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"",
            file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(CRLF);
    body.extend_from_slice(format!("Content-Type: {}", file.content_type).as_bytes());
    body.extend_from_slice(CRLF);
    body.extend_from_slice(CRLF);
    body.extend_from_slice(&file.bytes);
    body.extend_from_slice(CRLF);

    body.extend_from_slice(format!("{}--", delimiter).as_bytes());
    body.extend_from_slice(CRLF);

    Ok(MultipartBody {
        body,
        content_type: format!("multipart/form-data; boundary={}", boundary),
    })
}

// Quoted header parameters cannot carry line breaks; quotes are
// percent-escaped the way browsers encode form names.
fn escape_header_param(raw: &str) -> Result<String, IntakeError> {
    if raw.contains(['\r', '\n']) {
        return Err(IntakeError::UnsafeMultipartValue(raw.escape_debug().to_string()));
    }
    Ok(raw.replace('"', "%22"))
}
