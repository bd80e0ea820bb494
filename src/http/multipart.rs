//! `multipart/form-data` body construction.
//!
//! A [`MultipartForm`] only collects part descriptors. The wire format,
//! including the single closing boundary, is produced in one pass by
//! [`MultipartForm::encode`] when the request is sent, so encoding the same
//! form twice yields identical bodies.

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};

const DEFAULT_FILE_CONTENT_TYPE: &str = "application/octet-stream";

static BOUNDARY_SEQ: AtomicU64 = AtomicU64::new(0);

/// Generates a time-derived boundary token, unique within this process.
pub fn new_boundary() -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let seq = BOUNDARY_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("----------------{nanos:x}{seq:04x}")
}

pub fn content_type(boundary: &str) -> String {
    format!("multipart/form-data; boundary={boundary}")
}

#[derive(Debug, Clone)]
struct Part {
    name: String,
    file_name: Option<String>,
    content_type: Option<String>,
    data: Vec<u8>,
}

impl Part {
    fn header(&self, boundary: &str) -> String {
        let name = escape_quoted(&self.name);
        match &self.file_name {
            None => format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n"
            ),
            Some(file_name) => format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                escape_quoted(file_name),
                self.content_type
                    .as_deref()
                    .unwrap_or(DEFAULT_FILE_CONTENT_TYPE)
            ),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    parts: Vec<Part>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a plain text field.
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(Part {
            name: name.into(),
            file_name: None,
            content_type: None,
            data: value.into().into_bytes(),
        });
        self
    }

    /// Adds a file field. `content_type` defaults to `application/octet-stream`.
    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: Option<&str>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        self.parts.push(Part {
            name: name.into(),
            file_name: Some(file_name.into()),
            content_type: content_type.map(str::to_string),
            data: data.into(),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Serializes every part followed by exactly one closing boundary line.
    ///
    /// The result is split into chunks so it can be streamed as-is.
    pub fn encode(&self, boundary: &str) -> Vec<Vec<u8>> {
        let mut chunks = Vec::with_capacity(self.parts.len() * 3 + 1);
        for part in &self.parts {
            chunks.push(part.header(boundary).into_bytes());
            chunks.push(part.data.clone());
            chunks.push(b"\r\n".to_vec());
        }
        chunks.push(format!("--{boundary}--\r\n").into_bytes());
        chunks
    }

    pub fn to_bytes(&self, boundary: &str) -> Vec<u8> {
        self.encode(boundary).concat()
    }

    /// Size of the encoded body, computed without building it.
    pub fn content_length(&self, boundary: &str) -> u64 {
        let parts: usize = self
            .parts
            .iter()
            .map(|part| part.header(boundary).len() + part.data.len() + 2)
            .sum();
        (parts + boundary.len() + 6) as u64
    }
}

fn escape_quoted(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
