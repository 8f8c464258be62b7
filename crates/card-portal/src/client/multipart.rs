use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

use crate::workflows::applications::Attachment;

static BOUNDARY_SEQUENCE: AtomicU64 = AtomicU64::new(1);

struct Part {
    header: String,
    bytes: Vec<u8>,
}

/// Minimal `multipart/form-data` encoder for file fields.
///
/// Parts are buffered and the boundary is picked in [`MultipartForm::finish`], so it never
/// occurs inside a file's bytes.
pub(crate) struct MultipartForm {
    parts: Vec<Part>,
}

impl MultipartForm {
    pub(crate) fn new() -> Self {
        Self { parts: Vec::new() }
    }

    pub(crate) fn file(mut self, field: &str, attachment: &Attachment) -> Self {
        let field = field.replace(['"', '\r', '\n'], "_");
        let file_name = attachment.file_name.replace(['"', '\r', '\n'], "_");
        self.parts.push(Part {
            header: format!(
                "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
                 Content-Type: {}\r\n\r\n",
                attachment.content_type
            ),
            bytes: attachment.bytes.clone(),
        });
        self
    }

    /// Returns the `Content-Type` header value and the encoded body.
    pub(crate) fn finish(self) -> (String, Vec<u8>) {
        self.finish_with(next_boundary)
    }

    fn finish_with(self, mut next: impl FnMut() -> String) -> (String, Vec<u8>) {
        let boundary = loop {
            let candidate = next();
            if !self
                .parts
                .iter()
                .any(|part| contains(&part.bytes, candidate.as_bytes()))
            {
                break candidate;
            }
        };

        let mut body = Vec::new();
        for part in &self.parts {
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            body.extend_from_slice(part.header.as_bytes());
            body.extend_from_slice(&part.bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        (format!("multipart/form-data; boundary={boundary}"), body)
    }
}

fn next_boundary() -> String {
    let sequence = BOUNDARY_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let stamp = Utc::now().timestamp_micros();
    format!("----card-portal-{stamp:x}-{sequence:x}")
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}
