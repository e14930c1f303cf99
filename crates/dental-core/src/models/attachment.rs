//! File attachments stored inline on completed appointments.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Default size cap for a single uploaded file (5 MiB).
pub const DEFAULT_MAX_ATTACHMENT_BYTES: u64 = 5 * 1024 * 1024;

const FALLBACK_MIME: &str = "application/octet-stream";

/// A stored attachment: the original file name and a base64 data URI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Attachment {
    pub name: String,
    pub url: String,
}

impl Attachment {
    /// MIME type recorded in the data URI, if the URI is well formed.
    pub fn mime_type(&self) -> Option<&str> {
        let rest = self.url.strip_prefix("data:")?;
        let (mime, _) = rest.split_once(";base64,")?;
        Some(mime)
    }

    /// Decode the payload back into bytes.
    pub fn decode(&self) -> Option<Vec<u8>> {
        let (_, payload) = self.url.split_once(";base64,")?;
        STANDARD.decode(payload).ok()
    }
}

/// A file handed in with a completion, before conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
    pub name: String,
    /// Falls back to `application/octet-stream` when absent or blank
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, mime_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type,
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Convert to a stored attachment with a `data:<mime>;base64,` URI.
    pub fn to_attachment(&self) -> Attachment {
        let mime = self
            .mime_type
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(FALLBACK_MIME);
        Attachment {
            name: self.name.clone(),
            url: format!("data:{};base64,{}", mime, STANDARD.encode(&self.bytes)),
        }
    }
}
