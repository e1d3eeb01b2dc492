//! Splitting a flat document into per-object JSON fragments.
//!
//! A graph document is not one JSON value: it is a sequence of JSON object
//! fragments separated by blank lines. Each fragment carries at least a
//! `type` field and, except for the root, an `id` field. The splitter only
//! decodes that minimal envelope; the raw slice text is kept verbatim so the
//! full payload can be handed to the owning object later.

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::id::ObjectId;

const SEPARATOR: &str = "\n\n";
const ALT_SEPARATOR: &str = "\n\r\n";

/// One fragment of a document: the extracted envelope plus the raw slice.
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    /// Serialized type identifier. Empty only for a root fragment that did
    /// not declare one.
    pub type_name: String,
    /// Declared object id. `None` until the deserializer assigns one.
    pub id: Option<ObjectId>,
    /// The fragment's raw text, including fields the envelope does not know.
    pub json: String,
    /// Cleared when the type could not be resolved and the payload is being
    /// preserved verbatim instead of schema-decoded.
    pub should_decode: bool,
}

impl DocumentRecord {
    pub fn new(type_name: impl Into<String>, id: Option<ObjectId>, json: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id,
            json: json.into(),
            should_decode: true,
        }
    }
}

/// Minimal envelope used to pull `type` and `id` out of a fragment without
/// fully parsing the payload.
#[derive(Debug, Default, Deserialize)]
struct Envelope {
    #[serde(rename = "type", default)]
    type_name: Option<String>,
    #[serde(default)]
    id: Option<String>,
}

/// Split `text` into ordered records, one per fragment.
///
/// A fragment starts at the next `{` and ends at the next blank-line
/// separator (`\n\n`), falling back to `\n\r\n`, falling back to the last
/// `}` in the whole text for a final un-terminated fragment. That last
/// fallback is inherited from the original format and is known to misbehave
/// for documents whose final fragment has braces inside string values; it is
/// kept because changing it would change round-trip behavior for existing
/// documents.
///
/// Fails with [`Error::MalformedDocument`] if any fragment after the first
/// has no usable `type`.
pub fn split_document(text: &str) -> Result<Vec<DocumentRecord>> {
    let mut records = Vec::new();
    let mut start = 0usize;

    while start < text.len() {
        let Some(relative) = text[start..].find('{') else {
            break;
        };
        let begin = start + relative;

        let end = match text[begin..].find(SEPARATOR) {
            Some(offset) => begin + offset,
            None => match text[begin..].find(ALT_SEPARATOR) {
                Some(offset) => begin + offset,
                None => match text.rfind('}') {
                    Some(close) if close >= begin => close + 1,
                    _ => {
                        return Err(Error::MalformedDocument {
                            reason: format!(
                                "no closing brace after fragment starting at byte {begin}"
                            ),
                        });
                    }
                },
            },
        };

        let json = &text[begin..end];
        // The envelope is tolerant: a first fragment with a broken or absent
        // envelope is still accepted as the root.
        let envelope: Envelope = serde_json::from_str(json).unwrap_or_default();
        let type_name = envelope
            .type_name
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_default();
        if start != 0 && type_name.is_empty() {
            return Err(Error::MalformedDocument {
                reason: format!("fragment type is null or whitespace in JSON:\n{json}"),
            });
        }

        let id = envelope.id.filter(|s| !s.is_empty()).map(ObjectId::from);
        records.push(DocumentRecord::new(type_name, id, json));

        start = end + SEPARATOR.len();
    }

    Ok(records)
}
