//! String table decoding
//!
//! Text in a payload is stored once in a table and referenced by index. Long
//! entries are zlib-compressed and base64-encoded; short ones are stored
//! literally behind a `*` marker. Decoded entries are cached per id, so each
//! compressed entry is inflated at most once.

use crate::error::{Error, Result};
use crate::raw::Raw;
use base64::Engine;
use flate2::read::ZlibDecoder;
use std::cell::{Cell, OnceCell};
use std::io::Read;
use std::rc::Rc;

const LITERAL_MARKER: char = '*';

/// Result of resolving a string reference.
///
/// A missing slot and an explicit `null` are kept apart from real text,
/// including the empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Text {
    /// The slot was not present in the record
    Undefined,
    /// The slot held `null`
    Null,
    Value(Rc<str>),
}

impl Text {
    pub fn as_deref(&self) -> Option<&str> {
        match self {
            Text::Value(v) => Some(v),
            Text::Undefined | Text::Null => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Text::Undefined)
    }

    /// Text for display: absent values become the empty string
    pub fn into_string(self) -> String {
        match self {
            Text::Value(v) => v.to_string(),
            Text::Undefined | Text::Null => String::new(),
        }
    }

    /// Present and non-empty text
    pub fn into_option(self) -> Option<String> {
        match self {
            Text::Value(v) if !v.is_empty() => Some(v.to_string()),
            _ => None,
        }
    }
}

impl std::fmt::Display for Text {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Text::Undefined => write!(f, "undefined"),
            Text::Null => write!(f, "null"),
            Text::Value(v) => write!(f, "{}", v),
        }
    }
}

/// Decoding cache over one payload's string table
#[derive(Debug)]
pub struct StringStore {
    raw: Vec<String>,
    decoded: Vec<OnceCell<Rc<str>>>,
    decompressions: Cell<usize>,
}

impl StringStore {
    pub fn new(raw: Vec<String>) -> Self {
        let decoded = (0..raw.len()).map(|_| OnceCell::new()).collect();
        Self {
            raw,
            decoded,
            decompressions: Cell::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Resolve a string reference slot of a compact record
    pub fn get(&self, slot: Option<&Raw>) -> Result<Text> {
        match slot {
            None => Ok(Text::Undefined),
            Some(Raw::Null) => Ok(Text::Null),
            Some(raw) => {
                let id = raw.as_int("string reference")?;
                let id = usize::try_from(id).map_err(|_| {
                    Error::shape("string reference", format!("negative id {}", id))
                })?;
                self.text(id).map(Text::Value)
            }
        }
    }

    /// Decoded text of table entry `id`; unknown ids and empty entries are empty text
    pub fn text(&self, id: usize) -> Result<Rc<str>> {
        let (Some(entry), Some(cell)) = (self.raw.get(id), self.decoded.get(id)) else {
            return Ok(Rc::from(""));
        };
        if let Some(text) = cell.get() {
            return Ok(Rc::clone(text));
        }
        let text: Rc<str> = match entry.strip_prefix(LITERAL_MARKER) {
            Some(literal) => Rc::from(literal),
            None if entry.is_empty() => Rc::from(""),
            None => Rc::from(self.extract(id, entry)?),
        };
        Ok(Rc::clone(cell.get_or_init(|| text)))
    }

    /// The untouched table entry, as stored in the payload
    pub fn raw_entry(&self, id: usize) -> Option<&str> {
        self.raw.get(id).map(String::as_str)
    }

    /// Number of entries inflated so far
    pub fn decompressions(&self) -> usize {
        self.decompressions.get()
    }

    fn extract(&self, id: usize, entry: &str) -> Result<String> {
        let compressed = base64::engine::general_purpose::STANDARD
            .decode(entry.trim())
            .map_err(|source| Error::Base64 { id, source })?;
        let mut bytes = Vec::new();
        ZlibDecoder::new(compressed.as_slice())
            .read_to_end(&mut bytes)
            .map_err(|source| Error::Inflate { id, source })?;
        self.decompressions.set(self.decompressions.get() + 1);
        tracing::trace!(id, bytes = bytes.len(), "inflated string table entry");
        String::from_utf8(bytes).map_err(|source| Error::Utf8 { id, source })
    }
}
