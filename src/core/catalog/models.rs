//! Wire types exchanged with the catalog API.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};

// ── Identifiers ─────────────────────────────────────────────────────────────

/// Server-assigned book identifier.
///
/// Backends disagree on whether ids are numbers or strings, so both decode
/// into the same textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct BookId(String);

impl BookId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for BookId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(u64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Number(n) => BookId(n.to_string()),
            RawId::Text(s) => BookId(s),
        })
    }
}

// ── Book ────────────────────────────────────────────────────────────────────

/// A catalog entry as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    #[serde(alias = "_id")]
    pub id: BookId,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub available: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(deserialize_with = "decimal_or_string")]
    pub price: f64,
    /// Image URL or storage key, when the book has a cover.
    #[serde(default, alias = "imageUrl", alias = "image_url")]
    pub image: Option<String>,
}

/// Prices come back as JSON numbers from some backends and as decimal
/// strings (e.g. `"12.50"`) from others.
fn decimal_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawPrice {
        Number(f64),
        Text(String),
    }

    match RawPrice::deserialize(deserializer)? {
        RawPrice::Number(n) => Ok(n),
        RawPrice::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

// ── List response ───────────────────────────────────────────────────────────

/// One page of list results.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BookPage {
    /// A missing or non-array `books` field decodes as an empty page.
    #[serde(default, deserialize_with = "books_or_empty")]
    pub books: Vec<Book>,
    /// Total number of matches across all pages, when the backend reports it.
    #[serde(default)]
    pub total: Option<u64>,
}

fn books_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Book>, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        value @ serde_json::Value::Array(_) => {
            serde_json::from_value(value).map_err(serde::de::Error::custom)
        }
        _ => Ok(Vec::new()),
    }
}

// ── Create / update payload ─────────────────────────────────────────────────

/// Cover image to attach to a create/update request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub path: PathBuf,
}

impl ImageUpload {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File name sent with the multipart part.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string())
    }

    /// MIME type guessed from the file extension.
    pub fn mime_type(&self) -> &'static str {
        let ext = self
            .path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase());
        match ext.as_deref() {
            Some("png") => "image/png",
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("gif") => "image/gif",
            Some("webp") => "image/webp",
            Some("svg") => "image/svg+xml",
            _ => "application/octet-stream",
        }
    }
}

/// A fully assembled creation/edit payload.
///
/// Field-level validation happens before a draft is built; the catalog
/// client forwards it as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub publisher: String,
    pub available: bool,
    pub description: String,
    pub price: f64,
    pub image: Option<ImageUpload>,
}

impl BookDraft {
    /// Plain multipart fields in submission order. The image is attached
    /// separately.
    pub fn text_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("title", self.title.clone()),
            ("author", self.author.clone()),
            ("genre", self.genre.clone()),
            ("publisher", self.publisher.clone()),
            ("available", self.available.to_string()),
            ("description", self.description.clone()),
            ("price", self.price.to_string()),
        ]
    }
}

impl From<&Book> for BookDraft {
    fn from(book: &Book) -> Self {
        Self {
            title: book.title.clone(),
            author: book.author.clone(),
            genre: book.genre.clone(),
            publisher: book.publisher.clone(),
            available: book.available,
            description: book.description.clone().unwrap_or_default(),
            price: book.price,
            image: None,
        }
    }
}
