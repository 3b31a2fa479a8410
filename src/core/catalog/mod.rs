//! Remote catalog API boundary.
//!
//! `CatalogApi` is the seam the list controller talks to; `CatalogClient`
//! is the HTTP implementation.

pub mod client;
pub mod error;
pub mod models;

use async_trait::async_trait;

pub use client::CatalogClient;
pub use error::{CatalogError, Result};
pub use models::{Book, BookDraft, BookId, BookPage, ImageUpload};

use crate::core::books::query::BookQuery;

/// Operations the book screens need from the catalog service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Fetch one page of books matching `query`.
    async fn list_books(&self, query: &BookQuery) -> Result<BookPage>;

    /// Create a book from a form payload.
    async fn create_book(&self, draft: &BookDraft) -> Result<Book>;

    /// Replace an existing book's fields.
    async fn update_book(&self, id: &BookId, draft: &BookDraft) -> Result<Book>;
}
