//! HTTP client for the catalog service.

use async_trait::async_trait;
use reqwest::{multipart, Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use url::Url;

use super::error::{CatalogError, Result};
use super::models::{Book, BookDraft, BookId, BookPage};
use super::CatalogApi;
use crate::config::ApiConfig;
use crate::core::books::query::BookQuery;

pub struct CatalogClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

/// Create/update responses are either the bare book or `{ "book": ... }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum SavedBook {
    Bare(Book),
    Wrapped { book: Book },
}

impl From<SavedBook> for Book {
    fn from(saved: SavedBook) -> Self {
        match saved {
            SavedBook::Bare(book) | SavedBook::Wrapped { book } => book,
        }
    }
}

impl CatalogClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(CatalogError::InvalidUrl(
                url::ParseError::RelativeUrlWithCannotBeABaseBase,
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("book-inventory/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            token: config.token.clone().filter(|t| !t.is_empty()),
        })
    }

    /// `{base}/books[/{id}]`, keeping any path prefix on the base URL.
    fn books_url(&self, id: Option<&BookId>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("books");
            if let Some(id) = id {
                segments.push(id.as_str());
            }
        }
        url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn draft_form(draft: &BookDraft) -> Result<multipart::Form> {
        let mut form = multipart::Form::new();
        for (name, value) in draft.text_fields() {
            form = form.text(name, value);
        }

        if let Some(ref image) = draft.image {
            let bytes = tokio::fs::read(&image.path)
                .await
                .map_err(|source| CatalogError::Image {
                    path: image.path.display().to_string(),
                    source,
                })?;
            let part = multipart::Part::bytes(bytes)
                .file_name(image.file_name())
                .mime_str(image.mime_type())?;
            form = form.part("image", part);
        }

        Ok(form)
    }

    async fn save(&self, request: RequestBuilder, draft: &BookDraft) -> Result<Book> {
        let form = Self::draft_form(draft).await?;
        let response = self.authorized(request).multipart(form).send().await?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Validation(validation_message(&body)));
        }

        let body = ensure_success(response).await?.bytes().await?;
        let saved: SavedBook = serde_json::from_slice(&body)?;
        Ok(saved.into())
    }
}

#[async_trait]
impl CatalogApi for CatalogClient {
    async fn list_books(&self, query: &BookQuery) -> Result<BookPage> {
        let url = self.books_url(None);
        tracing::debug!(%url, ?query, "listing books");

        let response = self
            .authorized(self.client.get(url))
            .query(query)
            .send()
            .await?;

        let body = ensure_success(response).await?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn create_book(&self, draft: &BookDraft) -> Result<Book> {
        tracing::info!(title = %draft.title, "creating book");
        let request = self.client.post(self.books_url(None));
        self.save(request, draft).await
    }

    async fn update_book(&self, id: &BookId, draft: &BookDraft) -> Result<Book> {
        tracing::info!(%id, title = %draft.title, "updating book");
        let request = self.client.put(self.books_url(Some(id)));
        self.save(request, draft).await
    }
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(CatalogError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Pull a readable message out of a validation error body.
///
/// Handles `{"message": "..."}`, `{"message": ["...", "..."]}` and
/// `{"error": "..."}`; falls back to the raw body.
fn validation_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return fallback_message(body);
    };

    let field = value.get("message").or_else(|| value.get("error"));
    match field {
        Some(serde_json::Value::String(msg)) => msg.clone(),
        Some(serde_json::Value::Array(items)) => {
            let parts: Vec<&str> = items.iter().filter_map(|v| v.as_str()).collect();
            if parts.is_empty() {
                fallback_message(body)
            } else {
                parts.join("; ")
            }
        }
        _ => fallback_message(body),
    }
}

fn fallback_message(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "The catalog rejected the book".to_string()
    } else {
        trimmed.to_string()
    }
}
