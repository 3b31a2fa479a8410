//! Create/edit book form modal.
//!
//! Owns field-level validation and assembles a [`BookDraft`]; submission
//! itself goes through the list controller.

use std::path::Path;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Alignment, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use super::super::theme;
use super::super::widgets::input_buffer::InputBuffer;
use crate::core::books::RequestToken;
use crate::core::catalog::{Book, BookDraft, BookId, ImageUpload};

const REQUIRED_MESSAGE: &str = "All fields are required";
const PRICE_MESSAGE: &str = "Price must be a non-negative number";

// ── Fields ──────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormField {
    Title,
    Author,
    Genre,
    Publisher,
    Price,
    Available,
    Description,
    Image,
}

impl FormField {
    const ALL: [FormField; 8] = [
        Self::Title,
        Self::Author,
        Self::Genre,
        Self::Publisher,
        Self::Price,
        Self::Available,
        Self::Description,
        Self::Image,
    ];

    fn index(self) -> usize {
        Self::ALL.iter().position(|f| *f == self).unwrap_or(0)
    }

    fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    fn label(self) -> &'static str {
        match self {
            Self::Title => "Title",
            Self::Author => "Author",
            Self::Genre => "Genre",
            Self::Publisher => "Publisher",
            Self::Price => "Price",
            Self::Available => "Available",
            Self::Description => "Description (optional)",
            Self::Image => "Cover image path (optional)",
        }
    }
}

/// Outcome of feeding a key to the form.
#[derive(Debug)]
pub enum FormResult {
    Consumed,
    /// Valid payload; `None` id means create.
    Submit(Option<BookId>, BookDraft),
    Close,
}

// ── State ───────────────────────────────────────────────────────────────────

pub struct BookFormState {
    editing: Option<BookId>,
    focused: FormField,
    title: InputBuffer,
    author: InputBuffer,
    genre: InputBuffer,
    publisher: InputBuffer,
    price: InputBuffer,
    description: InputBuffer,
    image: InputBuffer,
    available: bool,
    error: Option<String>,
    saving: bool,
    /// Token of the save this form submitted.
    pending: Option<RequestToken>,
}

impl BookFormState {
    /// Empty form for a new book. New books start out available.
    pub fn create() -> Self {
        Self {
            editing: None,
            focused: FormField::Title,
            title: InputBuffer::new(),
            author: InputBuffer::new(),
            genre: InputBuffer::new(),
            publisher: InputBuffer::new(),
            price: InputBuffer::new(),
            description: InputBuffer::new(),
            image: InputBuffer::new(),
            available: true,
            error: None,
            saving: false,
            pending: None,
        }
    }

    /// Form pre-filled from an existing book.
    pub fn edit(book: &Book) -> Self {
        Self {
            editing: Some(book.id.clone()),
            title: InputBuffer::with_text(book.title.clone()),
            author: InputBuffer::with_text(book.author.clone()),
            genre: InputBuffer::with_text(book.genre.clone()),
            publisher: InputBuffer::with_text(book.publisher.clone()),
            price: InputBuffer::with_text(book.price.to_string()),
            description: InputBuffer::with_text(book.description.clone().unwrap_or_default()),
            available: book.available,
            ..Self::create()
        }
    }

    pub fn is_edit(&self) -> bool {
        self.editing.is_some()
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Remember which save the submitted draft went out as.
    pub fn submitted(&mut self, token: RequestToken) {
        self.pending = Some(token);
    }

    pub fn pending_save(&self) -> Option<RequestToken> {
        self.pending
    }

    /// The save was rejected; unlock the form and show why.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.saving = false;
        self.pending = None;
        self.error = Some(message.into());
    }

    fn buffer_mut(&mut self, field: FormField) -> Option<&mut InputBuffer> {
        match field {
            FormField::Title => Some(&mut self.title),
            FormField::Author => Some(&mut self.author),
            FormField::Genre => Some(&mut self.genre),
            FormField::Publisher => Some(&mut self.publisher),
            FormField::Price => Some(&mut self.price),
            FormField::Description => Some(&mut self.description),
            FormField::Image => Some(&mut self.image),
            FormField::Available => None,
        }
    }

    fn buffer(&self, field: FormField) -> Option<&InputBuffer> {
        match field {
            FormField::Title => Some(&self.title),
            FormField::Author => Some(&self.author),
            FormField::Genre => Some(&self.genre),
            FormField::Publisher => Some(&self.publisher),
            FormField::Price => Some(&self.price),
            FormField::Description => Some(&self.description),
            FormField::Image => Some(&self.image),
            FormField::Available => None,
        }
    }

    /// Check every field and build the payload.
    pub fn validate(&self) -> Result<BookDraft, String> {
        let required = [
            &self.title,
            &self.author,
            &self.genre,
            &self.publisher,
            &self.price,
        ];
        if required.iter().any(|b| b.text().trim().is_empty()) {
            return Err(REQUIRED_MESSAGE.to_string());
        }

        let price = self
            .price
            .text()
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|p| p.is_finite() && *p >= 0.0)
            .ok_or_else(|| PRICE_MESSAGE.to_string())?;

        let image_path = self.image.text().trim();
        let image = if image_path.is_empty() {
            None
        } else if Path::new(image_path).is_file() {
            Some(ImageUpload::new(image_path))
        } else {
            return Err(format!("Image file not found: {image_path}"));
        };

        Ok(BookDraft {
            title: self.title.text().trim().to_string(),
            author: self.author.text().trim().to_string(),
            genre: self.genre.text().trim().to_string(),
            publisher: self.publisher.text().trim().to_string(),
            available: self.available,
            description: self.description.text().trim().to_string(),
            price,
            image,
        })
    }

    // ── Input ────────────────────────────────────────────────────────────

    pub fn handle_input(&mut self, event: &Event) -> FormResult {
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = event
        else {
            return FormResult::Consumed;
        };

        if *code == KeyCode::Esc {
            return FormResult::Close;
        }
        // Locked until the catalog answers.
        if self.saving {
            return FormResult::Consumed;
        }

        match (*modifiers, *code) {
            (_, KeyCode::Tab | KeyCode::Down) => {
                self.focused = self.focused.next();
            }
            (_, KeyCode::BackTab | KeyCode::Up) => {
                self.focused = self.focused.prev();
            }
            (KeyModifiers::NONE, KeyCode::Enter) => return self.submit(),
            (_, KeyCode::Char(' ') | KeyCode::Left | KeyCode::Right)
                if self.focused == FormField::Available =>
            {
                self.available = !self.available;
            }
            (_, code) => {
                let field = self.focused;
                if let Some(buf) = self.buffer_mut(field) {
                    if buf.handle_key(code) {
                        self.error = None;
                    }
                }
            }
        }
        FormResult::Consumed
    }

    fn submit(&mut self) -> FormResult {
        match self.validate() {
            Ok(draft) => {
                self.error = None;
                self.saving = true;
                FormResult::Submit(self.editing.clone(), draft)
            }
            Err(message) => {
                self.error = Some(message);
                FormResult::Consumed
            }
        }
    }

    // ── Rendering ────────────────────────────────────────────────────────

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let modal_area = centered_fixed(64, 23, area);
        let title = if self.is_edit() {
            " Edit Book "
        } else {
            " Add Book "
        };
        let block = Block::default()
            .title(title)
            .title_alignment(Alignment::Center)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme::ACCENT));

        let mut lines = vec![Line::raw("")];
        for field in FormField::ALL {
            self.push_field(&mut lines, field);
        }
        lines.push(Line::raw(""));

        if self.saving {
            lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled("Saving...", theme::muted()),
            ]));
        } else if let Some(ref err) = self.error {
            lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(err.clone(), Style::default().fg(theme::ERROR).bold()),
            ]));
        } else {
            lines.push(Line::raw(""));
        }

        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled("Tab", theme::muted()),
            Span::raw(":next  "),
            Span::styled("Spc", theme::muted()),
            Span::raw(":toggle  "),
            Span::styled("Enter", theme::muted()),
            Span::raw(":save  "),
            Span::styled("Esc", theme::muted()),
            Span::raw(":cancel"),
        ]));

        frame.render_widget(Clear, modal_area);
        frame.render_widget(Paragraph::new(lines).block(block), modal_area);
    }

    fn push_field(&self, lines: &mut Vec<Line<'static>>, field: FormField) {
        let focused = self.focused == field;
        let label_style = if focused {
            theme::focused_label()
        } else {
            theme::muted()
        };
        let pointer = if focused { "\u{25b8} " } else { "  " };

        let value = match self.buffer(field) {
            Some(buf) if focused => buf.display_with_cursor(),
            Some(buf) => buf.text().to_string(),
            None if self.available => "[x] yes".to_string(),
            None => "[ ] no".to_string(),
        };
        let value_style = if focused {
            Style::default().fg(theme::TEXT)
        } else {
            theme::muted()
        };

        lines.push(Line::from(vec![
            Span::styled(pointer, Style::default().fg(theme::ACCENT)),
            Span::styled(format!("{:<30}", field.label()), label_style),
            Span::styled(value, value_style),
        ]));
        if field == FormField::Publisher || field == FormField::Available {
            lines.push(Line::raw(""));
        }
    }
}

/// Compute a centered rectangle with fixed dimensions.
fn centered_fixed(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}
