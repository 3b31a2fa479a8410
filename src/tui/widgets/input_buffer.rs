//! Single-line text input with cursor management.
//!
//! Shared by the search bar, the filter panel and the book form.

use crossterm::event::KeyCode;

/// A simple text input buffer with cursor positioning.
#[derive(Clone, Debug, Default)]
pub struct InputBuffer {
    content: String,
    cursor: usize,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer pre-filled with `text`, cursor at the end.
    pub fn with_text(text: impl Into<String>) -> Self {
        let content = text.into();
        let cursor = content.len();
        Self { content, cursor }
    }

    /// Apply an editing key. Returns `true` when the text changed; cursor
    /// movement alone returns `false`.
    pub fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char(c) => {
                self.insert_char(c);
                true
            }
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Left => {
                self.move_left();
                false
            }
            KeyCode::Right => {
                self.move_right();
                false
            }
            KeyCode::Home => {
                self.cursor = 0;
                false
            }
            KeyCode::End => {
                self.cursor = self.content.len();
                false
            }
            _ => false,
        }
    }

    pub fn insert_char(&mut self, c: char) {
        self.content.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let prev = self.content[..self.cursor]
            .char_indices()
            .next_back()
            .map(|(i, _)| i)
            .unwrap_or(0);
        self.content.drain(prev..self.cursor);
        self.cursor = prev;
        true
    }

    pub fn delete(&mut self) -> bool {
        if self.cursor >= self.content.len() {
            return false;
        }
        let next = self.content[self.cursor..]
            .char_indices()
            .nth(1)
            .map(|(i, _)| self.cursor + i)
            .unwrap_or(self.content.len());
        self.content.drain(self.cursor..next);
        true
    }

    fn move_left(&mut self) {
        if self.cursor > 0 {
            self.cursor = self.content[..self.cursor]
                .char_indices()
                .next_back()
                .map(|(i, _)| i)
                .unwrap_or(0);
        }
    }

    fn move_right(&mut self) {
        if self.cursor < self.content.len() {
            self.cursor = self.content[self.cursor..]
                .char_indices()
                .nth(1)
                .map(|(i, _)| self.cursor + i)
                .unwrap_or(self.content.len());
        }
    }

    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
    }

    pub fn text(&self) -> &str {
        &self.content
    }

    /// Text with the cursor drawn as `_` at its byte position.
    pub fn display_with_cursor(&self) -> String {
        let mut shown = String::with_capacity(self.content.len() + 1);
        shown.push_str(&self.content[..self.cursor]);
        shown.push('_');
        shown.push_str(&self.content[self.cursor..]);
        shown
    }

    pub fn cursor_position(&self) -> usize {
        self.cursor
    }
}
