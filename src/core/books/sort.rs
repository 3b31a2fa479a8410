//! Column sort state for the books table.
//!
//! Sorting is applied to the page currently on screen; it is never sent to
//! the catalog and changing it does not refetch.

use std::cmp::Ordering;

use crate::core::catalog::Book;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SortField {
    Title,
    Author,
    Genre,
    Publisher,
    Price,
    Available,
}

impl SortField {
    /// All columns in display order.
    pub const ALL: [SortField; 6] = [
        Self::Title,
        Self::Author,
        Self::Genre,
        Self::Publisher,
        Self::Price,
        Self::Available,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Title => "Title",
            Self::Author => "Author",
            Self::Genre => "Genre",
            Self::Publisher => "Publisher",
            Self::Price => "Price",
            Self::Available => "Available",
        }
    }

    fn compare(self, a: &Book, b: &Book) -> Ordering {
        match self {
            Self::Title => cmp_text(&a.title, &b.title),
            Self::Author => cmp_text(&a.author, &b.author),
            Self::Genre => cmp_text(&a.genre, &b.genre),
            Self::Publisher => cmp_text(&a.publisher, &b.publisher),
            Self::Price => a.price.total_cmp(&b.price),
            Self::Available => a.available.cmp(&b.available),
        }
    }
}

fn cmp_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    /// Arrow shown next to the active column header.
    pub fn arrow(self) -> &'static str {
        match self {
            Self::Asc => "\u{25b2}",
            Self::Desc => "\u{25bc}",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SortState {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            field: SortField::Title,
            direction: SortDirection::Asc,
        }
    }
}

impl SortState {
    /// Reselecting the active column flips the direction; picking another
    /// column keeps whatever direction was last active.
    pub fn select_column(&mut self, field: SortField) {
        if self.field == field {
            self.direction = self.direction.flipped();
        } else {
            self.field = field;
        }
    }

    /// Stable sort of `books` by the active column.
    pub fn apply(&self, books: &mut [Book]) {
        books.sort_by(|a, b| {
            let ord = self.field.compare(a, b);
            match self.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });
    }
}
