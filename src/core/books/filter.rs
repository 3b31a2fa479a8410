//! Filter predicates, page number and sort state for the books list.

use super::sort::{SortField, SortState};

// ── Availability ────────────────────────────────────────────────────────────

/// Tri-state availability selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Availability {
    /// No availability predicate.
    #[default]
    Unset,
    Available,
    Unavailable,
}

impl Availability {
    /// Parse the selector encoding `""`, `"true"`, `"false"`. Anything else
    /// is treated as unset.
    pub fn from_selector(value: &str) -> Self {
        match value.trim() {
            "true" => Self::Available,
            "false" => Self::Unavailable,
            _ => Self::Unset,
        }
    }

    pub fn as_selector(self) -> &'static str {
        match self {
            Self::Unset => "",
            Self::Available => "true",
            Self::Unavailable => "false",
        }
    }

    /// `None` when unset.
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Self::Unset => None,
            Self::Available => Some(true),
            Self::Unavailable => Some(false),
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::Unset => Self::Available,
            Self::Available => Self::Unavailable,
            Self::Unavailable => Self::Unset,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Unset => "Any",
            Self::Available => "Available",
            Self::Unavailable => "Not available",
        }
    }
}

// ── Filter fields ───────────────────────────────────────────────────────────

/// Named filter inputs, for callers that route a generic "field changed"
/// event (the free-text title search has its own debounced path).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterField {
    Genre,
    Publisher,
    Author,
    Availability,
}

impl FilterField {
    pub const ALL: [FilterField; 4] = [
        Self::Genre,
        Self::Publisher,
        Self::Author,
        Self::Availability,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Genre => "Genre",
            Self::Publisher => "Publisher",
            Self::Author => "Author",
            Self::Availability => "Availability",
        }
    }
}

// ── Filter state ────────────────────────────────────────────────────────────

/// Current user-entered list state.
///
/// Every setter except [`FilterState::set_page`] and
/// [`FilterState::select_sort_column`] sends the view back to page 1.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterState {
    title: String,
    genre: String,
    publisher: String,
    author: String,
    availability: Availability,
    page: u32,
    sort: SortState,
}

impl Default for FilterState {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterState {
    pub fn new() -> Self {
        Self {
            title: String::new(),
            genre: String::new(),
            publisher: String::new(),
            author: String::new(),
            availability: Availability::Unset,
            page: 1,
            sort: SortState::default(),
        }
    }

    // ── Accessors ───────────────────────────────────────────────────────

    /// Raw (not yet debounced) title search text.
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn genre(&self) -> &str {
        &self.genre
    }

    pub fn publisher(&self) -> &str {
        &self.publisher
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn availability(&self) -> Availability {
        self.availability
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn sort(&self) -> SortState {
        self.sort
    }

    /// Text value of a named field.
    pub fn field(&self, field: FilterField) -> &str {
        match field {
            FilterField::Genre => &self.genre,
            FilterField::Publisher => &self.publisher,
            FilterField::Author => &self.author,
            FilterField::Availability => self.availability.as_selector(),
        }
    }

    // ── Setters ─────────────────────────────────────────────────────────

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.page = 1;
    }

    pub fn set_genre(&mut self, genre: impl Into<String>) {
        self.genre = genre.into();
        self.page = 1;
    }

    pub fn set_publisher(&mut self, publisher: impl Into<String>) {
        self.publisher = publisher.into();
        self.page = 1;
    }

    pub fn set_author(&mut self, author: impl Into<String>) {
        self.author = author.into();
        self.page = 1;
    }

    pub fn set_availability(&mut self, availability: Availability) {
        self.availability = availability;
        self.page = 1;
    }

    /// Route a named field change. Availability takes selector encoding.
    pub fn set_field(&mut self, field: FilterField, value: &str) {
        match field {
            FilterField::Genre => self.set_genre(value),
            FilterField::Publisher => self.set_publisher(value),
            FilterField::Author => self.set_author(value),
            FilterField::Availability => self.set_availability(Availability::from_selector(value)),
        }
    }

    /// Pages are 1-based; 0 is clamped to 1.
    pub fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    pub fn select_sort_column(&mut self, field: SortField) {
        self.sort.select_column(field);
    }

    /// Drop every predicate. Sort is kept.
    pub fn clear(&mut self) {
        self.title.clear();
        self.genre.clear();
        self.publisher.clear();
        self.author.clear();
        self.availability = Availability::Unset;
        self.page = 1;
    }

    /// Whether any predicate is active. Page and sort don't count.
    pub fn has_predicates(&self) -> bool {
        !self.title.is_empty()
            || !self.genre.is_empty()
            || !self.publisher.is_empty()
            || !self.author.is_empty()
            || self.availability != Availability::Unset
    }
}
