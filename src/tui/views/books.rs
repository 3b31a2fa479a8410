//! Books list view: filter panel, debounced title search, sortable table and
//! pagination, driving a [`ListController`].

use std::time::Instant;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};
use tokio::sync::mpsc;

use super::super::theme;
use super::book_form::{BookFormState, FormResult};
use crate::core::books::{FilterField, ListController, SaveState, SortField};
use crate::core::catalog::Book;
use crate::tui::events::{AppEvent, Notification, NotificationLevel};
use crate::tui::widgets::input_buffer::InputBuffer;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FocusZone {
    Table,
    Search,
    Filters,
}

pub struct BooksView {
    controller: ListController,
    focus: FocusZone,
    search_input: InputBuffer,
    /// Genre, publisher and author inputs, in `FilterField::ALL` order.
    filter_inputs: [InputBuffer; 3],
    /// Selected row of the filter panel (index into `FilterField::ALL`).
    filter_row: usize,
    selected: usize,
    form: Option<BookFormState>,
    event_tx: mpsc::UnboundedSender<AppEvent>,
}

impl BooksView {
    pub fn new(controller: ListController, event_tx: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self {
            controller,
            focus: FocusZone::Table,
            search_input: InputBuffer::new(),
            filter_inputs: Default::default(),
            filter_row: 0,
            selected: 0,
            form: None,
            event_tx,
        }
    }

    pub fn start(&mut self) {
        self.controller.start();
    }

    pub fn teardown(&mut self) {
        self.controller.teardown();
    }

    pub fn has_modal(&self) -> bool {
        self.form.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.controller.is_loading()
    }

    fn selected_book(&self) -> Option<&Book> {
        self.controller.books().get(self.selected)
    }

    fn notify(&self, message: impl Into<String>, level: NotificationLevel) {
        let _ = self
            .event_tx
            .send(AppEvent::Notification(Notification::new(message, level)));
    }

    // ── Tick ─────────────────────────────────────────────────────────────

    pub fn tick(&mut self, now: Instant) {
        self.controller.tick(now);

        let last = self.controller.books().len().saturating_sub(1);
        self.selected = self.selected.min(last);

        while let Some(finished) = self.controller.take_finished_save() {
            self.finish_save(finished);
        }
    }

    /// Report a finished save. Only the form that submitted it is closed or
    /// marked failed; a save from an already dismissed form only notifies.
    fn finish_save(&mut self, finished: SaveState) {
        let owned = finished.token().is_some()
            && self
                .form
                .as_ref()
                .is_some_and(|form| form.pending_save() == finished.token());

        match finished {
            SaveState::Saved { book, .. } => {
                let verb = match self.form {
                    Some(ref form) if owned && form.is_edit() => "Updated",
                    Some(_) if owned => "Added",
                    _ => "Saved",
                };
                self.notify(
                    format!("{verb} \"{}\"", book.title),
                    NotificationLevel::Success,
                );
                if owned {
                    self.form = None;
                }
            }
            SaveState::Failed { message, .. } => match self.form {
                Some(ref mut form) if owned => form.fail(message),
                _ => self.notify(format!("Save failed: {message}"), NotificationLevel::Error),
            },
            SaveState::Idle | SaveState::Saving(_) => {}
        }
    }

    // ── Input ────────────────────────────────────────────────────────────

    /// Returns true if the event was consumed.
    pub fn handle_input(&mut self, event: &Event) -> bool {
        if let Some(ref mut form) = self.form {
            match form.handle_input(event) {
                FormResult::Consumed => {}
                FormResult::Submit(id, draft) => match self.controller.save(id, draft) {
                    Some(token) => form.submitted(token),
                    None => form.fail("The catalog is no longer available".to_string()),
                },
                FormResult::Close => self.form = None,
            }
            return true;
        }

        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = event
        else {
            return false;
        };

        match self.focus {
            FocusZone::Search => self.handle_search_input(*code),
            FocusZone::Filters => self.handle_filter_input(*code),
            FocusZone::Table => self.handle_table_input(*code, *modifiers),
        }
    }

    fn handle_table_input(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        if modifiers.contains(KeyModifiers::CONTROL) {
            return false;
        }
        match code {
            KeyCode::Char('/') => self.focus = FocusZone::Search,
            KeyCode::Tab => self.focus = FocusZone::Filters,
            KeyCode::Char('j') | KeyCode::Down => {
                let last = self.controller.books().len().saturating_sub(1);
                self.selected = (self.selected + 1).min(last);
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Char(c @ '1'..='6') => {
                let idx = (c as usize) - ('1' as usize);
                self.controller.on_sort_column(SortField::ALL[idx]);
            }
            KeyCode::Char('l' | 'n') | KeyCode::Right | KeyCode::PageDown => {
                self.controller.next_page();
                self.selected = 0;
            }
            KeyCode::Char('h' | 'p') | KeyCode::Left | KeyCode::PageUp => {
                self.controller.prev_page();
                self.selected = 0;
            }
            KeyCode::Char('r') => self.controller.refresh(),
            KeyCode::Char('a') => self.form = Some(BookFormState::create()),
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(form) = self.selected_book().map(BookFormState::edit) {
                    self.form = Some(form);
                }
            }
            KeyCode::Char('c') => self.clear_filters(),
            _ => return false,
        }
        true
    }

    fn handle_search_input(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Esc => {
                self.search_input.clear();
                self.controller.on_search_changed("", Instant::now());
                self.focus = FocusZone::Table;
            }
            KeyCode::Enter => self.focus = FocusZone::Table,
            KeyCode::Tab => self.focus = FocusZone::Filters,
            code => {
                if self.search_input.handle_key(code) {
                    self.controller
                        .on_search_changed(self.search_input.text(), Instant::now());
                }
            }
        }
        true // Consume to avoid pass-through
    }

    fn handle_filter_input(&mut self, code: KeyCode) -> bool {
        let field = FilterField::ALL[self.filter_row];
        match code {
            KeyCode::Esc | KeyCode::Tab | KeyCode::Enter => self.focus = FocusZone::Table,
            KeyCode::BackTab => self.focus = FocusZone::Search,
            KeyCode::Down => {
                self.filter_row = (self.filter_row + 1) % FilterField::ALL.len();
            }
            KeyCode::Up => {
                self.filter_row =
                    (self.filter_row + FilterField::ALL.len() - 1) % FilterField::ALL.len();
            }
            KeyCode::Char(' ') | KeyCode::Left | KeyCode::Right
                if field == FilterField::Availability =>
            {
                let next = self.controller.filters().availability().next();
                self.controller.on_availability_changed(next);
            }
            code => {
                if let Some(buf) = self.filter_inputs.get_mut(self.filter_row) {
                    if buf.handle_key(code) {
                        self.controller.on_filter_changed(field, buf.text());
                    }
                }
            }
        }
        true
    }

    fn clear_filters(&mut self) {
        self.search_input.clear();
        for buf in &mut self.filter_inputs {
            buf.clear();
        }
        self.controller.clear_filters();
        self.selected = 0;
    }

    // ── Rendering ────────────────────────────────────────────────────────

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" Books ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme::TEXT_MUTED));

        let inner = block.inner(area);
        frame.render_widget(block, area);

        let h_chunks =
            Layout::horizontal([Constraint::Length(28), Constraint::Min(30)]).split(inner);

        self.render_filter_panel(frame, h_chunks[0]);

        let v_chunks = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(h_chunks[1]);

        self.render_search_bar(frame, v_chunks[0]);
        self.render_table(frame, v_chunks[1]);
        self.render_footer(frame, v_chunks[2]);

        if let Some(ref form) = self.form {
            form.render(frame, area);
        }
    }

    fn render_filter_panel(&self, frame: &mut Frame, area: Rect) {
        let focused = self.focus == FocusZone::Filters;
        let block = theme::block("Filters", focused);
        let panel_inner = block.inner(area);
        frame.render_widget(block, area);

        let filters = self.controller.filters();
        let mut lines: Vec<Line<'static>> = Vec::new();

        for (i, field) in FilterField::ALL.iter().enumerate() {
            let is_selected = focused && self.filter_row == i;
            let label_style = if is_selected {
                theme::focused_label()
            } else {
                theme::muted()
            };
            let pointer = if is_selected { " \u{25b8} " } else { "   " };

            let value = match self.filter_inputs.get(i) {
                Some(buf) if is_selected => buf.display_with_cursor(),
                Some(buf) if buf.text().is_empty() => "Any".to_string(),
                Some(buf) => buf.text().to_string(),
                None => filters.availability().label().to_string(),
            };
            let value_style = if filters.field(*field).is_empty() && !is_selected {
                theme::dim()
            } else {
                Style::default().fg(theme::TEXT)
            };

            lines.push(Line::from(vec![
                Span::styled(pointer, Style::default().fg(theme::ACCENT)),
                Span::styled(field.label(), label_style),
            ]));
            lines.push(Line::from(vec![
                Span::raw("   "),
                Span::styled(value, value_style),
            ]));
        }

        lines.push(Line::raw(""));
        lines.push(Line::from(vec![
            Span::styled(" \u{2191}\u{2193}", theme::key_hint()),
            Span::raw(":row "),
            Span::styled("Spc", theme::key_hint()),
            Span::raw(":cycle"),
        ]));

        frame.render_widget(Paragraph::new(lines), panel_inner);
    }

    fn render_search_bar(&self, frame: &mut Frame, area: Rect) {
        let search_focused = self.focus == FocusZone::Search;
        let query_text = self.search_input.text();

        let prefix_style = if search_focused {
            theme::focused_label()
        } else {
            theme::dim()
        };

        let (display_text, input_style) = if search_focused {
            (
                self.search_input.display_with_cursor(),
                Style::default().fg(theme::TEXT),
            )
        } else if query_text.is_empty() {
            ("Press / to search titles...".to_string(), theme::dim())
        } else {
            (query_text.to_string(), Style::default().fg(theme::TEXT))
        };

        let mut spans = vec![
            Span::styled(" [/] Title: ", prefix_style),
            Span::styled(display_text, input_style),
        ];
        if self.controller.search_pending() {
            spans.push(Span::styled("  \u{2026}", theme::dim()));
        }

        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_table(&self, frame: &mut Frame, area: Rect) {
        let books = self.controller.books();

        if books.is_empty() {
            let message = if let Some(err) = self.controller.error() {
                Span::styled(err.to_string(), Style::default().fg(theme::ERROR))
            } else if self.controller.is_loading() {
                Span::styled("Loading books...", theme::muted())
            } else if self.controller.filters().has_predicates() {
                Span::styled(
                    "No books match the current filters. Press c to clear.",
                    theme::muted(),
                )
            } else {
                Span::styled("No books yet. Press a to add one.", theme::muted())
            };
            let placeholder = Paragraph::new(vec![
                Line::raw(""),
                Line::from(vec![Span::raw("  "), message]),
            ]);
            frame.render_widget(placeholder, area);
            return;
        }

        let sort = self.controller.sort();
        let header = Row::new(SortField::ALL.iter().enumerate().map(|(i, field)| {
            let mut label = format!("{} {}", i + 1, field.label());
            if *field == sort.field {
                label.push(' ');
                label.push_str(sort.direction.arrow());
            }
            Cell::from(label)
        }))
        .style(theme::heading());

        let rows = books.iter().map(|book| {
            let (available, style) = if book.available {
                ("yes", Style::default().fg(theme::SUCCESS))
            } else {
                ("no", theme::dim())
            };
            Row::new(vec![
                Cell::from(book.title.clone()),
                Cell::from(book.author.clone()),
                Cell::from(book.genre.clone()),
                Cell::from(book.publisher.clone()),
                Cell::from(format!("{:.2}", book.price)),
                Cell::from(Span::styled(available, style)),
            ])
        });

        let widths = [
            Constraint::Percentage(28),
            Constraint::Percentage(20),
            Constraint::Percentage(14),
            Constraint::Percentage(16),
            Constraint::Length(10),
            Constraint::Length(11),
        ];

        let table = Table::new(rows, widths)
            .header(header)
            .row_highlight_style(theme::highlight().add_modifier(Modifier::REVERSED))
            .highlight_symbol("\u{25b8} ");

        let mut state = TableState::default().with_selected(Some(self.selected));
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn render_footer(&self, frame: &mut Frame, area: Rect) {
        let info = self.controller.page_info();
        let page = match info.total_pages {
            Some(pages) => format!(" Page {} of {pages}", info.page),
            None => format!(" Page {}", info.page),
        };

        let mut spans = vec![Span::styled(page, theme::heading())];
        if let Some(total) = info.total {
            spans.push(Span::styled(format!(" \u{00b7} {total} books"), theme::muted()));
        }
        if self.controller.is_loading() {
            spans.push(Span::styled("  loading", Style::default().fg(theme::PRIMARY_LIGHT)));
        }

        let prev = if info.has_prev() { theme::key_hint() } else { theme::dim() };
        spans.extend([
            Span::raw("  "),
            Span::styled("h", prev),
            Span::raw(":prev "),
            Span::styled("l", theme::key_hint()),
            Span::raw(if info.has_next { ":next " } else { ":last " }),
            Span::styled("1-6", theme::key_hint()),
            Span::raw(":sort "),
            Span::styled("a", theme::key_hint()),
            Span::raw(":add "),
            Span::styled("e", theme::key_hint()),
            Span::raw(":edit "),
            Span::styled("r", theme::key_hint()),
            Span::raw(":refresh"),
        ]);

        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ListConfig;
    use crate::core::books::{Availability, SortDirection};
    use crate::core::catalog::{BookDraft, BookId, BookPage, CatalogError, MockCatalogApi};
    use std::sync::Arc;

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn view_with(api: MockCatalogApi) -> (BooksView, mpsc::UnboundedReceiver<AppEvent>) {
        let controller = ListController::new(Arc::new(api), &ListConfig::default());
        let (tx, rx) = mpsc::unbounded_channel();
        (BooksView::new(controller, tx), rx)
    }

    fn view() -> (BooksView, mpsc::UnboundedReceiver<AppEvent>) {
        let mut api = MockCatalogApi::new();
        api.expect_list_books()
            .returning(|_| Ok(BookPage::default()));
        view_with(api)
    }

    fn created(draft: &BookDraft) -> Book {
        Book {
            id: BookId::new("1"),
            title: draft.title.clone(),
            author: draft.author.clone(),
            genre: draft.genre.clone(),
            publisher: draft.publisher.clone(),
            available: draft.available,
            description: None,
            price: draft.price,
            image: None,
        }
    }

    /// Type title through price into the open form and tab past each.
    fn fill_form(view: &mut BooksView, title: &str) {
        for value in [title, "Frank Herbert", "Fiction", "Ace", "9.5"] {
            for c in value.chars() {
                view.handle_input(&key(KeyCode::Char(c)));
            }
            view.handle_input(&key(KeyCode::Tab));
        }
    }

    fn notifications(
        rx: &mut mpsc::UnboundedReceiver<AppEvent>,
    ) -> Vec<(String, NotificationLevel)> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let AppEvent::Notification(n) = event {
                out.push((n.message, n.level));
            }
        }
        out
    }

    #[tokio::test]
    async fn test_books_view_new() {
        let (view, _rx) = view();
        assert_eq!(view.focus, FocusZone::Table);
        assert!(!view.has_modal());
        assert_eq!(view.selected, 0);
    }

    #[tokio::test]
    async fn test_search_typing_is_debounced_and_escape_clears() {
        let (mut view, _rx) = view();
        assert!(view.handle_input(&key(KeyCode::Char('/'))));
        assert_eq!(view.focus, FocusZone::Search);

        view.handle_input(&key(KeyCode::Char('d')));
        assert_eq!(view.search_input.text(), "d");
        assert!(view.controller.search_pending());
        assert_eq!(view.controller.current_query().title, None);

        view.handle_input(&key(KeyCode::Esc));
        assert!(view.search_input.text().is_empty());
        assert_eq!(view.focus, FocusZone::Table);
        assert_eq!(view.controller.filters().title(), "");
    }

    #[tokio::test]
    async fn test_quit_key_passes_through_only_from_table() {
        let (mut view, _rx) = view();
        assert!(!view.handle_input(&key(KeyCode::Char('q'))));

        view.handle_input(&key(KeyCode::Char('/')));
        assert!(view.handle_input(&key(KeyCode::Char('q'))));
        assert_eq!(view.search_input.text(), "q");
    }

    #[tokio::test]
    async fn test_number_keys_select_sort_column() {
        let (mut view, _rx) = view();
        view.handle_input(&key(KeyCode::Char('2')));
        assert_eq!(view.controller.sort().field, SortField::Author);
        assert_eq!(view.controller.sort().direction, SortDirection::Asc);

        view.handle_input(&key(KeyCode::Char('2')));
        assert_eq!(view.controller.sort().direction, SortDirection::Desc);
    }

    #[tokio::test]
    async fn test_filter_panel_routes_text_and_availability() {
        let (mut view, _rx) = view();
        view.handle_input(&key(KeyCode::Tab));
        assert_eq!(view.focus, FocusZone::Filters);

        for c in "Fic".chars() {
            view.handle_input(&key(KeyCode::Char(c)));
        }
        assert_eq!(view.controller.filters().genre(), "Fic");
        assert_eq!(view.controller.current_query().genre.as_deref(), Some("Fic"));

        // Down to the availability row.
        for _ in 0..3 {
            view.handle_input(&key(KeyCode::Down));
        }
        view.handle_input(&key(KeyCode::Char(' ')));
        assert_eq!(
            view.controller.filters().availability(),
            Availability::Unset.next()
        );
    }

    #[tokio::test]
    async fn test_clear_resets_inputs_and_filters() {
        let (mut view, _rx) = view();
        view.handle_input(&key(KeyCode::Tab));
        view.handle_input(&key(KeyCode::Char('X')));
        view.handle_input(&key(KeyCode::Esc));

        view.handle_input(&key(KeyCode::Char('c')));
        assert!(view.filter_inputs.iter().all(|b| b.text().is_empty()));
        assert!(!view.controller.filters().has_predicates());
    }

    #[tokio::test]
    async fn test_add_opens_form_and_escape_closes() {
        let (mut view, _rx) = view();
        view.handle_input(&key(KeyCode::Char('a')));
        assert!(view.has_modal());
        assert!(!view.form.as_ref().unwrap().is_edit());

        view.handle_input(&key(KeyCode::Esc));
        assert!(!view.has_modal());
    }

    #[tokio::test]
    async fn test_saved_form_closes_with_added_notice() {
        let mut api = MockCatalogApi::new();
        api.expect_list_books().returning(|_| Ok(BookPage::default()));
        api.expect_create_book().times(1).returning(|d| Ok(created(d)));
        let (mut view, mut rx) = view_with(api);

        view.handle_input(&key(KeyCode::Char('a')));
        fill_form(&mut view, "Dune");
        view.handle_input(&key(KeyCode::Enter));
        assert!(view.form.as_ref().unwrap().pending_save().is_some());

        view.controller.wait_for_save().await;
        view.tick(Instant::now());

        assert!(!view.has_modal());
        assert_eq!(
            notifications(&mut rx),
            [("Added \"Dune\"".to_string(), NotificationLevel::Success)]
        );
    }

    #[tokio::test]
    async fn test_save_from_dismissed_form_leaves_new_form_alone() {
        let mut api = MockCatalogApi::new();
        api.expect_list_books().returning(|_| Ok(BookPage::default()));
        api.expect_create_book().times(1).returning(|d| Ok(created(d)));
        let (mut view, mut rx) = view_with(api);

        view.handle_input(&key(KeyCode::Char('a')));
        fill_form(&mut view, "Dune");
        view.handle_input(&key(KeyCode::Enter));
        view.handle_input(&key(KeyCode::Esc));
        assert!(!view.has_modal());

        view.handle_input(&key(KeyCode::Char('a')));
        fill_form(&mut view, "Half typed");

        view.controller.wait_for_save().await;
        view.tick(Instant::now());

        let form = view.form.as_ref().expect("new form stays open");
        assert!(!form.is_saving());
        assert!(form.error().is_none());
        assert_eq!(form.validate().unwrap().title, "Half typed");
        assert_eq!(
            notifications(&mut rx),
            [("Saved \"Dune\"".to_string(), NotificationLevel::Success)]
        );
    }

    #[tokio::test]
    async fn test_rejection_for_dismissed_form_is_only_notified() {
        let mut api = MockCatalogApi::new();
        api.expect_list_books().never();
        api.expect_create_book()
            .times(1)
            .returning(|_| Err(CatalogError::Validation("price must be positive".into())));
        let (mut view, mut rx) = view_with(api);

        view.handle_input(&key(KeyCode::Char('a')));
        fill_form(&mut view, "Dune");
        view.handle_input(&key(KeyCode::Enter));
        view.handle_input(&key(KeyCode::Esc));
        view.handle_input(&key(KeyCode::Char('a')));

        view.controller.wait_for_save().await;
        view.tick(Instant::now());

        let form = view.form.as_ref().expect("new form stays open");
        assert!(form.error().is_none());
        assert_eq!(
            notifications(&mut rx),
            [(
                "Save failed: price must be positive".to_string(),
                NotificationLevel::Error
            )]
        );
    }

    #[tokio::test]
    async fn test_edit_without_rows_does_nothing() {
        let (mut view, _rx) = view();
        assert!(view.handle_input(&key(KeyCode::Char('e'))));
        assert!(!view.has_modal());
    }
}
