use std::mem;

use anyhow::{anyhow, bail, Context, Result};
use crossbeam::channel::Receiver;
use crossterm::event::KeyCode;
use open::that as open_link;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::contract::{parse_id, BookColumn, COLUMN_ID};
use crate::db::{BookProvider, BookValues, ChangeEvent};
use crate::models::Book;
use crate::money::format_price;

use super::forms::{
    BookField, ConfirmBookDelete, ConfirmDeleteAll, ConfirmLeaveEditor, LeaveChoice, PriceRules,
};
use super::helpers::{centered_rect, international_number, surface_error};
use super::screens::{BookEditor, BookListScreen};

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
/// Rows skipped by PageUp/PageDown in the book list.
const PAGE_STEP: isize = 5;

/// Which view owns the content area.
enum Screen {
    List,
    Editor(BookEditor),
}

/// Dialogs layered over the current screen.
enum Mode {
    Normal,
    ConfirmDelete(ConfirmBookDelete),
    ConfirmDeleteAll(ConfirmDeleteAll),
    ConfirmLeave(ConfirmLeaveEditor),
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state shared across the TUI.
pub struct App {
    provider: BookProvider,
    config: AppConfig,
    changes: Receiver<ChangeEvent>,
    list: BookListScreen,
    screen: Screen,
    mode: Mode,
    status: Option<StatusMessage>,
    focus_after_reload: Option<i64>,
}

impl App {
    /// Load the books and start listening for changes to the collection.
    pub fn new(provider: BookProvider, config: AppConfig) -> Result<Self> {
        let books_uri = provider.contract().content_uri();
        let changes = provider.subscribe(&books_uri, true);
        let books = provider
            .query(&books_uri, None, Some(COLUMN_ID))
            .context("failed to load books")?;

        Ok(Self {
            provider,
            config,
            changes,
            list: BookListScreen::new(books),
            screen: Screen::List,
            mode: Mode::Normal,
            status: None,
            focus_after_reload: None,
        })
    }

    /// Process a key press. Returns `true` when the app should exit.
    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mode = mem::replace(&mut self.mode, Mode::Normal);
        self.mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit)?,
            Mode::ConfirmDelete(confirm) => self.handle_confirm_delete(code, confirm),
            Mode::ConfirmDeleteAll(confirm) => self.handle_confirm_delete_all(code, confirm),
            Mode::ConfirmLeave(confirm) => self.handle_confirm_leave(code, confirm),
        };
        self.refresh_if_changed()?;
        Ok(exit)
    }

    /// Editor shortcuts bound to Ctrl: `s` save, `a`/`r` add or remove
    /// stock, `d` delete, `t` call the supplier.
    pub fn handle_ctrl(&mut self, ch: char) -> Result<()> {
        if !matches!(self.mode, Mode::Normal) {
            return Ok(());
        }
        let mut editor = match mem::replace(&mut self.screen, Screen::List) {
            Screen::Editor(editor) => editor,
            other => {
                self.screen = other;
                return Ok(());
            }
        };

        let mut keep_open = true;
        match ch {
            's' => keep_open = !self.try_save(&mut editor),
            'a' | 'r' => self.adjust_stock(&mut editor, ch == 'a'),
            'd' => match editor.book_id {
                Some(id) => {
                    self.mode = Mode::ConfirmDelete(ConfirmBookDelete {
                        id,
                        name: editor.form.name.trim().to_string(),
                    });
                }
                None => self.set_status("Save the book before deleting it.", StatusKind::Error),
            },
            't' => self.call_supplier(&editor),
            _ => {}
        }

        if keep_open {
            self.screen = Screen::Editor(editor);
        }
        self.refresh_if_changed()
    }

    /// Drain pending change events and re-query the list once if any arrived.
    pub fn refresh_if_changed(&mut self) -> Result<()> {
        let mut changed = false;
        while self.changes.try_recv().is_ok() {
            changed = true;
        }
        if changed {
            self.reload_books()?;
        }
        Ok(())
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let footer_height = FOOTER_HEIGHT.min(area.height);

        let (content_area, footer_area) = if area.height > footer_height {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(footer_height)])
                .split(area);
            (chunks[0], chunks[1])
        } else {
            (area, area)
        };

        match &self.screen {
            Screen::List => self.draw_book_list(frame, content_area),
            Screen::Editor(editor) => self.draw_editor(frame, content_area, editor),
        }

        if area.height >= footer_height {
            self.draw_footer(frame, footer_area);
        }

        match &self.mode {
            Mode::ConfirmDelete(confirm) => self.draw_confirm_delete(frame, area, confirm),
            Mode::ConfirmDeleteAll(confirm) => self.draw_confirm_delete_all(frame, area, confirm),
            Mode::ConfirmLeave(confirm) => self.draw_confirm_leave(frame, area, confirm),
            Mode::Normal => {}
        }
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        match mem::replace(&mut self.screen, Screen::List) {
            Screen::List => self.handle_list_key(code, exit),
            Screen::Editor(editor) => Ok(self.handle_editor_key(code, editor)),
        }
    }

    fn handle_list_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => *exit = true,
            KeyCode::Up | KeyCode::Char('k') => self.list.move_selection(-1),
            KeyCode::Down | KeyCode::Char('j') => self.list.move_selection(1),
            KeyCode::PageUp => self.list.move_selection(-PAGE_STEP),
            KeyCode::PageDown => self.list.move_selection(PAGE_STEP),
            KeyCode::Home => self.list.select_first(),
            KeyCode::End => self.list.select_last(),
            KeyCode::Enter => match self.list.current_book().cloned() {
                Some(book) => {
                    self.screen = Screen::Editor(BookEditor::edit(&book, self.price_rules()));
                    self.clear_status();
                }
                None => self.set_status("No book selected.", StatusKind::Error),
            },
            KeyCode::Char('+') | KeyCode::Char('a') => {
                self.screen = Screen::Editor(BookEditor::new_book(self.price_rules()));
                self.clear_status();
            }
            KeyCode::Char('s') => {
                if let Err(err) = self.sell_one() {
                    self.set_status(surface_error(&err), StatusKind::Error);
                }
            }
            KeyCode::Char('D') => {
                if self.list.books.is_empty() {
                    self.set_status("There are no books to delete.", StatusKind::Error);
                } else {
                    return Ok(Mode::ConfirmDeleteAll(ConfirmDeleteAll {
                        count: self.list.books.len(),
                    }));
                }
            }
            _ => {}
        }
        Ok(Mode::Normal)
    }

    fn handle_editor_key(&mut self, code: KeyCode, mut editor: BookEditor) -> Mode {
        let mut mode = Mode::Normal;
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                if editor.has_unsaved_changes() {
                    mode = Mode::ConfirmLeave(ConfirmLeaveEditor::new());
                } else {
                    keep_open = false;
                    self.clear_status();
                }
            }
            KeyCode::Tab | KeyCode::Down => editor.form.next_field(),
            KeyCode::BackTab | KeyCode::Up => editor.form.previous_field(),
            KeyCode::Backspace => editor.form.backspace(),
            KeyCode::Enter => keep_open = !self.try_save(&mut editor),
            KeyCode::Char(ch) => {
                if editor.form.push_char(ch) {
                    editor.form.error = None;
                }
            }
            _ => {}
        }
        if keep_open {
            self.screen = Screen::Editor(editor);
        }
        mode
    }

    fn handle_confirm_delete(&mut self, code: KeyCode, confirm: ConfirmBookDelete) -> Mode {
        match code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                match self.delete_book(&confirm) {
                    Ok(()) => Mode::Normal,
                    Err(err) => {
                        self.set_status(surface_error(&err), StatusKind::Error);
                        Mode::ConfirmDelete(confirm)
                    }
                }
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Mode::Normal
            }
            _ => Mode::ConfirmDelete(confirm),
        }
    }

    fn handle_confirm_delete_all(&mut self, code: KeyCode, confirm: ConfirmDeleteAll) -> Mode {
        match code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                match self.delete_all_books() {
                    Ok(()) => Mode::Normal,
                    Err(err) => {
                        self.set_status(surface_error(&err), StatusKind::Error);
                        Mode::ConfirmDeleteAll(confirm)
                    }
                }
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Mode::Normal
            }
            _ => Mode::ConfirmDeleteAll(confirm),
        }
    }

    fn handle_confirm_leave(&mut self, code: KeyCode, mut confirm: ConfirmLeaveEditor) -> Mode {
        match code {
            KeyCode::Esc => Mode::Normal,
            KeyCode::Left | KeyCode::Up | KeyCode::BackTab => {
                confirm.previous();
                Mode::ConfirmLeave(confirm)
            }
            KeyCode::Right | KeyCode::Down | KeyCode::Tab => {
                confirm.next();
                Mode::ConfirmLeave(confirm)
            }
            KeyCode::Enter => self.resolve_leave(confirm.selection),
            _ => Mode::ConfirmLeave(confirm),
        }
    }

    fn resolve_leave(&mut self, choice: LeaveChoice) -> Mode {
        match choice {
            LeaveChoice::KeepEditing => {}
            LeaveChoice::Discard => {
                self.screen = Screen::List;
                self.set_status("Changes discarded.", StatusKind::Info);
            }
            LeaveChoice::Save => {
                if let Screen::Editor(mut editor) = mem::replace(&mut self.screen, Screen::List) {
                    if !self.try_save(&mut editor) {
                        self.screen = Screen::Editor(editor);
                    }
                }
            }
        }
        Mode::Normal
    }

    fn price_rules(&self) -> PriceRules {
        PriceRules::from_config(&self.config)
    }

    /// Save the editor, reporting failures on the form. Returns whether the
    /// editor may close.
    fn try_save(&mut self, editor: &mut BookEditor) -> bool {
        match self.save_book(editor) {
            Ok(()) => true,
            Err(err) => {
                let message = surface_error(&err);
                editor.form.error = Some(message.clone());
                self.set_status(message, StatusKind::Error);
                false
            }
        }
    }

    fn save_book(&mut self, editor: &BookEditor) -> Result<()> {
        let values = editor.form.parse_inputs()?;
        let name = editor.form.name.trim();
        match editor.book_id {
            None => {
                let uri = self.provider.contract().content_uri();
                let created = self
                    .provider
                    .insert(&uri, &values)
                    .context("Error with saving book.")?;
                info!(uri = %created, "book added");
                self.focus_after_reload = parse_id(&created);
                self.set_status(format!("Added {name}."), StatusKind::Info);
            }
            Some(id) => {
                let uri = self.provider.contract().book_uri(id);
                let updated = self
                    .provider
                    .update(&uri, &values, None)
                    .context("Error with updating book.")?;
                if updated == 0 {
                    bail!("Error with updating book.");
                }
                self.focus_after_reload = Some(id);
                self.set_status(format!("Updated {name}."), StatusKind::Info);
            }
        }
        Ok(())
    }

    fn sell_one(&mut self) -> Result<()> {
        let Some(book) = self.list.current_book() else {
            bail!("No book selected.");
        };
        if book.quantity <= 0 {
            bail!("{} is out of stock.", book.name);
        }
        let (id, name, remaining) = (book.id, book.name.clone(), book.quantity - 1);

        let values = BookValues::new().with(BookColumn::Quantity, remaining);
        let uri = self.provider.contract().book_uri(id);
        let updated = self
            .provider
            .update(&uri, &values, None)
            .context("failed to record sale")?;
        if updated == 0 {
            bail!("Error with selling {name}.");
        }
        info!(id, remaining, "book sold");
        self.set_status(
            format!("Sold one copy of {name}. {remaining} left."),
            StatusKind::Info,
        );
        Ok(())
    }

    fn adjust_stock(&mut self, editor: &mut BookEditor, add: bool) {
        if !editor.form.is_existing() {
            self.set_status(
                "Enter the quantity directly for a new book.",
                StatusKind::Error,
            );
            return;
        }
        match editor.form.adjust_stock(add) {
            Ok(quantity) => {
                editor.form.error = None;
                self.set_status(format!("Stock now {quantity}."), StatusKind::Info);
            }
            Err(err) => self.set_status(surface_error(&err), StatusKind::Error),
        }
    }

    fn call_supplier(&mut self, editor: &BookEditor) {
        if editor.book_id.is_none() {
            self.set_status(
                "Save the book before calling the supplier.",
                StatusKind::Error,
            );
            return;
        }
        let Some(number) =
            international_number(&editor.form.supplier_phone, &self.config.country_code)
        else {
            self.set_status("No supplier phone number to call.", StatusKind::Error);
            return;
        };

        match open_link(format!("tel:{number}")) {
            Ok(()) => self.set_status(
                format!("Calling {} on {number}.", editor.form.supplier_name.trim()),
                StatusKind::Info,
            ),
            Err(err) => {
                error!(%err, number, "failed to open dialler");
                self.set_status(format!("Could not start the call: {err}"), StatusKind::Error);
            }
        }
    }

    fn delete_book(&mut self, confirm: &ConfirmBookDelete) -> Result<()> {
        let uri = self.provider.contract().book_uri(confirm.id);
        let deleted = self
            .provider
            .delete(&uri, None)
            .context("Error with deleting book.")?;
        if deleted == 0 {
            return Err(anyhow!("Error with deleting book."));
        }
        info!(id = confirm.id, "book deleted");
        self.screen = Screen::List;
        self.set_status(format!("Deleted {}.", confirm.name), StatusKind::Info);
        Ok(())
    }

    fn delete_all_books(&mut self) -> Result<()> {
        let uri = self.provider.contract().content_uri();
        let deleted = self
            .provider
            .delete(&uri, None)
            .context("Error with deleting books.")?;
        info!(deleted, "all books deleted");
        let plural = if deleted == 1 { "" } else { "s" };
        self.set_status(format!("Deleted {deleted} book{plural}."), StatusKind::Info);
        Ok(())
    }

    fn reload_books(&mut self) -> Result<()> {
        let uri = self.provider.contract().content_uri();
        let books = self
            .provider
            .query(&uri, None, Some(COLUMN_ID))
            .context("failed to reload books")?;
        let focus = self.focus_after_reload.take();
        self.list.set_books(books, focus);
        Ok(())
    }

    fn draw_book_list(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("Books ({})", self.list.books.len()));

        if self.list.books.is_empty() {
            let paragraph = Paragraph::new(vec![
                Line::from(""),
                Line::from("No books in stock yet."),
                Line::from(Span::styled(
                    "Press + to add the first one.",
                    Style::default().fg(Color::Gray),
                )),
            ])
            .alignment(Alignment::Center)
            .block(block);
            frame.render_widget(paragraph, area);
            return;
        }

        let items: Vec<ListItem> = self
            .list
            .books
            .iter()
            .map(|book| self.book_item(book))
            .collect();
        let list = List::new(items)
            .block(block)
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");

        let mut state = ListState::default();
        state.select(Some(self.list.selected));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn book_item(&self, book: &Book) -> ListItem<'static> {
        let authors = book.authors_display().unwrap_or("Unknown author").to_string();
        let stock_style = if book.quantity > 0 {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::Red)
        };

        ListItem::new(vec![
            Line::from(Span::styled(
                book.name.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(authors, Style::default().fg(Color::Gray))),
            Line::from(vec![
                Span::raw(format_price(book.price, &self.config.currency_symbol)),
                Span::raw("   "),
                Span::styled(format!("In stock: {}", book.quantity), stock_style),
            ]),
        ])
    }

    fn draw_editor(&self, frame: &mut Frame, area: Rect, editor: &BookEditor) {
        let block = Block::default().title(editor.title()).borders(Borders::ALL);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);
        let form = &editor.form;

        let mut lines = Vec::new();
        let mut cursor = None;
        for &field in form.fields() {
            if field == BookField::ChangeBy {
                lines.push(Line::from(vec![
                    Span::raw("In stock: "),
                    Span::styled(form.quantity.clone(), Style::default().fg(Color::Cyan)),
                ]));
            }
            if field == form.active {
                let offset = field.label().len() + 2 + form.value_len(field);
                cursor = Some((offset as u16, lines.len() as u16));
            }
            lines.push(form.build_line(field));
        }

        lines.push(Line::from(""));
        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Fields marked <required> must be filled before saving.",
                Style::default().fg(Color::Gray),
            )));
        }

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
        frame.render_widget(paragraph, inner);

        if let (Some((dx, dy)), Mode::Normal) = (cursor, &self.mode) {
            let cursor_x = (inner.x + dx).min(inner.right().saturating_sub(1));
            let cursor_y = inner.y + dy;
            if cursor_y < inner.bottom() {
                frame.set_cursor_position((cursor_x, cursor_y));
            }
        }
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let instructions = self.footer_instructions();

        let paragraph = Paragraph::new(vec![status_line, instructions]).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let keys: &[(&str, &str)] = match (&self.screen, &self.mode) {
            (_, Mode::ConfirmDelete(_)) | (_, Mode::ConfirmDeleteAll(_)) => {
                &[("[Y]", " Delete   "), ("[N/Esc]", " Cancel")]
            }
            (_, Mode::ConfirmLeave(_)) => &[
                ("[←→]", " Choose   "),
                ("[Enter]", " Confirm   "),
                ("[Esc]", " Keep Editing"),
            ],
            (Screen::List, Mode::Normal) => &[
                ("[↑↓]", " Navigate   "),
                ("[Enter]", " Edit   "),
                ("[+]", " Add   "),
                ("[S]", " Sell One   "),
                ("[Shift+D]", " Delete All   "),
                ("[Q]", " Quit"),
            ],
            (Screen::Editor(editor), Mode::Normal) if editor.book_id.is_some() => &[
                ("[Tab]", " Next   "),
                ("[Enter]", " Save   "),
                ("[Ctrl+A/R]", " Add/Remove Stock   "),
                ("[Ctrl+T]", " Call Supplier   "),
                ("[Ctrl+D]", " Delete   "),
                ("[Esc]", " Back"),
            ],
            (Screen::Editor(_), Mode::Normal) => &[
                ("[Tab]", " Next   "),
                ("[Enter]", " Save   "),
                ("[Esc]", " Back"),
            ],
        };

        let spans: Vec<Span<'static>> = keys
            .iter()
            .flat_map(|(key, action)| {
                [
                    Span::styled(key.to_string(), key_style),
                    Span::raw(action.to_string()),
                ]
            })
            .collect();
        Line::from(spans)
    }

    fn draw_confirm_delete(&self, frame: &mut Frame, area: Rect, confirm: &ConfirmBookDelete) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Delete Book")
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            Line::from(format!("Delete '{}'?", confirm.name)),
            Line::from("This cannot be undone."),
            Line::from(""),
            Line::from(Span::styled(
                "Press Y to confirm or N / Esc to cancel.",
                Style::default().fg(Color::Gray),
            )),
        ];

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn draw_confirm_delete_all(&self, frame: &mut Frame, area: Rect, confirm: &ConfirmDeleteAll) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Delete All Books")
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let plural = if confirm.count == 1 { "" } else { "s" };
        let lines = vec![
            Line::from(format!(
                "Delete all {} book{plural} from the inventory?",
                confirm.count
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Press Y to confirm or N / Esc to cancel.",
                Style::default().fg(Color::Gray),
            )),
        ];

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn draw_confirm_leave(&self, frame: &mut Frame, area: Rect, confirm: &ConfirmLeaveEditor) {
        let popup_area = centered_rect(70, 40, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Unsaved Changes")
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut option_spans = Vec::new();
        for (idx, label) in confirm.labels().iter().enumerate() {
            if idx > 0 {
                option_spans.push(Span::raw("   "));
            }
            let style = if confirm.selected_index() == idx {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            option_spans.push(Span::styled(*label, style));
        }

        let lines = vec![
            Line::from("You have unsaved changes."),
            Line::from(""),
            Line::from(option_spans),
            Line::from(""),
            Line::from(Span::styled(
                "Use ←/→ to choose • Enter to confirm • Esc to keep editing",
                Style::default().fg(Color::Gray),
            )),
        ];

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::BookContract;
    use crate::db::{open_in_memory, DATABASE_VERSION};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn app() -> App {
        let conn = open_in_memory(DATABASE_VERSION).unwrap();
        let provider = BookProvider::with_contract(conn, BookContract::default());
        App::new(provider, AppConfig::default()).unwrap()
    }

    fn stock(app: &App, name: &str, quantity: i64) -> i64 {
        let values = BookValues::new()
            .with(BookColumn::Name, name.to_string())
            .with(BookColumn::Price, 999)
            .with(BookColumn::Quantity, quantity)
            .with(BookColumn::SupplierName, "Acme".to_string())
            .with(BookColumn::SupplierPhone, "01632960123".to_string());
        let uri = app
            .provider
            .insert(&app.provider.contract().content_uri(), &values)
            .unwrap();
        parse_id(&uri).unwrap()
    }

    fn press(app: &mut App, keys: &[KeyCode]) {
        for key in keys {
            app.handle_key(*key).unwrap();
        }
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            app.handle_key(KeyCode::Char(ch)).unwrap();
        }
    }

    fn status_text(app: &App) -> Option<&str> {
        app.status.as_ref().map(|status| status.text.as_str())
    }

    #[test]
    fn list_reloads_after_external_writes() {
        let mut app = app();
        assert!(app.list.books.is_empty());
        stock(&app, "Dune", 5);
        app.refresh_if_changed().unwrap();
        assert_eq!(app.list.books.len(), 1);
        assert_eq!(app.list.books[0].name, "Dune");
    }

    #[test]
    fn adds_a_book_through_the_editor() {
        let mut app = app();
        press(&mut app, &[KeyCode::Char('+')]);
        type_text(&mut app, "Dune");
        press(&mut app, &[KeyCode::Tab, KeyCode::Tab, KeyCode::Tab]);
        type_text(&mut app, "9.99");
        press(&mut app, &[KeyCode::Tab]);
        type_text(&mut app, "5");
        press(&mut app, &[KeyCode::Tab]);
        type_text(&mut app, "Acme");
        press(&mut app, &[KeyCode::Tab]);
        type_text(&mut app, "01632960123");
        press(&mut app, &[KeyCode::Enter]);

        assert!(matches!(app.screen, Screen::List));
        assert_eq!(status_text(&app), Some("Added Dune."));
        assert_eq!(app.list.books.len(), 1);
        let book = &app.list.books[0];
        assert_eq!(book.price, 999);
        assert_eq!(book.quantity, 5);
        assert_eq!(book.pages, 0);
    }

    #[test]
    fn incomplete_editor_stays_open() {
        let mut app = app();
        press(&mut app, &[KeyCode::Char('a')]);
        type_text(&mut app, "Dune");
        press(&mut app, &[KeyCode::Enter]);

        let Screen::Editor(editor) = &app.screen else {
            panic!("editor should stay open");
        };
        assert_eq!(
            editor.form.error.as_deref(),
            Some("Please complete all required fields.")
        );
        assert!(app.list.books.is_empty());
    }

    #[test]
    fn selling_stops_at_zero() {
        let mut app = app();
        stock(&app, "Dune", 1);
        app.refresh_if_changed().unwrap();

        press(&mut app, &[KeyCode::Char('s')]);
        assert_eq!(app.list.books[0].quantity, 0);
        press(&mut app, &[KeyCode::Char('s')]);
        assert_eq!(app.list.books[0].quantity, 0);
        assert_eq!(status_text(&app), Some("Dune is out of stock."));
    }

    #[test]
    fn delete_all_requires_confirmation() {
        let mut app = app();
        stock(&app, "Dune", 1);
        stock(&app, "Emma", 2);
        app.refresh_if_changed().unwrap();

        press(&mut app, &[KeyCode::Char('D'), KeyCode::Char('n')]);
        assert_eq!(app.list.books.len(), 2);

        press(&mut app, &[KeyCode::Char('D'), KeyCode::Char('y')]);
        assert!(app.list.books.is_empty());
        assert_eq!(status_text(&app), Some("Deleted 2 books."));
    }

    #[test]
    fn editor_updates_stock_and_deletes() {
        let mut app = app();
        let id = stock(&app, "Dune", 3);
        app.refresh_if_changed().unwrap();

        press(&mut app, &[KeyCode::Enter]);
        for _ in 0..4 {
            press(&mut app, &[KeyCode::Tab]);
        }
        type_text(&mut app, "2");
        app.handle_ctrl('r').unwrap();
        assert_eq!(status_text(&app), Some("Stock now 1."));
        press(&mut app, &[KeyCode::Enter]);
        assert_eq!(app.list.books[0].quantity, 1);

        press(&mut app, &[KeyCode::Enter]);
        app.handle_ctrl('d').unwrap();
        assert!(matches!(app.mode, Mode::ConfirmDelete(ref c) if c.id == id));
        press(&mut app, &[KeyCode::Char('y')]);
        assert!(matches!(app.screen, Screen::List));
        assert!(app.list.books.is_empty());
    }

    #[test]
    fn leaving_with_changes_asks_first() {
        let mut app = app();
        stock(&app, "Dune", 3);
        app.refresh_if_changed().unwrap();

        press(&mut app, &[KeyCode::Enter]);
        type_text(&mut app, " Messiah");
        press(&mut app, &[KeyCode::Esc]);
        assert!(matches!(app.mode, Mode::ConfirmLeave(_)));
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|frame| app.draw(frame)).unwrap();
        let rendered = format!("{:?}", terminal.backend().buffer());
        assert!(rendered.contains("You have unsaved changes."));
        assert!(rendered.contains("Save & Leave"));

        press(&mut app, &[KeyCode::Enter]);
        assert!(matches!(app.screen, Screen::Editor(_)));

        press(&mut app, &[KeyCode::Esc, KeyCode::Left, KeyCode::Enter]);
        assert!(matches!(app.screen, Screen::List));
        assert_eq!(app.list.books[0].name, "Dune");

        press(&mut app, &[KeyCode::Enter]);
        type_text(&mut app, " Messiah");
        press(&mut app, &[KeyCode::Esc, KeyCode::Right, KeyCode::Enter]);
        assert!(matches!(app.screen, Screen::List));
        assert_eq!(app.list.books[0].name, "Dune Messiah");
    }

    #[test]
    fn renders_list_and_editor() {
        let mut app = app();
        stock(&app, "Dune", 3);
        app.refresh_if_changed().unwrap();
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();

        terminal.draw(|frame| app.draw(frame)).unwrap();
        let rendered = format!("{:?}", terminal.backend().buffer());
        assert!(rendered.contains("Dune"));
        assert!(rendered.contains("Unknown author"));
        assert!(rendered.contains("£9.99"));

        press(&mut app, &[KeyCode::Enter]);
        terminal.draw(|frame| app.draw(frame)).unwrap();
        let rendered = format!("{:?}", terminal.backend().buffer());
        assert!(rendered.contains("Edit Book"));
        assert!(rendered.contains("In stock: 3"));
    }
}
