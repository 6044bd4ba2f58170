use crate::models::Book;

use super::forms::{BookForm, PriceRules};

/// Backing state for the book list.
pub(crate) struct BookListScreen {
    pub(crate) books: Vec<Book>,
    pub(crate) selected: usize,
}

impl BookListScreen {
    pub(crate) fn new(books: Vec<Book>) -> Self {
        let mut screen = Self { books, selected: 0 };
        screen.ensure_in_bounds();
        screen
    }

    /// Swap in freshly queried rows, keeping the cursor on `focus_id` when it
    /// is still present.
    pub(crate) fn set_books(&mut self, books: Vec<Book>, focus_id: Option<i64>) {
        let focus_id = focus_id.or_else(|| self.current_book().map(|book| book.id));
        self.books = books;
        if let Some(id) = focus_id {
            if let Some(idx) = self.books.iter().position(|book| book.id == id) {
                self.selected = idx;
                return;
            }
        }
        self.ensure_in_bounds();
    }

    pub(crate) fn current_book(&self) -> Option<&Book> {
        self.books.get(self.selected)
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        if self.books.is_empty() {
            return;
        }
        let last = self.books.len() as isize - 1;
        self.selected = (self.selected as isize + offset).clamp(0, last) as usize;
    }

    pub(crate) fn select_first(&mut self) {
        self.selected = 0;
    }

    pub(crate) fn select_last(&mut self) {
        self.selected = self.books.len().saturating_sub(1);
    }

    fn ensure_in_bounds(&mut self) {
        if self.books.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.books.len() {
            self.selected = self.books.len() - 1;
        }
    }
}

/// Editor for one book. `book_id` is `None` while adding a new book.
pub(crate) struct BookEditor {
    pub(crate) book_id: Option<i64>,
    pub(crate) form: BookForm,
    original: BookForm,
}

impl BookEditor {
    pub(crate) fn new_book(rules: PriceRules) -> Self {
        let form = BookForm::new_book(rules);
        Self {
            book_id: None,
            original: form.clone(),
            form,
        }
    }

    pub(crate) fn edit(book: &Book, rules: PriceRules) -> Self {
        let form = BookForm::from_book(book, rules);
        Self {
            book_id: Some(book.id),
            original: form.clone(),
            form,
        }
    }

    pub(crate) fn has_unsaved_changes(&self) -> bool {
        self.form.differs_from(&self.original)
    }

    pub(crate) fn title(&self) -> &'static str {
        if self.book_id.is_some() {
            "Edit Book"
        } else {
            "Add a Book"
        }
    }
}
