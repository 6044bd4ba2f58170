use anyhow::{anyhow, bail, Context, Result};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::config::AppConfig;
use crate::contract::BookColumn;
use crate::db::BookValues;
use crate::models::Book;
use crate::money::{check_price_format, format_price, pad_price_decimals, parse_price};

/// How prices are typed and shown in the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PriceRules {
    pub(crate) symbol: String,
    pub(crate) max_digits: usize,
    pub(crate) max_decimals: usize,
}

impl PriceRules {
    pub(crate) fn from_config(config: &AppConfig) -> Self {
        Self {
            symbol: config.currency_symbol.clone(),
            max_digits: config.max_price_digits,
            max_decimals: config.max_price_decimals,
        }
    }
}

/// Editable fields of the book editor.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum BookField {
    Name,
    Authors,
    Pages,
    Price,
    Quantity,
    ChangeBy,
    SupplierName,
    SupplierPhone,
}

/// Focus order when adding a book. Quantity is typed directly.
const NEW_BOOK_FIELDS: &[BookField] = &[
    BookField::Name,
    BookField::Authors,
    BookField::Pages,
    BookField::Price,
    BookField::Quantity,
    BookField::SupplierName,
    BookField::SupplierPhone,
];

/// Focus order when editing. Quantity is read-only and moved with the
/// change-by amount.
const EXISTING_BOOK_FIELDS: &[BookField] = &[
    BookField::Name,
    BookField::Authors,
    BookField::Pages,
    BookField::Price,
    BookField::ChangeBy,
    BookField::SupplierName,
    BookField::SupplierPhone,
];

impl BookField {
    pub(crate) fn label(self) -> &'static str {
        match self {
            BookField::Name => "Name",
            BookField::Authors => "Authors",
            BookField::Pages => "Pages",
            BookField::Price => "Price",
            BookField::Quantity => "Quantity",
            BookField::ChangeBy => "Change stock by",
            BookField::SupplierName => "Supplier",
            BookField::SupplierPhone => "Supplier phone",
        }
    }

    fn placeholder(self) -> &'static str {
        match self {
            BookField::Authors => "<optional, comma separated>",
            BookField::Pages => "<optional>",
            BookField::ChangeBy => "<amount>",
            _ => "<required>",
        }
    }
}

/// Text state of the book editor. Values stay as typed text until
/// [`BookForm::parse_inputs`] turns them into a value set.
#[derive(Debug, Clone)]
pub(crate) struct BookForm {
    pub(crate) name: String,
    pub(crate) authors: String,
    pub(crate) pages: String,
    pub(crate) price: String,
    pub(crate) quantity: String,
    pub(crate) change_by: String,
    pub(crate) supplier_name: String,
    pub(crate) supplier_phone: String,
    pub(crate) active: BookField,
    pub(crate) error: Option<String>,
    existing: bool,
    rules: PriceRules,
}

impl BookForm {
    /// Blank form for a book that does not exist yet.
    pub(crate) fn new_book(rules: PriceRules) -> Self {
        Self {
            name: String::new(),
            authors: String::new(),
            pages: String::new(),
            price: String::new(),
            quantity: String::new(),
            change_by: String::new(),
            supplier_name: String::new(),
            supplier_phone: String::new(),
            active: BookField::Name,
            error: None,
            existing: false,
            rules,
        }
    }

    /// Populate the form from a stored book when entering edit mode.
    pub(crate) fn from_book(book: &Book, rules: PriceRules) -> Self {
        Self {
            name: book.name.clone(),
            authors: book.authors.clone().unwrap_or_default(),
            pages: if book.pages > 0 {
                book.pages.to_string()
            } else {
                String::new()
            },
            price: format_price(book.price, &rules.symbol),
            quantity: book.quantity.to_string(),
            change_by: String::new(),
            supplier_name: book.supplier_name.clone(),
            supplier_phone: book.supplier_phone.clone(),
            active: BookField::Name,
            error: None,
            existing: true,
            rules,
        }
    }

    pub(crate) fn is_existing(&self) -> bool {
        self.existing
    }

    /// Fields shown by the editor, in focus order.
    pub(crate) fn fields(&self) -> &'static [BookField] {
        if self.existing {
            EXISTING_BOOK_FIELDS
        } else {
            NEW_BOOK_FIELDS
        }
    }

    /// Move focus to `field`. Leaving the price field re-adds the currency
    /// symbol and pads the decimals; entering it strips the symbol again.
    pub(crate) fn focus(&mut self, field: BookField) {
        if self.active == field {
            return;
        }
        if self.active == BookField::Price {
            let amount = self.price.trim();
            if !amount.is_empty() {
                self.price = pad_price_decimals(&format!("{}{amount}", self.rules.symbol));
            }
        }
        if field == BookField::Price {
            let amount = self.price.trim();
            self.price = amount
                .strip_prefix(self.rules.symbol.as_str())
                .unwrap_or(amount)
                .to_string();
        }
        self.active = field;
    }

    pub(crate) fn next_field(&mut self) {
        self.step_focus(1);
    }

    pub(crate) fn previous_field(&mut self) {
        self.step_focus(-1);
    }

    fn step_focus(&mut self, offset: isize) {
        let fields = self.fields();
        let current = fields
            .iter()
            .position(|field| *field == self.active)
            .unwrap_or(0) as isize;
        let len = fields.len() as isize;
        let next = (current + offset).rem_euclid(len) as usize;
        self.focus(fields[next]);
    }

    /// Append a character to the active field, rejecting input the field
    /// does not accept. Price edits that would exceed the configured digit
    /// limits are discarded.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        match self.active {
            BookField::Name => self.name.push(ch),
            BookField::Authors => self.authors.push(ch),
            BookField::SupplierName => self.supplier_name.push(ch),
            BookField::SupplierPhone => {
                if !(ch.is_ascii_digit() || matches!(ch, '+' | ' ' | '-')) {
                    return false;
                }
                self.supplier_phone.push(ch);
            }
            BookField::Pages | BookField::Quantity | BookField::ChangeBy => {
                if !ch.is_ascii_digit() {
                    return false;
                }
                self.field_mut(self.active).push(ch);
            }
            BookField::Price => return self.push_price_char(ch),
        }
        true
    }

    fn push_price_char(&mut self, ch: char) -> bool {
        if !(ch.is_ascii_digit() || ch == '.') || (ch == '.' && self.price.contains('.')) {
            return false;
        }
        let before = self.price.clone();
        let mut after = before.clone();
        after.push(ch);
        let checked = check_price_format(
            &before,
            &after,
            self.rules.max_digits,
            self.rules.max_decimals,
        );
        if checked == before {
            return false;
        }
        self.price = checked;
        true
    }

    /// Remove the last character from the active field.
    pub(crate) fn backspace(&mut self) {
        self.field_mut(self.active).pop();
    }

    fn field_mut(&mut self, field: BookField) -> &mut String {
        match field {
            BookField::Name => &mut self.name,
            BookField::Authors => &mut self.authors,
            BookField::Pages => &mut self.pages,
            BookField::Price => &mut self.price,
            BookField::Quantity => &mut self.quantity,
            BookField::ChangeBy => &mut self.change_by,
            BookField::SupplierName => &mut self.supplier_name,
            BookField::SupplierPhone => &mut self.supplier_phone,
        }
    }

    pub(crate) fn value(&self, field: BookField) -> &str {
        match field {
            BookField::Name => &self.name,
            BookField::Authors => &self.authors,
            BookField::Pages => &self.pages,
            BookField::Price => &self.price,
            BookField::Quantity => &self.quantity,
            BookField::ChangeBy => &self.change_by,
            BookField::SupplierName => &self.supplier_name,
            BookField::SupplierPhone => &self.supplier_phone,
        }
    }

    /// Validate the inputs and build the full value set to persist.
    pub(crate) fn parse_inputs(&self) -> Result<BookValues> {
        let name = self.name.trim();
        let price = self.price.trim();
        let quantity = self.quantity.trim();
        let supplier_name = self.supplier_name.trim();
        let supplier_phone = self.supplier_phone.trim();
        if [name, price, quantity, supplier_name, supplier_phone]
            .iter()
            .any(|value| value.is_empty())
        {
            bail!("Please complete all required fields.");
        }

        let pages = match self.pages.trim() {
            "" => 0,
            pages => pages
                .parse::<i64>()
                .context("Pages must be a whole number.")?,
        };
        let price = parse_price(price, &self.rules.symbol)?;
        let quantity = quantity
            .parse::<i64>()
            .context("Quantity must be a whole number.")?;

        Ok(BookValues::new()
            .with(BookColumn::Name, name.to_string())
            .with(BookColumn::Authors, self.authors.trim().to_string())
            .with(BookColumn::Pages, pages)
            .with(BookColumn::Price, price)
            .with(BookColumn::Quantity, quantity)
            .with(BookColumn::SupplierName, supplier_name.to_string())
            .with(BookColumn::SupplierPhone, supplier_phone.to_string()))
    }

    /// Apply the change-by amount to the displayed stock level.
    pub(crate) fn adjust_stock(&mut self, add: bool) -> Result<i64> {
        let amount = self.change_by.trim();
        if amount.is_empty() {
            return Err(if add {
                anyhow!("Enter an amount of stock to add.")
            } else {
                anyhow!("Enter an amount of stock to remove.")
            });
        }
        let amount: i64 = amount.parse().context("Stock amount must be a whole number.")?;
        let current: i64 = self.quantity.trim().parse().unwrap_or(0);

        let updated = if add {
            current
                .checked_add(amount)
                .ok_or_else(|| anyhow!("That is too much stock."))?
        } else {
            current - amount
        };
        if updated < 0 {
            bail!("Not enough stock to remove that amount.");
        }
        self.change_by.clear();
        self.quantity = updated.to_string();
        Ok(updated)
    }

    /// Whether the user changed anything compared with `original`.
    pub(crate) fn differs_from(&self, original: &BookForm) -> bool {
        let price = |form: &BookForm| parse_price(&form.price, &form.rules.symbol).ok();
        self.name != original.name
            || self.authors != original.authors
            || self.pages != original.pages
            || price(self) != price(original)
            || self.quantity != original.quantity
            || self.supplier_name != original.supplier_name
            || self.supplier_phone != original.supplier_phone
    }

    /// Render a single line for the editor.
    pub(crate) fn build_line(&self, field: BookField) -> Line<'static> {
        let value = self.value(field);
        let is_active = self.active == field;

        let display = if value.is_empty() {
            field.placeholder().to_string()
        } else {
            value.to_string()
        };

        let style = if is_active {
            Style::default().fg(Color::Yellow)
        } else if value.is_empty() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        Line::from(vec![
            Span::raw(format!("{}: ", field.label())),
            Span::styled(display, style),
        ])
    }

    /// Character length of the requested field.
    pub(crate) fn value_len(&self, field: BookField) -> usize {
        self.value(field).chars().count()
    }
}

/// State for confirming deletion of the book open in the editor.
pub(crate) struct ConfirmBookDelete {
    pub(crate) id: i64,
    pub(crate) name: String,
}

/// State for confirming removal of every book.
pub(crate) struct ConfirmDeleteAll {
    pub(crate) count: usize,
}

/// Tracks the user's choice when leaving the editor with unsaved changes.
pub(crate) struct ConfirmLeaveEditor {
    pub(crate) selection: LeaveChoice,
}

impl ConfirmLeaveEditor {
    /// Start on "Keep Editing" so a stray Enter never loses data.
    pub(crate) fn new() -> Self {
        Self {
            selection: LeaveChoice::KeepEditing,
        }
    }

    /// Move the selection forward (Save → Discard → Keep Editing).
    pub(crate) fn next(&mut self) {
        self.selection = match self.selection {
            LeaveChoice::Save => LeaveChoice::Discard,
            LeaveChoice::Discard => LeaveChoice::KeepEditing,
            LeaveChoice::KeepEditing => LeaveChoice::Save,
        };
    }

    /// Move the selection backward.
    pub(crate) fn previous(&mut self) {
        self.selection = match self.selection {
            LeaveChoice::Save => LeaveChoice::KeepEditing,
            LeaveChoice::Discard => LeaveChoice::Save,
            LeaveChoice::KeepEditing => LeaveChoice::Discard,
        };
    }

    pub(crate) fn labels(&self) -> [&'static str; 3] {
        ["Save & Leave", "Discard", "Keep Editing"]
    }

    pub(crate) fn selected_index(&self) -> usize {
        match self.selection {
            LeaveChoice::Save => 0,
            LeaveChoice::Discard => 1,
            LeaveChoice::KeepEditing => 2,
        }
    }
}

/// Options presented when leaving an edited form.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum LeaveChoice {
    Save,
    Discard,
    KeepEditing,
}
