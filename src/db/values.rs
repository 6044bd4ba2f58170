use std::collections::BTreeMap;

use rusqlite::types::Value;

use crate::contract::BookColumn;
use crate::models::Book;

/// Column/value pairs for an insert or update. Only columns put into the set
/// are written; a column may be present with a NULL value, which is distinct
/// from being absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookValues {
    values: BTreeMap<BookColumn, Value>,
}

impl BookValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, column: BookColumn, value: impl Into<Value>) -> &mut Self {
        self.values.insert(column, value.into());
        self
    }

    pub fn put_null(&mut self, column: BookColumn) -> &mut Self {
        self.put(column, Value::Null)
    }

    /// Builder-style variant of [`BookValues::put`].
    pub fn with(mut self, column: BookColumn, value: impl Into<Value>) -> Self {
        self.put(column, value);
        self
    }

    pub fn contains(&self, column: BookColumn) -> bool {
        self.values.contains_key(&column)
    }

    pub fn get(&self, column: BookColumn) -> Option<&Value> {
        self.values.get(&column)
    }

    /// Text value of `column`. Integers are rendered as text; NULL, blobs and
    /// absent columns yield `None`.
    pub fn get_as_text(&self, column: BookColumn) -> Option<String> {
        match self.values.get(&column)? {
            Value::Text(text) => Some(text.clone()),
            Value::Integer(value) => Some(value.to_string()),
            Value::Real(value) => Some(value.to_string()),
            Value::Null | Value::Blob(_) => None,
        }
    }

    /// Integer value of `column`. Text is parsed after trimming and reals
    /// must be whole numbers; anything else yields `None`.
    pub fn get_as_integer(&self, column: BookColumn) -> Option<i64> {
        match self.values.get(&column)? {
            Value::Integer(value) => Some(*value),
            Value::Text(text) => text.trim().parse().ok(),
            Value::Real(value) if value.fract() == 0.0 && value.abs() < i64::MAX as f64 => {
                Some(*value as i64)
            }
            Value::Real(_) => None,
            Value::Null | Value::Blob(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate the present columns in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (BookColumn, &Value)> {
        self.values.iter().map(|(column, value)| (*column, value))
    }
}

impl From<&Book> for BookValues {
    /// Every writable column of `book`; the id is left to the caller.
    fn from(book: &Book) -> Self {
        BookValues::new()
            .with(BookColumn::Name, book.name.clone())
            .with(BookColumn::Authors, book.authors.clone())
            .with(BookColumn::Pages, book.pages)
            .with(BookColumn::Price, book.price)
            .with(BookColumn::Quantity, book.quantity)
            .with(BookColumn::SupplierName, book.supplier_name.clone())
            .with(BookColumn::SupplierPhone, book.supplier_phone.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presence_is_distinct_from_null() {
        let mut values = BookValues::new();
        values.put_null(BookColumn::Authors);

        assert!(values.contains(BookColumn::Authors));
        assert_eq!(values.get_as_text(BookColumn::Authors), None);
        assert!(!values.contains(BookColumn::Name));
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn integers_are_coerced_from_text() {
        let values = BookValues::new()
            .with(BookColumn::Price, " 250 ".to_string())
            .with(BookColumn::Pages, "many".to_string())
            .with(BookColumn::Quantity, 2.0_f64)
            .with(BookColumn::Name, -0.5_f64);

        assert_eq!(values.get_as_integer(BookColumn::Price), Some(250));
        assert_eq!(values.get_as_integer(BookColumn::Pages), None);
        assert_eq!(values.get_as_integer(BookColumn::Quantity), Some(2));
        assert_eq!(values.get_as_integer(BookColumn::Name), None);
    }

    #[test]
    fn book_conversion_covers_every_column() {
        let book = Book {
            id: 9,
            name: "Dune".to_string(),
            authors: None,
            pages: 412,
            price: 999,
            quantity: 5,
            supplier_name: "Acme".to_string(),
            supplier_phone: "0123456789".to_string(),
        };
        let values = BookValues::from(&book);
        let columns: Vec<BookColumn> = values.iter().map(|(column, _)| column).collect();

        assert_eq!(columns, BookColumn::ALL.to_vec());
        assert_eq!(values.get(BookColumn::Authors), Some(&Value::Null));
    }
}
