//! Domain model mirroring a row of the `books` table. It stays a plain data
//! holder; persistence lives in `db` and formatting in `money`.

use std::fmt;

/// One stocked title together with where to reorder it from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    /// Primary key assigned by SQLite on insert.
    pub id: i64,
    pub name: String,
    /// Comma-separated author names, stored as one string. `None` when the
    /// row was written without the column.
    pub authors: Option<String>,
    pub pages: i64,
    /// Price in minor currency units (pence).
    pub price: i64,
    pub quantity: i64,
    pub supplier_name: String,
    pub supplier_phone: String,
}

impl Book {
    /// Split the authors string into individual names, skipping blanks.
    pub fn author_names(&self) -> Vec<String> {
        self.authors
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Authors text for the list view, or `None` when nobody is credited.
    pub fn authors_display(&self) -> Option<&str> {
        self.authors
            .as_deref()
            .map(str::trim)
            .filter(|authors| !authors.is_empty())
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
