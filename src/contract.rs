//! Names shared by every layer that touches the `books` table: the table and
//! column identifiers, the resource paths the provider answers to, and the MIME
//! types it reports. Nothing in here talks to SQLite.

use std::fmt;

/// Scheme prefix used by every resource identifier.
pub const SCHEME: &str = "content://";
/// Authority used when the configuration does not name one.
pub const DEFAULT_AUTHORITY: &str = "com.example.bookshop";
/// Path segment appended to the authority to address the book collection.
pub const PATH_BOOKS: &str = "books";

/// SQLite table holding every book row.
pub const TABLE_NAME: &str = "books";
/// Primary key column. Not writable through the provider.
pub const COLUMN_ID: &str = "id";

const CURSOR_DIR_BASE_TYPE: &str = "vnd.android.cursor.dir";
const CURSOR_ITEM_BASE_TYPE: &str = "vnd.android.cursor.item";

/// Writable columns of the `books` table, in validation order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BookColumn {
    Name,
    Authors,
    Pages,
    Price,
    Quantity,
    SupplierName,
    SupplierPhone,
}

impl BookColumn {
    pub const ALL: [BookColumn; 7] = [
        BookColumn::Name,
        BookColumn::Authors,
        BookColumn::Pages,
        BookColumn::Price,
        BookColumn::Quantity,
        BookColumn::SupplierName,
        BookColumn::SupplierPhone,
    ];

    /// Column name as it appears in SQL.
    pub fn as_str(self) -> &'static str {
        match self {
            BookColumn::Name => "name",
            BookColumn::Authors => "authors",
            BookColumn::Pages => "pages",
            BookColumn::Price => "price",
            BookColumn::Quantity => "quantity",
            BookColumn::SupplierName => "supplier_name",
            BookColumn::SupplierPhone => "supplier_phone",
        }
    }
}

impl fmt::Display for BookColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The addressing scheme for one provider instance. The authority is read
/// from configuration so two stores never answer to the same identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookContract {
    authority: String,
}

impl BookContract {
    pub fn new(authority: impl Into<String>) -> Self {
        Self {
            authority: authority.into(),
        }
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Identifier of the whole book collection, e.g.
    /// `content://com.example.bookshop/books`.
    pub fn content_uri(&self) -> String {
        format!("{SCHEME}{}/{PATH_BOOKS}", self.authority)
    }

    /// Identifier of a single book row.
    pub fn book_uri(&self, id: i64) -> String {
        with_appended_id(&self.content_uri(), id)
    }

    /// MIME type reported for the collection resource.
    pub fn list_type(&self) -> String {
        format!("{CURSOR_DIR_BASE_TYPE}/{}/{PATH_BOOKS}", self.authority)
    }

    /// MIME type reported for a single-book resource.
    pub fn item_type(&self) -> String {
        format!("{CURSOR_ITEM_BASE_TYPE}/{}/{PATH_BOOKS}", self.authority)
    }
}

impl Default for BookContract {
    fn default() -> Self {
        Self::new(DEFAULT_AUTHORITY)
    }
}

/// Append a numeric id as the final path segment of `uri`.
pub fn with_appended_id(uri: &str, id: i64) -> String {
    format!("{}/{id}", uri.trim_end_matches('/'))
}

/// Read the trailing numeric segment of `uri`, if there is one.
pub fn parse_id(uri: &str) -> Option<i64> {
    uri.rsplit('/').next()?.parse().ok()
}
