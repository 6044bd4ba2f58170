use crossbeam::channel::Receiver;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use tracing::{debug, error, info};

use crate::contract::{with_appended_id, BookColumn, BookContract, COLUMN_ID, TABLE_NAME};
use crate::models::Book;

use super::error::{ProviderError, ProviderResult};
use super::notify::{ChangeEvent, ChangeNotifier};
use super::routing::{BookRoute, RouteMatch, UriMatcher};
use super::values::BookValues;

const BOOK_COLUMNS: &str =
    "id, name, authors, pages, price, quantity, supplier_name, supplier_phone";

/// A raw `WHERE` fragment plus its positional arguments. The fragment is
/// passed to SQLite untouched; use `?` placeholders for the arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub clause: String,
    pub args: Vec<Value>,
}

impl Selection {
    pub fn new(clause: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            clause: clause.into(),
            args,
        }
    }

    /// Match exactly one row by primary key.
    pub fn by_id(id: i64) -> Self {
        Self::new(format!("{COLUMN_ID} = ?"), vec![Value::Integer(id)])
    }
}

/// What a resource identifier resolved to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Target {
    Collection,
    Item(i64),
}

/// Resource-addressed access to the `books` table. Every call resolves its
/// identifier through the routing table first, validates writes before
/// touching the store, and notifies observers after a write that changed rows.
pub struct BookProvider {
    conn: Connection,
    contract: BookContract,
    routes: UriMatcher<BookRoute>,
    notifier: ChangeNotifier,
}

impl BookProvider {
    pub fn new(conn: Connection, contract: BookContract, routes: UriMatcher<BookRoute>) -> Self {
        Self {
            conn,
            contract,
            routes,
            notifier: ChangeNotifier::new(),
        }
    }

    /// Provider using the standard book routes for `contract`.
    pub fn with_contract(conn: Connection, contract: BookContract) -> Self {
        let routes = UriMatcher::for_books(&contract);
        Self::new(conn, contract, routes)
    }

    pub fn contract(&self) -> &BookContract {
        &self.contract
    }

    /// Receive a [`ChangeEvent`] after each committed write to `uri` (and,
    /// with `descendants`, to identifiers beneath it).
    pub fn subscribe(&self, uri: &str, descendants: bool) -> Receiver<ChangeEvent> {
        self.notifier.subscribe(uri, descendants)
    }

    /// Rows matching `selection`, ordered by `sort_order`. For an item
    /// identifier the selection is replaced by the embedded id.
    pub fn query(
        &self,
        uri: &str,
        selection: Option<&Selection>,
        sort_order: Option<&str>,
    ) -> ProviderResult<Vec<Book>> {
        let selection = self.scoped_selection(uri, selection)?;
        debug!(uri, ?selection, ?sort_order, "query");

        let mut sql = format!("SELECT {BOOK_COLUMNS} FROM {TABLE_NAME}");
        push_where(&mut sql, selection.as_ref());
        if let Some(order) = sort_order.map(str::trim).filter(|order| !order.is_empty()) {
            sql.push_str(" ORDER BY ");
            sql.push_str(order);
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let books = stmt
            .query_map(
                params_from_iter(selection_args(selection.as_ref())),
                row_to_book,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(books)
    }

    /// Insert a new book and return the identifier of the created row. Only
    /// the collection identifier accepts inserts.
    pub fn insert(&self, uri: &str, values: &BookValues) -> ProviderResult<String> {
        match self.resolve(uri)? {
            Target::Collection => self.insert_book(uri, values),
            Target::Item(_) => Err(ProviderError::Unsupported {
                operation: "Insertion",
                uri: uri.to_string(),
            }),
        }
    }

    fn insert_book(&self, uri: &str, values: &BookValues) -> ProviderResult<String> {
        let values = &validate(values, true)?;

        let columns: Vec<&str> = values.iter().map(|(column, _)| column.as_str()).collect();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {TABLE_NAME} ({}) VALUES ({placeholders})",
            columns.join(", ")
        );

        if let Err(source) = self
            .conn
            .execute(&sql, params_from_iter(values.iter().map(|(_, value)| value)))
        {
            error!(uri, %source, "failed to insert new book");
            return Err(ProviderError::Insert {
                uri: uri.to_string(),
                source,
            });
        }

        let id = self.conn.last_insert_rowid();
        info!(id, "book inserted");
        self.notifier.notify_change(uri);
        Ok(with_appended_id(uri, id))
    }

    /// Write the columns present in `values` to every matched row and return
    /// how many rows changed. Columns absent from `values` keep their data.
    pub fn update(
        &self,
        uri: &str,
        values: &BookValues,
        selection: Option<&Selection>,
    ) -> ProviderResult<usize> {
        let selection = self.scoped_selection(uri, selection)?;
        if values.is_empty() {
            return Ok(0);
        }
        let values = &validate(values, false)?;

        let assignments = values
            .iter()
            .map(|(column, _)| format!("{column} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!("UPDATE {TABLE_NAME} SET {assignments}");
        push_where(&mut sql, selection.as_ref());

        let params = values
            .iter()
            .map(|(_, value)| value)
            .chain(selection_args(selection.as_ref()));
        let updated = self
            .conn
            .execute(&sql, params_from_iter(params))
            .map_err(|source| {
                error!(uri, %source, "failed to update books");
                ProviderError::Update {
                    uri: uri.to_string(),
                    source,
                }
            })?;

        if updated > 0 {
            info!(uri, updated, "books updated");
            self.notifier.notify_change(uri);
        }
        Ok(updated)
    }

    /// Remove matched rows and return how many were deleted. Without a
    /// selection the collection identifier clears the whole table.
    pub fn delete(&self, uri: &str, selection: Option<&Selection>) -> ProviderResult<usize> {
        let selection = self.scoped_selection(uri, selection)?;

        let mut sql = format!("DELETE FROM {TABLE_NAME}");
        push_where(&mut sql, selection.as_ref());
        let deleted = self
            .conn
            .execute(&sql, params_from_iter(selection_args(selection.as_ref())))?;

        if deleted > 0 {
            info!(uri, deleted, "books deleted");
            self.notifier.notify_change(uri);
        }
        Ok(deleted)
    }

    /// MIME type of the data behind `uri`.
    pub fn get_type(&self, uri: &str) -> ProviderResult<String> {
        match self.resolve(uri)? {
            Target::Collection => Ok(self.contract.list_type()),
            Target::Item(_) => Ok(self.contract.item_type()),
        }
    }

    fn resolve(&self, uri: &str) -> ProviderResult<Target> {
        match self.routes.match_uri(uri) {
            Some(RouteMatch {
                route: BookRoute::Books,
                ..
            }) => Ok(Target::Collection),
            Some(RouteMatch {
                route: BookRoute::BookId,
                id: Some(id),
            }) => Ok(Target::Item(id)),
            _ => Err(ProviderError::UnknownUri(uri.to_string())),
        }
    }

    fn scoped_selection(
        &self,
        uri: &str,
        selection: Option<&Selection>,
    ) -> ProviderResult<Option<Selection>> {
        Ok(match self.resolve(uri)? {
            Target::Collection => selection.cloned(),
            Target::Item(id) => Some(Selection::by_id(id)),
        })
    }
}

/// Check the columns of `values` against the table's constraints, stopping at
/// the first failure. With `require_all` every required column must be
/// present; otherwise only present columns are checked. On success the
/// numeric columns are returned as integers so the store never sees text or
/// fractional values in them.
fn validate(values: &BookValues, require_all: bool) -> ProviderResult<BookValues> {
    check_text(values, BookColumn::Name, "Book requires a name.", require_all)?;

    if !matches!(values.get(BookColumn::Pages), None | Some(Value::Null)) {
        match values.get_as_integer(BookColumn::Pages) {
            Some(pages) if pages >= 0 => {}
            _ => return Err(invalid("Book requires a valid number of pages.")),
        }
    }

    check_amount(
        values,
        BookColumn::Price,
        "Book requires a price.",
        "Book requires a valid price.",
        require_all,
    )?;
    check_amount(
        values,
        BookColumn::Quantity,
        "Book requires a quantity.",
        "Book requires a valid quantity.",
        require_all,
    )?;
    check_text(
        values,
        BookColumn::SupplierName,
        "Book requires a supplier name.",
        require_all,
    )?;
    check_text(
        values,
        BookColumn::SupplierPhone,
        "Book requires a supplier phone number.",
        require_all,
    )?;

    let mut normalized = values.clone();
    for column in [BookColumn::Pages, BookColumn::Price, BookColumn::Quantity] {
        if let Some(amount) = values.get_as_integer(column) {
            normalized.put(column, amount);
        }
    }
    Ok(normalized)
}

fn check_text(
    values: &BookValues,
    column: BookColumn,
    missing: &str,
    require_all: bool,
) -> ProviderResult<()> {
    if !require_all && !values.contains(column) {
        return Ok(());
    }
    match values.get_as_text(column) {
        Some(_) => Ok(()),
        None => Err(invalid(missing)),
    }
}

/// A required whole, non-negative number. Absent or NULL reports `missing`;
/// anything that is not a non-negative integer reports `not_valid`.
fn check_amount(
    values: &BookValues,
    column: BookColumn,
    missing: &str,
    not_valid: &str,
    require_all: bool,
) -> ProviderResult<()> {
    if !require_all && !values.contains(column) {
        return Ok(());
    }
    match values.get(column) {
        None | Some(Value::Null) => Err(invalid(missing)),
        Some(_) => match values.get_as_integer(column) {
            Some(amount) if amount >= 0 => Ok(()),
            _ => Err(invalid(not_valid)),
        },
    }
}

fn invalid(message: &str) -> ProviderError {
    ProviderError::Validation(message.to_string())
}

fn push_where(sql: &mut String, selection: Option<&Selection>) {
    if let Some(selection) = selection.filter(|selection| !selection.clause.trim().is_empty()) {
        sql.push_str(" WHERE ");
        sql.push_str(&selection.clause);
    }
}

fn selection_args(selection: Option<&Selection>) -> impl Iterator<Item = &Value> {
    selection.into_iter().flat_map(|selection| selection.args.iter())
}

fn row_to_book(row: &Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        id: row.get(0)?,
        name: row.get(1)?,
        authors: row.get(2)?,
        pages: row.get(3)?,
        price: row.get(4)?,
        quantity: row.get(5)?,
        supplier_name: row.get(6)?,
        supplier_phone: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::{open_in_memory, DATABASE_VERSION};

    fn provider() -> BookProvider {
        let conn = open_in_memory(DATABASE_VERSION).unwrap();
        BookProvider::with_contract(conn, BookContract::new("shop.test"))
    }

    fn dune() -> BookValues {
        BookValues::new()
            .with(BookColumn::Name, "Dune".to_string())
            .with(BookColumn::Price, 999)
            .with(BookColumn::Quantity, 5)
            .with(BookColumn::SupplierName, "Acme".to_string())
            .with(BookColumn::SupplierPhone, "0123456789".to_string())
    }

    fn books_uri(provider: &BookProvider) -> String {
        provider.contract().content_uri()
    }

    fn only_book(provider: &BookProvider, uri: &str) -> Book {
        let mut rows = provider.query(uri, None, None).unwrap();
        assert_eq!(rows.len(), 1);
        rows.remove(0)
    }

    #[test]
    fn insert_then_query_returns_inserted_values() {
        let provider = provider();
        let values = dune()
            .with(BookColumn::Authors, "Frank Herbert".to_string())
            .with(BookColumn::Pages, 412);

        let uri = provider.insert(&books_uri(&provider), &values).unwrap();
        let book = only_book(&provider, &uri);

        assert_eq!(uri, provider.contract().book_uri(book.id));
        assert_eq!(book.name, "Dune");
        assert_eq!(book.authors.as_deref(), Some("Frank Herbert"));
        assert_eq!(book.pages, 412);
        assert_eq!(book.price, 999);
        assert_eq!(book.quantity, 5);
        assert_eq!(book.supplier_name, "Acme");
        assert_eq!(book.supplier_phone, "0123456789");
    }

    #[test]
    fn insert_defaults_pages_to_zero() {
        let provider = provider();
        let uri = provider.insert(&books_uri(&provider), &dune()).unwrap();
        let book = only_book(&provider, &uri);
        assert_eq!(book.pages, 0);
        assert_eq!(book.authors, None);
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let provider = provider();
        let books = books_uri(&provider);
        let first = provider.insert(&books, &dune()).unwrap();
        assert_eq!(provider.delete(&first, None).unwrap(), 1);
        let second = provider.insert(&books, &dune()).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn insert_rejects_missing_required_fields() {
        let provider = provider();
        let books = books_uri(&provider);
        for (column, message) in [
            (BookColumn::Name, "Book requires a name."),
            (BookColumn::Price, "Book requires a price."),
            (BookColumn::Quantity, "Book requires a quantity."),
            (BookColumn::SupplierName, "Book requires a supplier name."),
            (BookColumn::SupplierPhone, "Book requires a supplier phone number."),
        ] {
            let mut values = BookValues::new();
            for (present, value) in dune().iter().filter(|(present, _)| *present != column) {
                values.put(present, value.clone());
            }
            let err = provider.insert(&books, &values).unwrap_err();
            assert!(err.is_validation(), "{column}: {err}");
            assert_eq!(err.to_string(), message);

            let err = provider
                .insert(&books, &dune().with(column, Value::Null))
                .unwrap_err();
            assert_eq!(err.to_string(), message);
        }
        assert!(provider.query(&books, None, None).unwrap().is_empty());
    }

    #[test]
    fn insert_rejects_negative_numbers() {
        let provider = provider();
        let books = books_uri(&provider);
        for (column, message) in [
            (BookColumn::Pages, "Book requires a valid number of pages."),
            (BookColumn::Price, "Book requires a valid price."),
            (BookColumn::Quantity, "Book requires a valid quantity."),
        ] {
            let err = provider
                .insert(&books, &dune().with(column, -1))
                .unwrap_err();
            assert!(err.is_validation());
            assert_eq!(err.to_string(), message);
        }
    }

    #[test]
    fn numeric_text_is_stored_as_integers() {
        let provider = provider();
        let values = dune()
            .with(BookColumn::Pages, "250".to_string())
            .with(BookColumn::Quantity, " 5 ".to_string())
            .with(BookColumn::Price, 1050.0_f64);

        let uri = provider.insert(&books_uri(&provider), &values).unwrap();
        let book = only_book(&provider, &uri);
        assert_eq!(book.pages, 250);
        assert_eq!(book.quantity, 5);
        assert_eq!(book.price, 1050);

        let updated = provider
            .update(
                &uri,
                &BookValues::new().with(BookColumn::Quantity, "7".to_string()),
                None,
            )
            .unwrap();
        assert_eq!(updated, 1);
        assert_eq!(only_book(&provider, &uri).quantity, 7);
    }

    #[test]
    fn fractional_and_unparsable_numbers_are_rejected() {
        let provider = provider();
        let books = books_uri(&provider);
        for (values, message) in [
            (
                dune().with(BookColumn::Price, -0.5_f64),
                "Book requires a valid price.",
            ),
            (
                dune().with(BookColumn::Price, 9.99_f64),
                "Book requires a valid price.",
            ),
            (
                dune().with(BookColumn::Pages, "many".to_string()),
                "Book requires a valid number of pages.",
            ),
            (
                dune().with(BookColumn::Quantity, "lots".to_string()),
                "Book requires a valid quantity.",
            ),
        ] {
            let err = provider.insert(&books, &values).unwrap_err();
            assert!(err.is_validation(), "{err:?}");
            assert_eq!(err.to_string(), message);
        }

        let uri = provider.insert(&books, &dune()).unwrap();
        let err = provider
            .update(
                &uri,
                &BookValues::new().with(BookColumn::Pages, "many".to_string()),
                None,
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "Book requires a valid number of pages.");
        assert_eq!(provider.query(&books, None, None).unwrap().len(), 1);
    }

    #[test]
    fn store_rejection_surfaces_as_insert_error() {
        let provider = provider();
        // NULL pages passes validation but violates NOT NULL in the table.
        let err = provider
            .insert(&books_uri(&provider), &dune().with(BookColumn::Pages, Value::Null))
            .unwrap_err();
        assert!(matches!(err, ProviderError::Insert { .. }), "{err:?}");
    }

    #[test]
    fn insert_into_item_is_unsupported() {
        let provider = provider();
        let err = provider
            .insert(&provider.contract().book_uri(1), &dune())
            .unwrap_err();
        assert!(matches!(err, ProviderError::Unsupported { .. }));
    }

    #[test]
    fn unknown_uris_are_rejected_everywhere() {
        let provider = provider();
        let uri = "content://shop.test/authors";
        assert!(matches!(
            provider.query(uri, None, None),
            Err(ProviderError::UnknownUri(_))
        ));
        assert!(matches!(
            provider.insert(uri, &dune()),
            Err(ProviderError::UnknownUri(_))
        ));
        assert!(matches!(
            provider.update(uri, &BookValues::new(), None),
            Err(ProviderError::UnknownUri(_))
        ));
        assert!(matches!(
            provider.delete(uri, None),
            Err(ProviderError::UnknownUri(_))
        ));
        assert!(matches!(
            provider.get_type(uri),
            Err(ProviderError::UnknownUri(_))
        ));
    }

    #[test]
    fn empty_update_is_a_no_op() {
        let provider = provider();
        let uri = provider.insert(&books_uri(&provider), &dune()).unwrap();
        let before = only_book(&provider, &uri);
        let events = provider.subscribe(&books_uri(&provider), true);

        assert_eq!(provider.update(&uri, &BookValues::new(), None).unwrap(), 0);
        assert_eq!(only_book(&provider, &uri), before);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn partial_update_touches_only_given_fields() {
        let provider = provider();
        let uri = provider.insert(&books_uri(&provider), &dune()).unwrap();
        let before = only_book(&provider, &uri);

        let changes = BookValues::new()
            .with(BookColumn::Quantity, 4)
            .with(BookColumn::Authors, "Frank Herbert".to_string());
        assert_eq!(provider.update(&uri, &changes, None).unwrap(), 1);

        let after = only_book(&provider, &uri);
        assert_eq!(
            after,
            Book {
                quantity: 4,
                authors: Some("Frank Herbert".to_string()),
                ..before
            }
        );
    }

    #[test]
    fn update_validates_present_fields_in_order() {
        let provider = provider();
        let uri = provider.insert(&books_uri(&provider), &dune()).unwrap();

        let changes = BookValues::new()
            .with(BookColumn::Price, -5)
            .with(BookColumn::Name, Value::Null);
        let err = provider.update(&uri, &changes, None).unwrap_err();
        assert_eq!(err.to_string(), "Book requires a name.");

        let changes = BookValues::new().with(BookColumn::Quantity, -1);
        let err = provider.update(&uri, &changes, None).unwrap_err();
        assert_eq!(err.to_string(), "Book requires a valid quantity.");
        assert_eq!(only_book(&provider, &uri).quantity, 5);
    }

    #[test]
    fn update_missing_item_returns_zero() {
        let provider = provider();
        let uri = provider.contract().book_uri(77);
        let changes = BookValues::new().with(BookColumn::Quantity, 1);
        assert_eq!(provider.update(&uri, &changes, None).unwrap(), 0);
    }

    #[test]
    fn collection_update_honours_selection() {
        let provider = provider();
        let books = books_uri(&provider);
        provider.insert(&books, &dune()).unwrap();
        provider
            .insert(&books, &dune().with(BookColumn::Name, "Emma".to_string()))
            .unwrap();

        let selection = Selection::new("name = ?", vec![Value::Text("Emma".to_string())]);
        let changes = BookValues::new().with(BookColumn::Price, 450);
        assert_eq!(
            provider.update(&books, &changes, Some(&selection)).unwrap(),
            1
        );

        let prices: Vec<i64> = provider
            .query(&books, None, Some("name"))
            .unwrap()
            .into_iter()
            .map(|book| book.price)
            .collect();
        assert_eq!(prices, vec![999, 450]);
    }

    #[test]
    fn item_query_ignores_caller_selection() {
        let provider = provider();
        let uri = provider.insert(&books_uri(&provider), &dune()).unwrap();
        let selection = Selection::new("name = ?", vec![Value::Text("Nope".to_string())]);
        assert_eq!(provider.query(&uri, Some(&selection), None).unwrap().len(), 1);
    }

    #[test]
    fn query_filters_and_sorts() {
        let provider = provider();
        let books = books_uri(&provider);
        for (name, quantity) in [("Dune", 5), ("Emma", 0), ("Beloved", 2)] {
            provider
                .insert(
                    &books,
                    &dune()
                        .with(BookColumn::Name, name.to_string())
                        .with(BookColumn::Quantity, quantity),
                )
                .unwrap();
        }

        let in_stock = Selection::new("quantity > ?", vec![Value::Integer(0)]);
        let names: Vec<String> = provider
            .query(&books, Some(&in_stock), Some("name ASC"))
            .unwrap()
            .into_iter()
            .map(|book| book.name)
            .collect();
        assert_eq!(names, vec!["Beloved", "Dune"]);

        let missing = provider.contract().book_uri(999);
        assert!(provider.query(&missing, None, None).unwrap().is_empty());
    }

    #[test]
    fn item_delete_removes_exactly_one_row() {
        let provider = provider();
        let books = books_uri(&provider);
        let first = provider.insert(&books, &dune()).unwrap();
        provider.insert(&books, &dune()).unwrap();

        assert_eq!(provider.delete(&first, None).unwrap(), 1);
        assert_eq!(provider.delete(&first, None).unwrap(), 0);
        assert_eq!(provider.query(&books, None, None).unwrap().len(), 1);
    }

    #[test]
    fn collection_delete_without_selection_clears_table() {
        let provider = provider();
        let books = books_uri(&provider);
        for _ in 0..3 {
            provider.insert(&books, &dune()).unwrap();
        }

        assert_eq!(provider.delete(&books, None).unwrap(), 3);
        assert!(provider.query(&books, None, None).unwrap().is_empty());
        assert_eq!(provider.delete(&books, None).unwrap(), 0);
    }

    #[test]
    fn writes_notify_observers_once() {
        let provider = provider();
        let books = books_uri(&provider);
        let events = provider.subscribe(&books, true);

        let uri = provider.insert(&books, &dune()).unwrap();
        assert_eq!(events.try_recv().unwrap().uri, books);

        let changes = BookValues::new().with(BookColumn::Quantity, 2);
        provider.update(&uri, &changes, None).unwrap();
        assert_eq!(events.try_recv().unwrap().uri, uri);

        provider.delete(&provider.contract().book_uri(500), None).unwrap();
        assert!(events.try_recv().is_err());

        provider.delete(&uri, None).unwrap();
        assert_eq!(events.try_recv().unwrap().uri, uri);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn failed_validation_does_not_notify() {
        let provider = provider();
        let books = books_uri(&provider);
        let events = provider.subscribe(&books, true);
        let _ = provider.insert(&books, &BookValues::new());
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn reports_mime_types() {
        let provider = provider();
        assert_eq!(
            provider.get_type(&books_uri(&provider)).unwrap(),
            "vnd.android.cursor.dir/shop.test/books"
        );
        assert_eq!(
            provider.get_type(&provider.contract().book_uri(3)).unwrap(),
            "vnd.android.cursor.item/shop.test/books"
        );
    }
}
