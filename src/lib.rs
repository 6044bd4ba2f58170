//! Bookshop inventory: a SQLite-backed book store addressed through
//! `content://` resource identifiers, plus the terminal UI that drives it.
pub mod config;
pub mod contract;
pub mod db;
pub mod logging;
pub mod models;
pub mod money;
pub mod ui;

pub use config::AppConfig;
pub use contract::{BookColumn, BookContract};
pub use db::{
    open_database, open_in_memory, BookProvider, BookValues, ProviderError, Selection,
    DATABASE_VERSION,
};
pub use models::Book;

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
