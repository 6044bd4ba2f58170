//! Persistence layer: the SQLite storage engine plus the resource-addressed
//! provider that the UI reads and writes through.

pub mod connection;
mod error;
mod notify;
mod provider;
mod routing;
mod values;

pub use connection::{open_database, open_in_memory, DATABASE_NAME, DATABASE_VERSION};
pub use error::{ProviderError, ProviderResult};
pub use notify::{ChangeEvent, ChangeNotifier};
pub use provider::{BookProvider, Selection};
pub use routing::{BookRoute, RouteMatch, UriMatcher};
pub use values::BookValues;
