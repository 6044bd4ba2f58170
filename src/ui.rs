//! Ratatui front-end: a book list and a book editor, driven by crossterm key
//! events and refreshed from the provider's change notifications.

mod app;
mod forms;
mod helpers;
mod screens;
mod terminal;

pub use app::App;
pub use terminal::run_app;
