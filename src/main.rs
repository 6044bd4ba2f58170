//! Binary entry point: load settings, start file logging, open the store and
//! hand control to the Ratatui event loop until the user exits.
use bookshop_inventory::config::{data_dir, LOG_FILE_NAME};
use bookshop_inventory::logging::init_file_logging;
use bookshop_inventory::{
    open_database, run_app, App, AppConfig, BookContract, BookProvider, DATABASE_VERSION,
};
use tracing::info;

fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    init_file_logging(&data_dir()?.join(LOG_FILE_NAME))?;

    let db_path = config.database_path()?;
    info!(path = %db_path.display(), authority = %config.authority, "opening inventory");
    let conn = open_database(&db_path, DATABASE_VERSION)?;
    let provider = BookProvider::with_contract(conn, BookContract::new(config.authority.clone()));

    let mut app = App::new(provider, config)?;
    run_app(&mut app)
}
