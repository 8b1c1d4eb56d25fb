use std::path::PathBuf;

use crate::db::{get_connection, init_db, DB_FILENAME};
use crate::error::Result;
use crate::settings::{load_settings, save_settings, shellexpand_path};

pub fn run(data_dir: Option<String>, user: Option<String>, currency: Option<String>) -> Result<()> {
    let mut settings = load_settings();

    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    if let Some(user) = user.filter(|u| !u.trim().is_empty()) {
        settings.user_id = user.trim().to_string();
    }
    if let Some(symbol) = currency {
        settings.currency_symbol = symbol;
    }

    save_settings(&settings)?;

    let resolved = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&resolved)?;

    let conn = get_connection(&resolved.join(DB_FILENAME))?;
    init_db(&conn)?;

    println!("Initialized ledgerlens at {}", resolved.display());
    println!("User: {}  Currency: {}", settings.user_id, settings.currency_symbol);
    Ok(())
}
