use crate::config::AppConfig;
use crate::error::AppError;
use photo_store::PhotoStore;
use std::path::PathBuf;
use std::sync::Arc;

/// Path of the photo database, relative paths resolved against the working directory
pub fn get_database_path(config: &AppConfig) -> PathBuf {
    if config.database_path.is_absolute() {
        config.database_path.clone()
    } else {
        std::env::current_dir()
            .map(|dir| dir.join(&config.database_path))
            .unwrap_or_else(|_| config.database_path.clone())
    }
}

/// Opens the photo store, creating the directory and schema as needed
pub fn open_store(config: &AppConfig) -> Result<Arc<PhotoStore>, AppError> {
    let db_path = get_database_path(config);

    // Make sure the directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let store = PhotoStore::open(&db_path, config.store_config())?;
    log::info!("Photo store opened at {:?}", db_path);
    Ok(Arc::new(store))
}
