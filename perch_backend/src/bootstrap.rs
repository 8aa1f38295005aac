use crate::config::PerchConfig;
use crate::database::Database;
use anyhow::Result;
use std::fs;

pub struct BootstrapResources {
    pub directories_created: Vec<String>,
    pub database_initialized: bool,
    pub database: Database,
}

pub async fn initialize(config: &PerchConfig) -> Result<BootstrapResources> {
    let mut directories_created = Vec::new();
    create_dir_if_missing(&config.paths.data_dir, &mut directories_created)?;
    create_dir_if_missing(&config.paths.logs_dir, &mut directories_created)?;

    let database = Database::connect(&config.paths)?;
    let database_initialized = database.ensure_migrations()?;

    Ok(BootstrapResources {
        directories_created,
        database_initialized,
        database,
    })
}

fn create_dir_if_missing(path: &std::path::Path, created: &mut Vec<String>) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
        created.push(path.display().to_string());
    }
    Ok(())
}
