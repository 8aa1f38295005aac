use anyhow::{anyhow, Result};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct PerchConfig {
    pub api_port: u16,
    pub paths: PerchPaths,
}

impl PerchConfig {
    pub fn from_env() -> Result<Self> {
        let paths = match env::var("PERCH_BASE_DIR") {
            Ok(base) if !base.trim().is_empty() => PerchPaths::from_base_dir(base)?,
            _ => PerchPaths::discover()?,
        };
        let api_port = env::var("PERCH_API_PORT")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(8080);
        Ok(Self { api_port, paths })
    }

    pub fn new(api_port: u16, paths: PerchPaths) -> Self {
        Self { api_port, paths }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PerchPaths {
    pub base: PathBuf,
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub logs_dir: PathBuf,
}

impl PerchPaths {
    pub fn discover() -> Result<Self> {
        let exe_path = std::env::current_exe()
            .map_err(|err| anyhow!("failed to resolve current executable: {err}"))?;
        let base = exe_path
            .parent()
            .ok_or_else(|| anyhow!("executable path missing parent"))?
            .to_path_buf();
        Self::from_base_dir(base)
    }

    pub fn from_base_dir<P: AsRef<Path>>(base: P) -> Result<Self> {
        let base = base.as_ref().to_path_buf();
        let data_dir = base.join("data");
        let db_path = data_dir.join("perch.db");
        let logs_dir = base.join("logs");

        Ok(Self {
            base,
            data_dir,
            db_path,
            logs_dir,
        })
    }
}
