use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

pub struct Config {
    pub db_path: PathBuf,
}

impl Config {
    /// Resolve paths from `MISE_DATA_DIR` / `MISE_DB_PATH`, falling back to the platform data dir.
    pub fn load() -> Result<Self> {
        Self::resolve(
            std::env::var_os("MISE_DATA_DIR").map(PathBuf::from),
            std::env::var_os("MISE_DB_PATH").map(PathBuf::from),
        )
    }

    pub fn resolve(data_dir: Option<PathBuf>, db_path: Option<PathBuf>) -> Result<Self> {
        let data_dir = match data_dir {
            Some(dir) => dir,
            None => ProjectDirs::from("", "", "mise")
                .context("Could not determine home directory")?
                .data_dir()
                .to_path_buf(),
        };
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let db_path = db_path.unwrap_or_else(|| data_dir.join("mise.db"));

        Ok(Config { db_path })
    }
}

/// A fresh 64-character hex bearer token.
pub fn generate_token() -> String {
    use rand::Rng;
    use std::fmt::Write;

    let bytes: [u8; 32] = rand::rng().random();
    bytes
        .iter()
        .fold(String::with_capacity(64), |mut acc: String, b| {
            let _ = write!(acc, "{b:02x}");
            acc
        })
}
