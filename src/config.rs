//! Runtime configuration read from the environment.
use std::path::PathBuf;

pub const DEFAULT_DB_PATH: &str = "db.sqlite3";
pub const DEFAULT_OWNER: &str = "local";

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub owner_id: String,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let db_path = non_blank("FLASHCARDS_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

        let owner_id = non_blank("FLASHCARDS_OWNER")
            .map(|value| value.trim().to_string())
            .unwrap_or_else(|| DEFAULT_OWNER.to_string());

        let log_level = non_blank("RUST_LOG").unwrap_or_else(|| "info".to_string());

        Self {
            db_path,
            owner_id,
            log_level,
        }
    }
}
