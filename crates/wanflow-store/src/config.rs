//! Store configuration. The database path is resolved once, absolutely,
//! so the database location never depends on the process's current
//! working directory.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub database_path: PathBuf,
}

impl StoreConfig {
    pub fn from_env() -> Self {
        let database_path = std::env::var("WANFLOW_DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./wanflow_queue.db"));
        let database_path = if database_path.is_absolute() {
            database_path
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(&database_path))
                .unwrap_or(database_path)
        };
        Self { database_path }
    }

    pub fn connect_url(&self) -> String {
        format!("sqlite://{}?mode=rwc", self.database_path.display())
    }
}
