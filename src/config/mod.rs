use std::env;

/// Config holds all application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub db_max_connections: u32,
    pub export_path: String,
    pub plan_path: Option<String>,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn load() -> Self {
        Self {
            db_path: get_env("DB_PATH", "topology.db"),
            db_max_connections: get_env("DB_MAX_CONNECTIONS", "1")
                .parse()
                .unwrap_or(1),
            export_path: get_env("EXPORT_PATH", "db_output_test.json"),
            plan_path: env::var("PLAN_PATH").ok().filter(|p| !p.is_empty()),
        }
    }
}

fn get_env(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
