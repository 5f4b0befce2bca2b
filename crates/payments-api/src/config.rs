use std::env;
use std::str::FromStr;

const DEFAULT_PORT: u16 = 4040;
const DEFAULT_DB_PATH: &str = "./payments.db";
const DEFAULT_RATE_LIMIT_RPM: u32 = 120;

/// Where payments are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// SQLite file at `db_path`
    Sqlite,
    /// Process memory; contents are lost on restart
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StorageBackend::Sqlite),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(ConfigError::InvalidStorageBackend(other.to_string())),
        }
    }
}

#[derive(Clone)]
pub struct ApiConfig {
    /// Server port
    pub port: u16,
    /// SQLite database path
    pub db_path: String,
    pub storage: StorageBackend,
    /// CORS allowed origins
    pub allowed_origins: Vec<String>,
    /// Rate limit requests per minute
    pub rate_limit_rpm: u32,
    /// Bearer token required for /metrics endpoint (None = public)
    pub metrics_token: Option<String>,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("port", &self.port)
            .field("db_path", &self.db_path)
            .field("storage", &self.storage)
            .field("allowed_origins", &self.allowed_origins)
            .field("rate_limit_rpm", &self.rate_limit_rpm)
            .field(
                "metrics_token",
                &self.metrics_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            db_path: DEFAULT_DB_PATH.to_string(),
            storage: StorageBackend::Sqlite,
            allowed_origins: default_origins(),
            rate_limit_rpm: DEFAULT_RATE_LIMIT_RPM,
            metrics_token: None,
        }
    }
}

fn default_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
    ]
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Optional: port
        let port = lookup("PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        // Optional: database path
        let db_path = lookup("DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string());

        // Optional: storage backend
        let storage = match lookup("STORAGE_BACKEND").filter(|s| !s.is_empty()) {
            Some(s) => s.parse()?,
            None => StorageBackend::Sqlite,
        };

        // Optional: allowed origins
        let allowed_origins: Vec<String> = lookup("ALLOWED_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_else(default_origins);

        // Optional: rate limit
        let rate_limit_rpm = lookup("RATE_LIMIT_RPM")
            .and_then(|s| s.parse().ok())
            .filter(|&rpm: &u32| rpm > 0)
            .unwrap_or(DEFAULT_RATE_LIMIT_RPM);

        // Optional: metrics token
        let metrics_token = lookup("METRICS_TOKEN").filter(|s| !s.is_empty());

        if allowed_origins.iter().any(|o| o == "*") {
            tracing::warn!("Wildcard CORS origin '*' configured; any site may call the API");
        }

        if metrics_token.is_none() {
            tracing::warn!("METRICS_TOKEN not set, /metrics endpoint is publicly accessible");
        }

        Ok(Self {
            port,
            db_path,
            storage,
            allowed_origins,
            rate_limit_rpm,
            metrics_token,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid STORAGE_BACKEND '{0}' (expected 'sqlite' or 'memory')")]
    InvalidStorageBackend(String),
}
