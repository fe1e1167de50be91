use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub api_server: ServerConfig,
    pub redirect_server: ServerConfig,
    /// Public base URL used to build the not-found/gone informational
    /// redirect targets (no trailing slash).
    pub base_url: String,
    pub rate_limit: RateLimitConfig,
    /// Name of the edge-supplied header carrying a 2-letter country code.
    pub geo_country_header: String,
    /// Raw `token:user` pairs, comma-separated.
    pub api_tokens: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Counter-store URL. When unset the limiter admits everything.
    pub redis_url: Option<String>,
    pub per_window: u32,
    pub window_secs: u64,
    pub timeout_ms: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let backend_str =
            std::env::var("DATABASE_BACKEND").unwrap_or_else(|_| "sqlite".to_string());

        let backend = match backend_str.to_lowercase().as_str() {
            "postgres" | "postgresql" => DatabaseBackend::Postgres,
            "sqlite" => DatabaseBackend::Sqlite,
            other => {
                tracing::warn!(
                    "Unknown DATABASE_BACKEND '{other}', falling back to 'sqlite'. Supported values: sqlite, postgres"
                );
                DatabaseBackend::Sqlite
            }
        };

        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://./qrly.db".to_string());
        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()?;

        let api_host = std::env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let api_port = std::env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()?;

        let redirect_host =
            std::env::var("REDIRECT_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let redirect_port = std::env::var("REDIRECT_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()?;

        let base_url = std::env::var("BASE_URL")
            .unwrap_or_else(|_| format!("http://{}:{}", redirect_host, redirect_port))
            .trim_end_matches('/')
            .to_string();

        let redis_url = std::env::var("REDIS_URL").ok().filter(|v| !v.is_empty());
        let per_window = std::env::var("RATE_LIMIT_PER_WINDOW")
            .unwrap_or_else(|_| "100".to_string())
            .parse::<u32>()?;
        let window_secs = std::env::var("RATE_LIMIT_WINDOW_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse::<u64>()?;
        let timeout_ms = std::env::var("RATE_LIMIT_TIMEOUT_MS")
            .unwrap_or_else(|_| "500".to_string())
            .parse::<u64>()?;

        let geo_country_header = std::env::var("GEO_COUNTRY_HEADER")
            .unwrap_or_else(|_| "cf-ipcountry".to_string())
            .to_lowercase();

        let api_tokens = std::env::var("API_TOKENS").unwrap_or_default();

        Ok(Config {
            database: DatabaseConfig {
                backend,
                url: database_url,
                max_connections,
            },
            api_server: ServerConfig {
                host: api_host,
                port: api_port,
            },
            redirect_server: ServerConfig {
                host: redirect_host,
                port: redirect_port,
            },
            base_url,
            rate_limit: RateLimitConfig {
                redis_url,
                per_window,
                window_secs,
                timeout_ms,
            },
            geo_country_header,
            api_tokens,
        })
    }
}
