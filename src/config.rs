use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_HTTP_BIND: &str = "127.0.0.1:8080";
const DEFAULT_MONGO_URI: &str = "mongodb://127.0.0.1:27017";
const DEFAULT_DATABASE: &str = "warehouse";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Which document store backs the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// In-process store; contents are lost on exit
    Memory,
    #[value(alias = "mongodb")]
    #[serde(alias = "mongodb")]
    Mongo,
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreKind::Memory => write!(f, "memory"),
            StoreKind::Mongo => write!(f, "mongo"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http_bind_address: SocketAddr,
    pub store: StoreKind,
    pub mongo_uri: Option<String>,
    pub database: String,
    /// Upper bound on each store call
    pub request_timeout_ms: u64,
    pub graceful_shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_bind_address: default_bind(),
            store: StoreKind::Mongo,
            mongo_uri: Some(DEFAULT_MONGO_URI.to_string()),
            database: DEFAULT_DATABASE.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            graceful_shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
        }
    }
}

impl ServerConfig {
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let CliArgs {
            config,
            http_bind: cli_http_bind,
            store: cli_store,
            mongo_uri: cli_mongo_uri,
            database: cli_database,
            request_timeout_ms: cli_request_timeout_ms,
            graceful_shutdown_timeout_secs: cli_shutdown_timeout,
        } = args;

        let file_config = if let Some(path) = config.as_ref() {
            load_config_file(path)?
        } else {
            PartialConfig::default()
        };

        let PartialConfig {
            http_bind: file_http_bind,
            store: file_store,
            mongo_uri: file_mongo_uri,
            database: file_database,
            request_timeout_ms: file_request_timeout_ms,
            graceful_shutdown_timeout_secs: file_shutdown_timeout,
        } = file_config;

        let store = cli_store.or(file_store).unwrap_or(StoreKind::Mongo);

        let mongo_uri = cli_mongo_uri
            .or(file_mongo_uri)
            .map(|uri| uri.trim().to_string())
            .filter(|uri| !uri.is_empty())
            .or_else(|| match store {
                StoreKind::Mongo => Some(DEFAULT_MONGO_URI.to_string()),
                StoreKind::Memory => None,
            });

        let database = cli_database
            .or(file_database)
            .map(|name| name.trim().to_string())
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

        Ok(Self {
            http_bind_address: cli_http_bind.or(file_http_bind).unwrap_or_else(default_bind),
            store,
            mongo_uri,
            database,
            request_timeout_ms: cli_request_timeout_ms
                .or(file_request_timeout_ms)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS),
            graceful_shutdown_timeout_secs: cli_shutdown_timeout
                .or(file_shutdown_timeout)
                .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
        })
    }

    /// Fail-fast checks run before the server starts.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.request_timeout_ms > 0,
            "request timeout must be greater than zero"
        );
        anyhow::ensure!(
            !self.database.is_empty(),
            "database name must not be empty"
        );
        if self.store == StoreKind::Mongo {
            anyhow::ensure!(
                self.mongo_uri.is_some(),
                "mongo store selected but no connection URI configured"
            );
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn default_bind() -> SocketAddr {
    DEFAULT_HTTP_BIND
        .parse()
        .expect("default bind address valid")
}

#[derive(Parser, Debug, Default, Clone)]
#[command(name = "warehouse-api", about = "Warehouse inventory HTTP API", version)]
pub struct CliArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Path to a configuration file (YAML or JSON)",
        global = true
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "WAREHOUSE_API_HTTP_BIND",
        value_name = "ADDR",
        help = "HTTP bind address (default 127.0.0.1:8080)"
    )]
    pub http_bind: Option<SocketAddr>,

    #[arg(
        long,
        env = "WAREHOUSE_API_STORE",
        value_enum,
        value_name = "STORE",
        help = "Document store backend (memory or mongo)"
    )]
    pub store: Option<StoreKind>,

    #[arg(
        long,
        env = "WAREHOUSE_API_MONGO_URI",
        value_name = "URI",
        help = "MongoDB connection string"
    )]
    pub mongo_uri: Option<String>,

    #[arg(
        long,
        env = "WAREHOUSE_API_DATABASE",
        value_name = "NAME",
        help = "Database holding the products, warehouse and categories collections"
    )]
    pub database: Option<String>,

    #[arg(
        long,
        env = "WAREHOUSE_API_REQUEST_TIMEOUT_MS",
        value_name = "MS",
        help = "Timeout applied to each store call",
        value_parser = clap::value_parser!(u64)
    )]
    pub request_timeout_ms: Option<u64>,

    #[arg(
        long,
        env = "WAREHOUSE_API_SHUTDOWN_TIMEOUT_SECS",
        value_name = "SECS",
        help = "Maximum time to drain in-flight requests on shutdown",
        value_parser = clap::value_parser!(u64)
    )]
    pub graceful_shutdown_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    http_bind: Option<SocketAddr>,
    store: Option<StoreKind>,
    mongo_uri: Option<String>,
    database: Option<String>,
    request_timeout_ms: Option<u64>,
    graceful_shutdown_timeout_secs: Option<u64>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}
