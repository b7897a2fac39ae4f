//! Configuration

use std::path::PathBuf;

use clap::Args;

pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";

/// Remote cart API settings.
#[derive(Debug, Clone, Args)]
pub struct GatewayConfig {
    /// Base URL of the storefront API
    #[arg(long = "api-url", env = "STOREFRONT_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Transport timeout for API calls, in seconds
    #[arg(long = "http-timeout-secs", env = "STOREFRONT_HTTP_TIMEOUT_SECS", default_value_t = 10)]
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self { api_url: DEFAULT_API_URL.to_owned(), timeout_secs: 10 }
    }
}

/// Local persistence settings.
#[derive(Debug, Clone, Args)]
pub struct StorageConfig {
    /// Directory holding the persisted cart and session
    #[arg(long = "data-dir", env = "STOREFRONT_DATA_DIR", default_value = ".storefront")]
    pub data_dir: PathBuf,

    /// JSON product catalog to use instead of the built-in snapshot
    #[arg(long, env = "STOREFRONT_CATALOG")]
    pub catalog: Option<PathBuf>,
}
