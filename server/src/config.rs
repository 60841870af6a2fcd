//! Runtime configuration.
//!
//! Every option can be given as a flag or through the environment; flags win.
//! Empty values count as "not configured" so that a blank variable in an
//! App Service configuration degrades to in-memory operation.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use clap::{builder::BoolishValueParser, ArgAction, Parser, ValueEnum};

pub const DEFAULT_SECRETS: [&str; 2] = ["sql-connection-string", "api-key-external"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "todo-api", version, about = "Todo CRUD service with best-effort Azure Blob mirroring")]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Address to bind
    #[arg(long, env = "BIND_ADDRESS", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// Storage account that receives mirrored todos
    #[arg(long, env = "AZURE_STORAGE_ACCOUNT_NAME")]
    pub storage_account: Option<String>,

    /// Blob container for mirrored todos
    #[arg(long, env = "AZURE_STORAGE_CONTAINER_NAME", default_value = "data")]
    pub storage_container: String,

    /// Blob endpoint override (emulators, sovereign clouds)
    #[arg(long, env = "AZURE_STORAGE_ENDPOINT")]
    pub storage_endpoint: Option<String>,

    /// Create the container at startup if it does not exist
    #[arg(
        long,
        env = "AZURE_STORAGE_CREATE_CONTAINER",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    pub create_container: bool,

    /// Key Vault to read startup secrets from
    #[arg(long, env = "KEY_VAULT_NAME")]
    pub key_vault: Option<String>,

    /// Key Vault endpoint override
    #[arg(long, env = "KEY_VAULT_ENDPOINT")]
    pub key_vault_endpoint: Option<String>,

    /// Secrets to load from Key Vault
    #[arg(
        long = "secret",
        env = "KEY_VAULT_SECRETS",
        value_delimiter = ',',
        default_values_t = DEFAULT_SECRETS.map(String::from)
    )]
    pub secrets: Vec<String>,

    /// Upper bound for every backend request, in seconds
    #[arg(long, env = "BACKEND_TIMEOUT_SECS", default_value_t = 10)]
    pub backend_timeout_secs: u64,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl Config {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_timeout_secs)
    }

    pub fn storage_account(&self) -> Option<&str> {
        non_empty(&self.storage_account)
    }

    pub fn storage_endpoint(&self) -> Option<&str> {
        non_empty(&self.storage_endpoint)
    }

    pub fn key_vault(&self) -> Option<&str> {
        non_empty(&self.key_vault)
    }

    pub fn key_vault_endpoint(&self) -> Option<&str> {
        non_empty(&self.key_vault_endpoint)
    }

    /// Mirroring is on when either an account or an explicit endpoint is set.
    pub fn storage_configured(&self) -> bool {
        self.storage_account().is_some() || self.storage_endpoint().is_some()
    }

    pub fn key_vault_configured(&self) -> bool {
        self.key_vault().is_some() || self.key_vault_endpoint().is_some()
    }

    pub fn secret_names(&self) -> impl Iterator<Item = &str> {
        self.secrets
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
