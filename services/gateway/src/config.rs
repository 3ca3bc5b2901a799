use anyhow::{Context, Result, bail};
use incommon_affiliation::ClassificationTables;
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BIND: &str = "0.0.0.0:3000";
pub const DEFAULT_METRICS_BIND: &str = "0.0.0.0:9090";
pub const DEFAULT_TOKEN_URL: &str = "https://api-sandbox.byu.edu/token";
pub const DEFAULT_API_BASE_URL: &str = "https://api-sandbox.byu.edu/byuapi";
pub const DEFAULT_CREDENTIALS_PATH: &str = "in-common.json";
pub const DEFAULT_REALM: &str = "byu.edu";
pub const DEFAULT_TOKEN_RENEW_SECS: u64 = 3500;
pub const DEFAULT_UPSTREAM_TIMEOUT_MS: u64 = 10_000;

// Gateway configuration sourced from environment variables.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind: SocketAddr,
    pub token_url: String,
    pub api_base_url: String,
    pub credentials_path: PathBuf,
    pub realm: String,
    pub token_renew_interval_secs: u64,
    pub upstream_timeout_ms: u64,
    // Built-in BYU tables when unset.
    pub affiliation_tables_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GatewayConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    token_url: Option<String>,
    api_base_url: Option<String>,
    credentials_path: Option<String>,
    realm: Option<String>,
    token_renew_interval_secs: Option<u64>,
    upstream_timeout_ms: Option<u64>,
    affiliation_tables_path: Option<String>,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr = env_or("INCOMMON_BIND", DEFAULT_BIND)
            .parse()
            .with_context(|| "parse INCOMMON_BIND")?;
        let metrics_bind = env_or("INCOMMON_METRICS_BIND", DEFAULT_METRICS_BIND)
            .parse()
            .with_context(|| "parse INCOMMON_METRICS_BIND")?;
        let token_renew_interval_secs =
            env_or("INCOMMON_TOKEN_RENEW_SECS", &DEFAULT_TOKEN_RENEW_SECS.to_string())
                .parse()
                .with_context(|| "parse INCOMMON_TOKEN_RENEW_SECS")?;
        let upstream_timeout_ms = env_or(
            "INCOMMON_UPSTREAM_TIMEOUT_MS",
            &DEFAULT_UPSTREAM_TIMEOUT_MS.to_string(),
        )
        .parse()
        .with_context(|| "parse INCOMMON_UPSTREAM_TIMEOUT_MS")?;
        let config = Self {
            bind_addr,
            metrics_bind,
            token_url: env_or("INCOMMON_TOKEN_URL", DEFAULT_TOKEN_URL),
            api_base_url: env_or("INCOMMON_API_BASE_URL", DEFAULT_API_BASE_URL),
            credentials_path: env_or("INCOMMON_CREDENTIALS_PATH", DEFAULT_CREDENTIALS_PATH).into(),
            realm: env_or("INCOMMON_REALM", DEFAULT_REALM),
            token_renew_interval_secs,
            upstream_timeout_ms,
            affiliation_tables_path: std::env::var("INCOMMON_AFFILIATION_TABLES")
                .ok()
                .filter(|value| !value.is_empty())
                .map(PathBuf::from),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("INCOMMON_CONFIG") {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read INCOMMON_CONFIG: {path}"))?;
            let override_cfg: GatewayConfigOverride = serde_yaml::from_str(&contents)
                .with_context(|| "parse gateway config yaml")?;
            config.apply(override_cfg)?;
            config.validate()?;
        }
        Ok(config)
    }

    fn apply(&mut self, override_cfg: GatewayConfigOverride) -> Result<()> {
        if let Some(value) = override_cfg.bind_addr {
            self.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
        }
        if let Some(value) = override_cfg.metrics_bind {
            self.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
        }
        if let Some(value) = override_cfg.token_url {
            self.token_url = value;
        }
        if let Some(value) = override_cfg.api_base_url {
            self.api_base_url = value;
        }
        if let Some(value) = override_cfg.credentials_path {
            self.credentials_path = value.into();
        }
        if let Some(value) = override_cfg.realm {
            self.realm = value;
        }
        if let Some(value) = override_cfg.token_renew_interval_secs {
            self.token_renew_interval_secs = value;
        }
        if let Some(value) = override_cfg.upstream_timeout_ms {
            self.upstream_timeout_ms = value;
        }
        if let Some(value) = override_cfg.affiliation_tables_path {
            self.affiliation_tables_path = Some(value.into());
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.token_renew_interval_secs == 0 {
            bail!("token_renew_interval_secs must be greater than zero");
        }
        if self.upstream_timeout_ms == 0 {
            bail!("upstream_timeout_ms must be greater than zero");
        }
        if self.token_url.is_empty() {
            bail!("token_url must not be empty");
        }
        if self.api_base_url.is_empty() {
            bail!("api_base_url must not be empty");
        }
        Ok(())
    }

    pub fn token_renew_interval(&self) -> Duration {
        Duration::from_secs(self.token_renew_interval_secs)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }

    /// Membership tables from `affiliation_tables_path`, or the built-in set.
    pub fn classification_tables(&self) -> Result<ClassificationTables> {
        match &self.affiliation_tables_path {
            Some(path) => ClassificationTables::from_yaml_file(path)
                .with_context(|| format!("load affiliation tables from {}", path.display())),
            None => Ok(ClassificationTables::byu_default()),
        }
    }
}
