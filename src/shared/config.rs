use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What to do with a reference that cannot be resolved to a server id.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationPolicy {
    /// Drop the reference, log it, and send the record anyway.
    #[default]
    DropReference,
    /// Keep the record pending and unsent until the reference resolves.
    BlockRecord,
}

impl ReconciliationPolicy {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "drop" | "drop_reference" => Some(Self::DropReference),
            "block" | "block_record" => Some(Self::BlockRecord),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub sync: SyncConfig,
    pub network: NetworkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub auto_sync: bool,
    pub max_retries: u32,
    /// Fixed delay before the single follow-up pass after a failed pass.
    pub retry_delay_ms: u64,
    /// How long a synced record stays readable before it is deleted.
    pub synced_grace_ms: u64,
    #[serde(default)]
    pub reconciliation_policy: ReconciliationPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub probe_interval_secs: u64,
    pub health_path: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: default_database_url(),
                max_connections: 5,
            },
            api: ApiConfig {
                base_url: "http://localhost:8080/api".to_string(),
                timeout_secs: 30,
                access_token: None,
            },
            sync: SyncConfig::default(),
            network: NetworkConfig {
                probe_interval_secs: 15,
                health_path: "/health".to_string(),
            },
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            auto_sync: true,
            max_retries: 3,
            retry_delay_ms: 30_000,
            synced_grace_ms: 5_000,
            reconciliation_policy: ReconciliationPolicy::DropReference,
        }
    }
}

impl SyncConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn synced_grace(&self) -> Duration {
        Duration::from_millis(self.synced_grace_ms)
    }
}

fn default_database_url() -> String {
    let dir = dirs::data_local_dir()
        .map(|dir| dir.join("fieldsync"))
        .unwrap_or_else(|| std::path::PathBuf::from("./data"));
    format!("sqlite://{}?mode=rwc", dir.join("offline.db").display())
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("FIELDSYNC_DATABASE_URL") {
            if !v.trim().is_empty() {
                cfg.database.url = v.trim().to_string();
            }
        }
        if let Some(value) = env_u64("FIELDSYNC_DATABASE_MAX_CONNECTIONS") {
            cfg.database.max_connections = value.clamp(1, u32::MAX as u64) as u32;
        }

        if let Ok(v) = std::env::var("FIELDSYNC_API_BASE_URL") {
            if !v.trim().is_empty() {
                cfg.api.base_url = v.trim().trim_end_matches('/').to_string();
            }
        }
        if let Some(value) = env_u64("FIELDSYNC_API_TIMEOUT_SECS") {
            cfg.api.timeout_secs = value.max(1);
        }
        if let Ok(v) = std::env::var("FIELDSYNC_API_TOKEN") {
            cfg.api.access_token = Some(v).filter(|token| !token.trim().is_empty());
        }

        if let Ok(v) = std::env::var("FIELDSYNC_AUTO_SYNC") {
            cfg.sync.auto_sync = parse_bool(&v, cfg.sync.auto_sync);
        }
        if let Some(value) = env_u64("FIELDSYNC_MAX_RETRIES") {
            cfg.sync.max_retries = value.clamp(1, u32::MAX as u64) as u32;
        }
        if let Some(value) = env_u64("FIELDSYNC_RETRY_DELAY_MS") {
            cfg.sync.retry_delay_ms = value;
        }
        if let Some(value) = env_u64("FIELDSYNC_SYNCED_GRACE_MS") {
            cfg.sync.synced_grace_ms = value;
        }
        if let Ok(v) = std::env::var("FIELDSYNC_RECONCILIATION_POLICY") {
            if let Some(policy) = ReconciliationPolicy::parse(&v) {
                cfg.sync.reconciliation_policy = policy;
            }
        }

        if let Some(value) = env_u64("FIELDSYNC_PROBE_INTERVAL_SECS") {
            cfg.network.probe_interval_secs = value.max(1);
        }
        if let Ok(v) = std::env::var("FIELDSYNC_HEALTH_PATH") {
            if !v.trim().is_empty() {
                cfg.network.health_path = v.trim().to_string();
            }
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }
        if self.api.base_url.trim().is_empty() {
            return Err("API base_url must not be empty".to_string());
        }
        if self.api.timeout_secs == 0 {
            return Err("API timeout_secs must be greater than 0".to_string());
        }
        if self.sync.max_retries == 0 {
            return Err("Sync max_retries must be greater than 0".to_string());
        }
        if self.network.probe_interval_secs == 0 {
            return Err("Network probe_interval_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| parse_u64(&v))
}

fn parse_bool(s: &str, default: bool) -> bool {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}
