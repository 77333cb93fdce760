use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `CAMPAIGN_PACER__` and TOML config files.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub postgres: PostgresConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub pacer: PacerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_urls")]
    pub urls: Vec<String>,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_op_timeout_ms")]
    pub op_timeout_ms: u64,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostgresConfig {
    #[serde(default = "default_postgres_url")]
    pub url: String,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

/// Decision-engine tuning: breaker thresholds, background task periods,
/// and the timezone all hour/day buckets are computed in.
#[derive(Debug, Clone, Deserialize)]
pub struct PacerConfig {
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_budget_threshold")]
    pub budget_threshold: f64,
    #[serde(default = "default_max_failures")]
    pub max_failures: u32,
    #[serde(default = "default_breaker_timeout_secs")]
    pub breaker_timeout_secs: u64,
    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,
    #[serde(default = "default_health_probe_interval_secs")]
    pub health_probe_interval_secs: u64,
    #[serde(default = "default_recovery_interval_secs")]
    pub recovery_interval_secs: u64,
    #[serde(default = "default_read_cache_ttl_secs")]
    pub read_cache_ttl_secs: u64,
}

// Default functions
fn default_node_id() -> String {
    "pacer-01".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_redis_urls() -> Vec<String> {
    vec!["redis://localhost:6379".to_string()]
}
fn default_pool_size() -> u32 {
    100
}
fn default_connect_timeout_ms() -> u64 {
    1000
}
fn default_op_timeout_ms() -> u64 {
    1000
}
fn default_probe_timeout_ms() -> u64 {
    1000
}
fn default_postgres_url() -> String {
    "postgres://localhost/campaign_pacer".to_string()
}
fn default_refresh_interval_secs() -> u64 {
    60
}
fn default_metrics_port() -> u16 {
    9091
}
fn default_timezone() -> String {
    "UTC".to_string()
}
fn default_budget_threshold() -> f64 {
    0.95
}
fn default_max_failures() -> u32 {
    3
}
fn default_breaker_timeout_secs() -> u64 {
    300
}
fn default_success_threshold() -> u32 {
    2
}
fn default_health_probe_interval_secs() -> u64 {
    5
}
fn default_recovery_interval_secs() -> u64 {
    10
}
fn default_read_cache_ttl_secs() -> u64 {
    5
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            urls: default_redis_urls(),
            pool_size: default_pool_size(),
            connect_timeout_ms: default_connect_timeout_ms(),
            op_timeout_ms: default_op_timeout_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: default_postgres_url(),
            refresh_interval_secs: default_refresh_interval_secs(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            port: default_metrics_port(),
        }
    }
}

impl Default for PacerConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            budget_threshold: default_budget_threshold(),
            max_failures: default_max_failures(),
            breaker_timeout_secs: default_breaker_timeout_secs(),
            success_threshold: default_success_threshold(),
            health_probe_interval_secs: default_health_probe_interval_secs(),
            recovery_interval_secs: default_recovery_interval_secs(),
            read_cache_ttl_secs: default_read_cache_ttl_secs(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            api: ApiConfig::default(),
            redis: RedisConfig::default(),
            postgres: PostgresConfig::default(),
            metrics: MetricsConfig::default(),
            pacer: PacerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and optional config file.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("CAMPAIGN_PACER")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
