use serde::Deserialize;

use crate::error::{CrmError, CrmResult};

/// Root application configuration. Loaded from an optional `mini-crm.toml`
/// and environment variables with the prefix `MINI_CRM__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default = "default_seed_demo_data")]
    pub seed_demo_data: bool,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Dashboard origin allowed by CORS. `None` means permissive.
    #[serde(default)]
    pub cors_origin: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

/// Tuning for the simulated message vendor.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    /// Probability that a simulated send succeeds, in `[0, 1]`.
    #[serde(default = "default_success_rate")]
    pub success_rate: f64,
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_failure_reasons")]
    pub failure_reasons: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_auth_enabled")]
    pub enabled: bool,
    #[serde(default = "default_dev_password")]
    pub dev_password: String,
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
}

// Default functions
fn default_node_id() -> String {
    "crm-01".to_string()
}
fn default_seed_demo_data() -> bool {
    true
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    5000
}
fn default_metrics_enabled() -> bool {
    true
}
fn default_metrics_port() -> u16 {
    9091
}
fn default_success_rate() -> f64 {
    0.9
}
fn default_min_delay_ms() -> u64 {
    500
}
fn default_max_delay_ms() -> u64 {
    3000
}
fn default_failure_reasons() -> Vec<String> {
    vec![
        "Recipient unreachable".to_string(),
        "Mailbox full".to_string(),
        "Invalid contact details".to_string(),
        "Rejected by carrier".to_string(),
    ]
}
fn default_auth_enabled() -> bool {
    true
}
fn default_dev_password() -> String {
    "crm-dev".to_string()
}
fn default_token_ttl_hours() -> i64 {
    24
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
            cors_origin: None,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            port: default_metrics_port(),
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            success_rate: default_success_rate(),
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            failure_reasons: default_failure_reasons(),
        }
    }
}

impl DeliveryConfig {
    /// Deterministic, zero-latency vendor. Every send resolves with `success`.
    pub fn immediate(success: bool) -> Self {
        Self {
            success_rate: if success { 1.0 } else { 0.0 },
            min_delay_ms: 0,
            max_delay_ms: 0,
            failure_reasons: default_failure_reasons(),
        }
    }

    pub fn validate(&self) -> CrmResult<()> {
        if !(0.0..=1.0).contains(&self.success_rate) {
            return Err(CrmError::Config(format!(
                "delivery.success_rate must be within [0, 1], got {}",
                self.success_rate
            )));
        }
        if self.min_delay_ms > self.max_delay_ms {
            return Err(CrmError::Config(format!(
                "delivery.min_delay_ms ({}) exceeds delivery.max_delay_ms ({})",
                self.min_delay_ms, self.max_delay_ms
            )));
        }
        Ok(())
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: default_auth_enabled(),
            dev_password: default_dev_password(),
            token_ttl_hours: default_token_ttl_hours(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            seed_demo_data: default_seed_demo_data(),
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            delivery: DeliveryConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `mini-crm.toml` (if present) and environment variables.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        Self::load_from("mini-crm")
    }

    /// Same as [`AppConfig::load`] with an explicit config file stem or path.
    pub fn load_from(file: &str) -> Result<Self, ::config::ConfigError> {
        let builder = ::config::Config::builder()
            .add_source(::config::File::with_name(file).required(false))
            .add_source(
                ::config::Environment::with_prefix("MINI_CRM")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("delivery.failure_reasons"),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
