use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub booking: BookingRules,
    #[serde(default)]
    pub payment: PaymentConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BookingRules {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
    /// Display only, no conversion happens anywhere
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_debounce_ms() -> u64 { 500 }
fn default_probe_timeout_secs() -> u64 { 10 }
fn default_call_timeout_secs() -> u64 { 15 }
fn default_currency() -> String { "NGN".to_string() }

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            probe_timeout_secs: default_probe_timeout_secs(),
            call_timeout_secs: default_call_timeout_secs(),
            currency: default_currency(),
        }
    }
}

impl BookingRules {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaymentConfig {
    /// Base of the authorization URLs handed out by the mock gateway
    #[serde(default = "default_checkout_url")]
    pub checkout_base_url: String,
}

fn default_checkout_url() -> String { "https://checkout.example.com/pay".to_string() }

impl Default for PaymentConfig {
    fn default() -> Self {
        Self { checkout_base_url: default_checkout_url() }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            // per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `RENTAL__BOOKING__DEBOUNCE_MS=250`
            .add_source(config::Environment::with_prefix("RENTAL").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    pub fn from_toml(contents: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(contents, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}
