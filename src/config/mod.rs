//! Configuration management
//!
//! Sources, lowest precedence first: built-in defaults, the optional
//! `callflow.toml` file (path from `CALLFLOW_CONFIG`), `CALLFLOW__SECTION__KEY`
//! environment variables, then the legacy `ACCOUNT_SID`, `TWILIO_AUTH_TOKEN`
//! and `DATABASE_URL` variables.

use crate::application::{DispatchSettings, IntentReplies};
use crate::domain::shared::SessionKey;
use crate::domain::voice_flow::{FlowRoutes, FlowScript};
use crate::infrastructure::telephony::TwilioSettings;
use ::config::builder::DefaultState;
use ::config::{ConfigBuilder, ConfigError, Environment, File, Source};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::time::Duration;

pub const CONFIG_PATH_VAR: &str = "CALLFLOW_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "callflow.toml";
const ENV_PREFIX: &str = "CALLFLOW";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub telephony: TelephonyConfig,
    pub database: DatabaseConfig,
    pub flow: FlowScript,
    pub dispatch: DispatchConfig,
    pub intent: IntentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Externally reachable base URL the provider calls back on
    pub public_base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            public_base_url: "http://localhost:8080".to_string(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelephonyConfig {
    pub api_base: String,
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    /// Prefix for bare 10-digit national numbers
    pub default_country_code: String,
    pub timeout_secs: u64,
}

impl Default for TelephonyConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.twilio.com".to_string(),
            account_sid: String::new(),
            auth_token: String::new(),
            from_number: "+12707177822".to_string(),
            default_country_code: "+1".to_string(),
            timeout_secs: 10,
        }
    }
}

impl fmt::Debug for TelephonyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.auth_token.is_empty() { "" } else { "****" };
        f.debug_struct("TelephonyConfig")
            .field("api_base", &self.api_base)
            .field("account_sid", &self.account_sid)
            .field("auth_token", &token)
            .field("from_number", &self.from_number)
            .field("default_country_code", &self.default_country_code)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl TelephonyConfig {
    pub fn has_credentials(&self) -> bool {
        !self.account_sid.is_empty() && !self.auth_token.is_empty()
    }

    pub fn twilio_settings(&self) -> TwilioSettings {
        TwilioSettings {
            api_base: self.api_base.clone(),
            account_sid: self.account_sid.clone(),
            auth_token: self.auth_token.clone(),
            from_number: self.from_number.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

/// No url means the in-memory store
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url.as_ref().map(|_| "****"))
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub default_record_name: String,
    pub default_session_key: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        let settings = DispatchSettings::default();
        Self {
            default_record_name: settings.default_record_name,
            default_session_key: settings.default_session_key.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntentConfig {
    /// Where agent requests are forwarded; `{public_base_url}/call` when unset
    pub origination_url: Option<String>,
    pub timeout_secs: u64,
    pub success_text: String,
    pub failure_text: String,
}

impl Default for IntentConfig {
    fn default() -> Self {
        let replies = IntentReplies::default();
        Self {
            origination_url: None,
            timeout_secs: 10,
            success_text: replies.success_text,
            failure_text: replies.failure_text,
        }
    }
}

impl IntentConfig {
    pub fn replies(&self) -> IntentReplies {
        IntentReplies {
            success_text: self.success_text.clone(),
            failure_text: self.failure_text.clone(),
        }
    }
}

impl Config {
    /// Load configuration from every source
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        let builder = Self::layered(File::with_name(&path).required(false))?
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .set_override_option("telephony.account_sid", env::var("ACCOUNT_SID").ok())?
            .set_override_option("telephony.auth_token", env::var("TWILIO_AUTH_TOKEN").ok())?
            .set_override_option("database.url", env::var("DATABASE_URL").ok())?;

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with one source layered on top
    fn layered<S>(source: S) -> Result<ConfigBuilder<DefaultState>, ConfigError>
    where
        S: Source + Send + Sync + 'static,
    {
        let defaults = ::config::Config::try_from(&Config::default())?;
        Ok(::config::Config::builder()
            .add_source(defaults)
            .add_source(source))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = &self.server.public_base_url;
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::Message(format!(
                "server.public_base_url must be an http(s) url, got {:?}",
                base
            )));
        }

        let code = &self.telephony.default_country_code;
        let digits = code.strip_prefix('+').unwrap_or_default();
        if digits.is_empty() || digits.len() > 3 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(ConfigError::Message(format!(
                "telephony.default_country_code must look like +1, got {:?}",
                code
            )));
        }

        SessionKey::parse(&self.dispatch.default_session_key)
            .map_err(|e| ConfigError::Message(format!("dispatch.default_session_key: {}", e)))?;

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn flow_routes(&self) -> FlowRoutes {
        FlowRoutes::under(&self.server.public_base_url)
    }

    pub fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            default_record_name: self.dispatch.default_record_name.clone(),
            default_session_key: SessionKey::new(self.dispatch.default_session_key.clone()),
        }
    }

    pub fn origination_url(&self) -> String {
        match &self.intent.origination_url {
            Some(url) => url.clone(),
            None => format!("{}/call", self.server.public_base_url.trim_end_matches('/')),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::config::FileFormat;

    fn from_toml(toml: &str) -> Result<Config, ConfigError> {
        let config: Config = Config::layered(File::from_str(toml, FileFormat::Toml))?
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn test_defaults() {
        let config = from_toml("").unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.flow.default_name, "Jaya Prakash");
        assert_eq!(config.dispatch.default_record_name, "TESTUSER");
        assert_eq!(config.dispatch.default_session_key, "active");
        assert!(config.database.url.is_none());
        assert!(!config.telephony.has_credentials());
        assert_eq!(config.origination_url(), "http://localhost:8080/call");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let config = from_toml(
            r#"
            [server]
            port = 9090
            public_base_url = "https://ivr.example.com/"

            [telephony]
            account_sid = "AC123"
            auth_token = "secret"

            [flow]
            default_name = "Ada"

            [intent]
            success_text = "Calling."
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(config.telephony.has_credentials());
        assert_eq!(config.flow.default_name, "Ada");
        assert_eq!(config.flow.sales_text, "You selected sales. Good for you!");
        let replies = config.intent.replies();
        assert_eq!(replies.success_text, "Calling.");
        assert_eq!(replies.failure_text, IntentReplies::default().failure_text);
        assert_eq!(config.origination_url(), "https://ivr.example.com/call");
        assert_eq!(
            config.flow_routes().answer,
            "https://ivr.example.com/answer"
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(from_toml("[server]\npublic_base_url = \"ivr.example.com\"").is_err());
        assert!(from_toml("[telephony]\ndefault_country_code = \"1\"").is_err());
        assert!(from_toml("[dispatch]\ndefault_session_key = \"a b\"").is_err());
    }

    #[test]
    fn test_debug_masks_secrets() {
        let mut config = Config::default();
        config.telephony.auth_token = "secret".to_string();
        config.database.url = Some("postgres://user:pw@db/callflow".to_string());

        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("secret"));
        assert!(!rendered.contains("pw@db"));
    }

    #[test]
    fn test_twilio_settings() {
        let mut config = Config::default();
        config.telephony.timeout_secs = 3;
        let settings = config.telephony.twilio_settings();
        assert_eq!(settings.timeout, Duration::from_secs(3));
        assert_eq!(settings.from_number, "+12707177822");
    }
}
