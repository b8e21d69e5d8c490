use serde::{Deserialize, Serialize};

use crate::broadcast::composer::NumberingStrategy;

/// SHA-256 of `changeme`. Used for both credentials until configured.
pub const DEFAULT_CREDENTIAL_SHA256: &str =
    "057ba03d6c44104863dc7361fe4578965d1887360f90a0895882e58a6248fc86";

/// Console behaviour shared by every session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleSettings {
    /// Display identities an operator can sign in as. The first one is the
    /// fallback for unknown names.
    pub operators: Vec<String>,
    /// Lowercase hex SHA-256 of the shared console password.
    pub shared_password_sha256: String,
    /// Secret written to a facility that has none when it is revealed.
    pub default_master_password: String,
    /// Composer input that opens the chat passcode prompt instead of
    /// publishing.
    pub unlock_phrase: String,
    /// Lowercase hex SHA-256 of the chat passcode.
    pub chat_passcode_sha256: String,
    pub numbering: NumberingStrategy,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            operators: vec!["Raghav Sachdev".to_string(), "Dhruvi Mittal".to_string()],
            shared_password_sha256: DEFAULT_CREDENTIAL_SHA256.to_string(),
            default_master_password: "ipd-default".to_string(),
            unlock_phrase: "unlock chat".to_string(),
            chat_passcode_sha256: DEFAULT_CREDENTIAL_SHA256.to_string(),
            numbering: NumberingStrategy::Counter,
        }
    }
}

impl ConsoleSettings {
    /// Map a requested identity onto a configured one.
    pub fn resolve_operator(&self, requested: &str) -> String {
        let requested = requested.trim();
        self.operators
            .iter()
            .find(|o| o.as_str() == requested)
            .or_else(|| self.operators.first())
            .cloned()
            .unwrap_or_else(|| requested.to_string())
    }

    pub fn uses_default_credentials(&self) -> bool {
        self.shared_password_sha256 == DEFAULT_CREDENTIAL_SHA256
            || self.chat_passcode_sha256 == DEFAULT_CREDENTIAL_SHA256
    }
}

/// Process configuration: listener, store and console settings.
///
/// Loaded from an optional TOML file and then `IPD__*` environment variables,
/// e.g. `IPD__MONGODB_URI` or `IPD__CONSOLE__UNLOCK_PHRASE`.
#[cfg(feature = "server")]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub listen_addr: String,
    pub mongodb_uri: String,
    pub database: String,
    pub chat_database: String,
    /// Polling interval for the mention subscription when change streams are
    /// unavailable.
    pub feed_poll_interval_ms: u64,
    /// Sessions without a request for this long are closed.
    pub session_idle_timeout_secs: u64,
    pub console: ConsoleSettings,
}

#[cfg(feature = "server")]
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
            mongodb_uri: "mongodb://localhost:27017".to_string(),
            database: "ipd".to_string(),
            chat_database: "ipd-chat".to_string(),
            feed_poll_interval_ms: 2000,
            session_idle_timeout_secs: 1800,
            console: ConsoleSettings::default(),
        }
    }
}

#[cfg(feature = "server")]
impl AppConfig {
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        builder = match path {
            Some(path) => builder.add_source(config::File::with_name(path)),
            None => builder.add_source(config::File::with_name("ipd-console").required(false)),
        };

        builder
            .add_source(
                config::Environment::with_prefix("IPD")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("console.operators")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn feed_poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.feed_poll_interval_ms.max(100))
    }

    pub fn session_idle_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.session_idle_timeout_secs.max(60))
    }
}
