use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
    pub content: ContentConfig,
    pub storage: StorageConfig,
    pub broadcast: BroadcastConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub api_base_url: String,
    pub bot_token: SecretString,
    pub request_timeout_secs: u64,
    pub poll_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ContentConfig {
    pub registration_url: String,
    pub question_form_url: Option<String>,
    /// Optional header image per track intent (`track_gamedev` etc.).
    pub track_images: BTreeMap<String, String>,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn users_path(&self) -> PathBuf {
        self.data_dir.join("users.json")
    }

    pub fn dialogs_path(&self) -> PathBuf {
        self.data_dir.join("dialogs.json")
    }

    pub fn feedback_path(&self) -> PathBuf {
        self.data_dir.join("feedback.csv")
    }
}

#[derive(Clone, Debug)]
pub struct BroadcastConfig {
    /// User allowed to trigger the feedback broadcast. When unset the
    /// command is open, matching the original deployment's behavior.
    pub admin_id: Option<i64>,
    /// Pause between sequential broadcast sends, to respect outbound rate
    /// limits without fanning out in parallel.
    pub send_delay_ms: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub bot_token: Option<String>,
    pub api_base_url: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub admin_id: Option<i64>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig {
                api_base_url: "https://platform-api.max.ru".to_string(),
                bot_token: String::new().into(),
                request_timeout_secs: 30,
                poll_timeout_secs: 30,
            },
            content: ContentConfig {
                registration_url: "https://olddigital.rkomi.ru/event/#visit".to_string(),
                question_form_url: None,
                track_images: BTreeMap::new(),
            },
            storage: StorageConfig { data_dir: PathBuf::from("data") },
            broadcast: BroadcastConfig { admin_id: None, send_delay_ms: 500 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("forumbot.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(gateway) = patch.gateway {
            if let Some(api_base_url) = gateway.api_base_url {
                self.gateway.api_base_url = api_base_url;
            }
            if let Some(token) = gateway.bot_token {
                self.gateway.bot_token = token.into();
            }
            if let Some(request_timeout_secs) = gateway.request_timeout_secs {
                self.gateway.request_timeout_secs = request_timeout_secs;
            }
            if let Some(poll_timeout_secs) = gateway.poll_timeout_secs {
                self.gateway.poll_timeout_secs = poll_timeout_secs;
            }
        }

        if let Some(content) = patch.content {
            if let Some(registration_url) = content.registration_url {
                self.content.registration_url = registration_url;
            }
            if let Some(question_form_url) = content.question_form_url {
                self.content.question_form_url = Some(question_form_url);
            }
            if let Some(track_images) = content.track_images {
                self.content.track_images = track_images;
            }
        }

        if let Some(storage) = patch.storage {
            if let Some(data_dir) = storage.data_dir {
                self.storage.data_dir = data_dir;
            }
        }

        if let Some(broadcast) = patch.broadcast {
            if let Some(admin_id) = broadcast.admin_id {
                self.broadcast.admin_id = Some(admin_id);
            }
            if let Some(send_delay_ms) = broadcast.send_delay_ms {
                self.broadcast.send_delay_ms = send_delay_ms;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("FORUMBOT_BOT_TOKEN") {
            self.gateway.bot_token = value.into();
        }
        if let Some(value) = read_env("FORUMBOT_API_BASE_URL") {
            self.gateway.api_base_url = value;
        }
        if let Some(value) = read_env("FORUMBOT_REQUEST_TIMEOUT_SECS") {
            self.gateway.request_timeout_secs =
                parse_u64("FORUMBOT_REQUEST_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("FORUMBOT_REGISTRATION_URL") {
            self.content.registration_url = value;
        }
        if let Some(value) = read_env("FORUMBOT_QUESTION_FORM_URL") {
            self.content.question_form_url = Some(value);
        }
        if let Some(value) = read_env("FORUMBOT_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(value);
        }
        if let Some(value) = read_env("FORUMBOT_ADMIN_ID") {
            self.broadcast.admin_id = Some(parse_i64("FORUMBOT_ADMIN_ID", &value)?);
        }
        if let Some(value) = read_env("FORUMBOT_SEND_DELAY_MS") {
            self.broadcast.send_delay_ms = parse_u64("FORUMBOT_SEND_DELAY_MS", &value)?;
        }
        if let Some(value) = read_env("FORUMBOT_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env("FORUMBOT_LOG_FORMAT") {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(bot_token) = overrides.bot_token {
            self.gateway.bot_token = bot_token.into();
        }
        if let Some(api_base_url) = overrides.api_base_url {
            self.gateway.api_base_url = api_base_url;
        }
        if let Some(data_dir) = overrides.data_dir {
            self.storage.data_dir = data_dir;
        }
        if let Some(admin_id) = overrides.admin_id {
            self.broadcast.admin_id = Some(admin_id);
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gateway.bot_token.expose_secret().trim().is_empty() {
            return Err(ConfigError::Validation(
                "gateway.bot_token is required. Obtain one from the MAX bot platform and set \
                 FORUMBOT_BOT_TOKEN or [gateway] bot_token"
                    .to_string(),
            ));
        }

        let base_url = self.gateway.api_base_url.trim();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "gateway.api_base_url must start with http:// or https://".to_string(),
            ));
        }

        if self.gateway.request_timeout_secs == 0 || self.gateway.request_timeout_secs > 300 {
            return Err(ConfigError::Validation(
                "gateway.request_timeout_secs must be in range 1..=300".to_string(),
            ));
        }

        if self.broadcast.send_delay_ms > 60_000 {
            return Err(ConfigError::Validation(
                "broadcast.send_delay_ms must not exceed 60000".to_string(),
            ));
        }

        let level = self.logging.level.trim().to_ascii_lowercase();
        match level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            _ => Err(ConfigError::Validation(
                "logging.level must be one of trace|debug|info|warn|error".to_string(),
            )),
        }
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("forumbot.toml"), PathBuf::from("config/forumbot.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    toml::from_str::<ConfigPatch>(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_i64(key: &str, value: &str) -> Result<i64, ConfigError> {
    value.parse::<i64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    gateway: Option<GatewayPatch>,
    content: Option<ContentPatch>,
    storage: Option<StoragePatch>,
    broadcast: Option<BroadcastPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct GatewayPatch {
    api_base_url: Option<String>,
    bot_token: Option<String>,
    request_timeout_secs: Option<u64>,
    poll_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ContentPatch {
    registration_url: Option<String>,
    question_form_url: Option<String>,
    track_images: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Default, Deserialize)]
struct StoragePatch {
    data_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct BroadcastPatch {
    admin_id: Option<i64>,
    send_delay_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    #[test]
    fn defaults_fail_validation_without_token() {
        let _guard = env_lock().lock().expect("env lock");
        clear_vars(&["FORUMBOT_BOT_TOKEN"]);

        let error = AppConfig::load(LoadOptions::default()).expect_err("token is required");
        assert!(matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("gateway.bot_token")
        ));
    }

    #[test]
    fn file_then_env_then_override_precedence() {
        let _guard = env_lock().lock().expect("env lock");

        env::set_var("FORUMBOT_BOT_TOKEN", "token-from-env");
        env::set_var("FORUMBOT_LOG_LEVEL", "warn");

        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("forumbot.toml");
        fs::write(
            &path,
            r#"
[gateway]
bot_token = "token-from-file"

[broadcast]
admin_id = 42
send_delay_ms = 250

[logging]
level = "error"
format = "json"
"#,
        )
        .expect("write config");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(path),
            overrides: ConfigOverrides {
                log_level: Some("debug".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("config load");

        assert_eq!(config.gateway.bot_token.expose_secret(), "token-from-env");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.broadcast.admin_id, Some(42));
        assert_eq!(config.broadcast.send_delay_ms, 250);

        clear_vars(&["FORUMBOT_BOT_TOKEN", "FORUMBOT_LOG_LEVEL"]);
    }

    #[test]
    fn storage_paths_derive_from_data_dir() {
        let _guard = env_lock().lock().expect("env lock");
        clear_vars(&["FORUMBOT_BOT_TOKEN"]);

        let config = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                bot_token: Some("t".to_string()),
                data_dir: Some("/var/lib/forumbot".into()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("config load");

        assert_eq!(config.storage.users_path().to_str(), Some("/var/lib/forumbot/users.json"));
        assert_eq!(config.storage.dialogs_path().to_str(), Some("/var/lib/forumbot/dialogs.json"));
        assert_eq!(config.storage.feedback_path().to_str(), Some("/var/lib/forumbot/feedback.csv"));
    }

    #[test]
    fn secret_token_is_not_leaked_by_debug() {
        let _guard = env_lock().lock().expect("env lock");

        let config = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                bot_token: Some("very-secret-token".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("config load");

        let debug = format!("{config:?}");
        assert!(!debug.contains("very-secret-token"));
    }
}
