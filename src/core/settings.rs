use crate::core::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CLIENT_SECRET_ENV: &str = "TOKEN_POLLER_CLIENT_SECRET";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub interval_ms: u64,
    pub token_file: PathBuf,
    pub endpoints: Vec<String>,
    pub oauth: OauthSettings,
    pub http: HttpSettings,
    pub token_store: TokenStoreSettings,
    pub logging: LoggingSettings,

    /// Directory of the loaded config file; relative paths resolve against it.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            interval_ms: 60_000,
            token_file: PathBuf::from("refreshToken.txt"),
            endpoints: Vec::new(),
            oauth: OauthSettings::default(),
            http: HttpSettings::default(),
            token_store: TokenStoreSettings::default(),
            logging: LoggingSettings::default(),
            base_dir: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OauthSettings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub token_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub user_agent: String,
    pub accept: String,
    pub referer: Option<String>,
    pub form_content_type: String,
    pub encoding: String,
    pub timeout_secs: u64,
    pub accept_invalid_certs: bool,
    pub cookies: bool,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: concat!("token-poller/", env!("CARGO_PKG_VERSION")).to_string(),
            accept: "*/*".to_string(),
            referer: None,
            form_content_type: "application/x-www-form-urlencoded".to_string(),
            encoding: "utf-8".to_string(),
            timeout_secs: 30,
            accept_invalid_certs: true,
            cookies: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Delete the old file, then write only if it is really gone.
    #[default]
    Replace,
    /// Write a sibling temp file and rename it over the old one.
    Atomic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenStoreSettings {
    pub write_mode: WriteMode,
    pub watch: bool,
}

impl Default for TokenStoreSettings {
    fn default() -> Self {
        Self {
            write_mode: WriteMode::Replace,
            watch: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub format: LogFormat,
    pub journald: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            journald: false,
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("token-poller").join("config.toml"))
    }

    /// Loads settings from `path`, or from the default location when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path().ok_or(ConfigError::NoConfigDir)?,
        };

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;

        let mut settings = Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        settings.base_dir = path.parent().map(Path::to_path_buf);
        settings.apply_env_overrides();
        Ok(settings)
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(secret) = std::env::var(CLIENT_SECRET_ENV) {
            if !secret.trim().is_empty() {
                self.oauth.client_secret = secret;
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.oauth.client_id.trim().is_empty() {
            return Err(ConfigError::Invalid("oauth.client_id is required".to_string()));
        }
        if self.oauth.client_secret.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "oauth.client_secret is required (or set {CLIENT_SECRET_ENV})"
            )));
        }

        let token_url = url::Url::parse(self.oauth.token_url.trim()).map_err(|e| {
            ConfigError::Invalid(format!(
                "oauth.token_url {:?} is not a valid URL: {e}",
                self.oauth.token_url
            ))
        })?;
        if !matches!(token_url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "oauth.token_url must use http or https, got {}",
                token_url.scheme()
            )));
        }

        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "http.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.token_file.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("token_file must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn token_file_path(&self) -> PathBuf {
        if self.token_file.is_absolute() {
            return self.token_file.clone();
        }
        match &self.base_dir {
            Some(dir) => dir.join(&self.token_file),
            None => self.token_file.clone(),
        }
    }
}
