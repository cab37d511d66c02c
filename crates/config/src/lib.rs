use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "storefront.toml",
    "config/storefront.toml",
    "crates/config/storefront.toml",
    "../storefront.toml",
    "../config/storefront.toml",
    "../crates/config/storefront.toml",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub realtime: RealtimeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub address: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 7070,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://storefront.db".to_string(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "AuthConfig::default_session_ttl")]
    pub session_ttl_seconds: u64,
    /// Enables `POST /api/auth/dev/token`, which mints users and sessions
    /// without going through the account service.
    #[serde(default)]
    pub allow_dev_tokens: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_seconds: Self::default_session_ttl(),
            allow_dev_tokens: false,
        }
    }
}

impl AuthConfig {
    fn default_session_ttl() -> u64 {
        86_400
    }
}

/// Tuning for the live chat and notification channel.
///
/// ```
/// use storefront_config::RealtimeConfig;
///
/// let realtime = RealtimeConfig::default();
/// assert_eq!(realtime.typing_timeout().as_secs(), 5);
/// assert_eq!(realtime.max_message_length, 4_000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    #[serde(default = "RealtimeConfig::default_typing_timeout")]
    pub typing_timeout_ms: u64,
    #[serde(default = "RealtimeConfig::default_typing_sweep_interval")]
    pub typing_sweep_interval_ms: u64,
    #[serde(default = "RealtimeConfig::default_send_timeout")]
    pub send_timeout_ms: u64,
    #[serde(default = "RealtimeConfig::default_outbound_buffer")]
    pub outbound_buffer: usize,
    #[serde(default = "RealtimeConfig::default_max_message_length")]
    pub max_message_length: usize,
    /// How long a socket opened without a token may wait before `join`.
    #[serde(default = "RealtimeConfig::default_join_timeout")]
    pub join_timeout_ms: u64,
    #[serde(default = "RealtimeConfig::default_heartbeat_interval")]
    pub heartbeat_interval_ms: u64,
    /// A socket that sends no frame at all for this long is closed.
    #[serde(default = "RealtimeConfig::default_idle_timeout")]
    pub idle_timeout_ms: u64,
}

impl RealtimeConfig {
    const fn default_typing_timeout() -> u64 {
        5_000
    }

    const fn default_typing_sweep_interval() -> u64 {
        1_000
    }

    const fn default_send_timeout() -> u64 {
        2_000
    }

    const fn default_outbound_buffer() -> usize {
        64
    }

    const fn default_max_message_length() -> usize {
        4_000
    }

    const fn default_join_timeout() -> u64 {
        10_000
    }

    const fn default_heartbeat_interval() -> u64 {
        30_000
    }

    const fn default_idle_timeout() -> u64 {
        75_000
    }

    pub fn typing_timeout(&self) -> Duration {
        Duration::from_millis(self.typing_timeout_ms)
    }

    pub fn typing_sweep_interval(&self) -> Duration {
        Duration::from_millis(self.typing_sweep_interval_ms.max(1))
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms.max(1))
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            typing_timeout_ms: Self::default_typing_timeout(),
            typing_sweep_interval_ms: Self::default_typing_sweep_interval(),
            send_timeout_ms: Self::default_send_timeout(),
            outbound_buffer: Self::default_outbound_buffer(),
            max_message_length: Self::default_max_message_length(),
            join_timeout_ms: Self::default_join_timeout(),
            heartbeat_interval_ms: Self::default_heartbeat_interval(),
            idle_timeout_ms: Self::default_idle_timeout(),
        }
    }
}

fn clamp_to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use storefront_config::load;
///
/// std::env::remove_var("STOREFRONT_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.http.address.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let mut builder = config::Config::builder()
        .set_default("http.address", defaults.http.address.clone())?
        .set_default("http.port", i64::from(defaults.http.port))?
        .set_default("database.url", defaults.database.url.clone())?
        .set_default(
            "database.max_connections",
            i64::from(defaults.database.max_connections),
        )?
        .set_default(
            "auth.session_ttl_seconds",
            clamp_to_i64(defaults.auth.session_ttl_seconds),
        )?
        .set_default("auth.allow_dev_tokens", defaults.auth.allow_dev_tokens)?
        .set_default(
            "realtime.typing_timeout_ms",
            clamp_to_i64(defaults.realtime.typing_timeout_ms),
        )?
        .set_default(
            "realtime.typing_sweep_interval_ms",
            clamp_to_i64(defaults.realtime.typing_sweep_interval_ms),
        )?
        .set_default(
            "realtime.send_timeout_ms",
            clamp_to_i64(defaults.realtime.send_timeout_ms),
        )?
        .set_default(
            "realtime.outbound_buffer",
            clamp_to_i64(defaults.realtime.outbound_buffer as u64),
        )?
        .set_default(
            "realtime.max_message_length",
            clamp_to_i64(defaults.realtime.max_message_length as u64),
        )?
        .set_default(
            "realtime.join_timeout_ms",
            clamp_to_i64(defaults.realtime.join_timeout_ms),
        )?
        .set_default(
            "realtime.heartbeat_interval_ms",
            clamp_to_i64(defaults.realtime.heartbeat_interval_ms),
        )?
        .set_default(
            "realtime.idle_timeout_ms",
            clamp_to_i64(defaults.realtime.idle_timeout_ms),
        )?;

    let environment_overrides = config::Environment::with_prefix("STOREFRONT").separator("__");

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("STOREFRONT_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via STOREFRONT_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let mut config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    if config.auth.session_ttl_seconds > i64::MAX as u64 {
        config.auth.session_ttl_seconds = i64::MAX as u64;
    }

    if config.realtime.outbound_buffer == 0 {
        anyhow::bail!("realtime.outbound_buffer must be greater than zero");
    }

    if config.realtime.idle_timeout_ms <= config.realtime.heartbeat_interval_ms {
        anyhow::bail!("realtime.idle_timeout_ms must be longer than realtime.heartbeat_interval_ms");
    }

    debug!(?config, "loaded backend configuration");
    Ok(config)
}
