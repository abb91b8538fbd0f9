//! Application settings and configuration structures.

use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::application::relay::RelayConfig;

/// Root configuration structure containing all application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Server configuration (host, port, static files)
    pub server: ServerSettings,

    /// Relay core limits
    pub relay: RelaySettings,

    /// WebSocket transport configuration
    pub websocket: WebSocketSettings,

    /// Connection identity configuration
    pub auth: AuthSettings,

    /// Message persistence configuration
    pub storage: StorageSettings,

    /// PostgreSQL configuration, required by the `postgres` storage backend
    #[serde(default)]
    pub database: Option<DatabaseSettings>,

    /// Redis configuration, required by the `redis` storage backend
    #[serde(default)]
    pub redis: Option<RedisSettings>,

    /// Rate limiting configuration
    pub rate_limit: RateLimitSettings,

    /// CORS configuration
    pub cors: CorsSettings,

    /// Security header configuration
    pub security: SecuritySettings,

    /// Current environment (development, staging, production)
    pub environment: String,
}

/// Server binding configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,

    /// Port number to listen on
    pub port: u16,

    /// Directory served as static files with an `index.html` fallback
    #[serde(default)]
    pub static_dir: Option<String>,
}

/// Relay core limits.
#[derive(Debug, Clone, Deserialize)]
pub struct RelaySettings {
    pub max_rooms: usize,

    /// Longest room message in characters (after trimming)
    pub max_message_length: usize,

    pub default_rooms: Vec<String>,

    /// Room joined automatically on connect
    #[serde(default)]
    pub auto_join_room: Option<String>,

    /// Messages replayed on connect and join
    pub history_limit: usize,

    /// Milliseconds to wait for stored history before replaying none
    pub history_timeout_ms: u64,
}

/// WebSocket configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketSettings {
    /// Upgrade route
    pub path: String,

    /// Maximum transport message size in bytes (default: 64KB)
    pub max_message_size: usize,

    /// Maximum accepted text frame in bytes (default: 16KB)
    pub max_frame_size: usize,

    /// Heartbeat interval in milliseconds (default: 30000)
    pub heartbeat_interval_ms: u64,
}

/// Connection identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    /// HS256 secret; enables token identity when set
    #[serde(default)]
    pub jwt_secret: Option<String>,

    /// Issue a random id when a client presents no device id
    pub allow_anonymous: bool,
}

/// Message persistence backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    None,
    Memory,
    Redis,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    pub backend: StorageBackend,

    /// Messages kept per room by the bounded backends
    pub retention: usize,
}

/// PostgreSQL database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Database connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections to maintain
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout: u64,
}

/// Redis configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisSettings {
    /// Redis connection URL
    pub url: String,

    /// Key prefix for relay data
    #[serde(default = "default_redis_prefix")]
    pub key_prefix: String,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    pub enabled: bool,

    /// Requests allowed per client address per window
    pub max_requests: u32,

    /// Window length in seconds
    pub window_secs: u64,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsSettings {
    /// Allowed origins; `*` allows any
    pub allowed_origins: Vec<String>,
}

/// Security header configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SecuritySettings {
    /// Send `Strict-Transport-Security`
    pub hsts: bool,
}

/// Minimum required length for JWT secret (256 bits = 32 bytes)
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    2
}

fn default_acquire_timeout() -> u64 {
    30
}

fn default_redis_prefix() -> String {
    "relay:".into()
}

impl Settings {
    /// Load settings from environment variables and configuration files.
    ///
    /// The loading order is:
    /// 1. Built-in defaults
    /// 2. config/default.toml (base configuration)
    /// 3. config/{RUN_ENV}.toml (environment-specific overrides)
    /// 4. Environment variables (highest priority)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed,
    /// or if the loaded values are inconsistent.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        // Determine the running environment
        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        let settings: Self = Self::builder(&environment)?
            // Load from config files
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Load from environment variables
            // APP__SERVER__PORT=3000 -> server.port = 3000
            .add_source(
                Environment::default()
                    .prefix("APP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("relay.default_rooms")
                    .with_list_parse_key("cors.allowed_origins")
                    .try_parsing(true),
            )
            // Map simple environment variables
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option("server.port", std::env::var("PORT").ok())?
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("redis.url", std::env::var("REDIS_URL").ok())?
            .set_override_option("auth.jwt_secret", std::env::var("JWT_SECRET").ok())?
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Settings made of the built-in defaults only.
    pub fn defaults() -> Result<Self, ConfigError> {
        let settings: Self = Self::builder("test")?.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn builder(
        environment: &str,
    ) -> Result<config::builder::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("environment", environment)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("relay.max_rooms", 50)?
            .set_default("relay.max_message_length", 1000)?
            .set_default("relay.default_rooms", vec!["general", "random", "support"])?
            .set_default("relay.history_limit", 50)?
            .set_default("relay.history_timeout_ms", 2000_i64)?
            .set_default("websocket.path", "/ws")?
            // WebSocket settings - security limits to prevent DoS
            .set_default("websocket.max_message_size", 65536_i64)? // 64KB
            .set_default("websocket.max_frame_size", 16384_i64)? // 16KB
            .set_default("websocket.heartbeat_interval_ms", 30000_i64)?
            .set_default("auth.allow_anonymous", true)?
            .set_default("storage.backend", "memory")?
            .set_default("storage.retention", 100)?
            .set_default("rate_limit.enabled", true)?
            .set_default("rate_limit.max_requests", 100)?
            .set_default("rate_limit.window_secs", 900)?
            .set_default("cors.allowed_origins", vec!["*"])?
            .set_default("security.hsts", false)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(secret) = &self.auth.jwt_secret {
            // Validate JWT secret length for security
            if secret.len() < MIN_JWT_SECRET_LENGTH {
                return Err(ConfigError::Message(format!(
                    "JWT secret must be at least {} characters. Current length: {}",
                    MIN_JWT_SECRET_LENGTH,
                    secret.len()
                )));
            }
        }
        if self.auth.jwt_secret.is_none() && !self.auth.allow_anonymous {
            tracing::warn!("Anonymous access disabled; clients must present a device id");
        }
        match self.storage.backend {
            StorageBackend::Postgres if self.database.is_none() => Err(ConfigError::Message(
                "storage.backend = postgres requires database.url".into(),
            )),
            StorageBackend::Redis if self.redis.is_none() => Err(ConfigError::Message(
                "storage.backend = redis requires redis.url".into(),
            )),
            _ => Ok(()),
        }?;
        if self.websocket.max_frame_size > self.websocket.max_message_size {
            return Err(ConfigError::Message(
                "websocket.max_frame_size cannot exceed websocket.max_message_size".into(),
            ));
        }
        if self.websocket.heartbeat_interval_ms == 0 {
            return Err(ConfigError::Message(
                "websocket.heartbeat_interval_ms must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Get the full server address as a string.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Relay core tunables derived from these settings.
    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            max_rooms: self.relay.max_rooms,
            max_content_chars: self.relay.max_message_length,
            max_frame_bytes: self.websocket.max_frame_size,
            heartbeat_interval: Duration::from_millis(self.websocket.heartbeat_interval_ms),
            default_rooms: self.relay.default_rooms.clone(),
            auto_join_room: self.relay.auto_join_room.clone(),
            history_limit: self.relay.history_limit,
            history_timeout: Duration::from_millis(self.relay.history_timeout_ms),
        }
    }
}

impl ServerSettings {
    /// Get the socket address for binding.
    pub fn socket_addr(&self) -> Result<std::net::SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}
