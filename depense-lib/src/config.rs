use actix_web::dev::ConnectionInfo;
use anyhow::Context;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::{env, fs};

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8000";
const DEFAULT_MEDIA_URL: &str = "/media/";
const DEFAULT_MAX_POOL_SIZE: u32 = 10;
const DEFAULT_MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

#[derive(Deserialize)]
pub struct SSLConfig {
    pub private_key_file: PathBuf,
    pub certificate_chain_file: PathBuf,
}

#[derive(Deserialize)]
pub struct TelemetryConfig {
    /// OTLP/gRPC collector endpoint
    pub endpoint: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

#[derive(Deserialize)]
pub struct Config {
    pub database_url: String,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,
    #[serde(default = "default_media_root")]
    pub media_root: PathBuf,
    #[serde(default = "default_media_url")]
    pub media_url: String,
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: usize,
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
    pub ssl: Option<SSLConfig>,
    pub telemetry: Option<TelemetryConfig>,
}

impl Config {
    pub fn from_file(path: PathBuf) -> Result<Config, anyhow::Error> {
        let config = fs::read_to_string(path).context("Unable to read config file")?;
        let config: Config =
            toml::from_str(config.as_str()).with_context(|| "Unable to parse config")?;
        Ok(config)
    }

    pub fn from_env() -> Result<Config, anyhow::Error> {
        let database_url = read_env("DATABASE_URL")?;
        let max_upload_size = match read_optional_env("MAX_UPLOAD_SIZE") {
            Some(size) => size
                .parse()
                .context("Unable to parse MAX_UPLOAD_SIZE value")?,
            None => DEFAULT_MAX_UPLOAD_SIZE,
        };

        let config = Config {
            database_url,
            bind_address: read_optional_env("BIND_ADDRESS").unwrap_or_else(default_bind_address),
            max_pool_size: DEFAULT_MAX_POOL_SIZE,
            media_root: read_optional_env("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(default_media_root),
            media_url: read_optional_env("MEDIA_URL").unwrap_or_else(default_media_url),
            max_upload_size,
            cors_allowed_origins: Vec::new(),
            ssl: None,
            telemetry: None,
        };
        Ok(config)
    }

    pub fn media_config(&self) -> MediaConfig {
        MediaConfig {
            media_url: self.media_url.clone(),
            max_upload_size: self.max_upload_size,
        }
    }
}

/// Request-time settings shared with the handlers.
#[derive(Clone, Debug)]
pub struct MediaConfig {
    /// Prefix joined with an attachment's relative path to build its URL.
    /// Either a path (`/media/`) or an absolute URL.
    pub media_url: String,
    pub max_upload_size: usize,
}

impl MediaConfig {
    /// Path under which attachments are served: the path part of `media_url`
    /// without its trailing slash, or empty for the root.
    pub fn scope_path(&self) -> String {
        let path = match self.media_url.split_once("://") {
            Some((_, rest)) => rest.find('/').map_or("", |i| &rest[i..]),
            None => self.media_url.as_str(),
        };
        let path = path.trim_matches('/');
        if path.is_empty() {
            String::new()
        } else {
            format!("/{}", path)
        }
    }

    /// Absolute prefix of attachment URLs. A relative `media_url` takes the
    /// scheme and host the request came in on.
    pub fn base_url(&self, conn: &ConnectionInfo) -> String {
        if self.media_url.contains("://") {
            self.media_url.trim_end_matches('/').to_owned()
        } else {
            format!("{}://{}{}", conn.scheme(), conn.host(), self.scope_path())
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        MediaConfig {
            media_url: default_media_url(),
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
        }
    }
}

fn read_env(key: &str) -> Result<String, anyhow::Error> {
    env::var(key).with_context(|| format!("Unable to read env var: {}", key))
}

fn read_optional_env(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn default_bind_address() -> String {
    DEFAULT_BIND_ADDRESS.to_owned()
}

fn default_max_pool_size() -> u32 {
    DEFAULT_MAX_POOL_SIZE
}

fn default_media_url() -> String {
    DEFAULT_MEDIA_URL.to_owned()
}

fn default_max_upload_size() -> usize {
    DEFAULT_MAX_UPLOAD_SIZE
}

fn default_media_root() -> PathBuf {
    let state_dir = env::var("STATE_DIRECTORY")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"));
    state_dir.join("media")
}
