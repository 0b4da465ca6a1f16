//! Runtime settings, layered from defaults, an optional TOML file and
//! `VARINAUT_*` environment variables.

use std::{fmt, path::Path};

use config::{
  Config, ConfigError, Environment, File,
  builder::{ConfigBuilder, DefaultState},
};
use serde::{Deserialize, Deserializer};
use varinaut_api::PagingConfig;
use varinaut_store_sqlite::StoreLocation;

const ENV_PREFIX: &str = "VARINAUT";

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct Settings {
  pub app_name:          String,
  pub debug:             bool,
  pub database_url:      String,
  pub host:              String,
  pub port:              u16,
  /// A list in TOML, or a comma-separated string from the environment.
  #[serde(deserialize_with = "origin_list")]
  pub cors_origins:      Vec<String>,
  pub default_page_size: u64,
  pub max_page_size:     u64,

  // External service credentials. Loaded and passed through only.
  pub ai_model_name:      String,
  pub ai_model_api_key:   String,
  pub ai_model_api_url:   String,
  pub x_api_key:          String,
  pub x_api_secret:       String,
  pub polymarket_api_key: String,
  pub google_api_key:     String,
  pub google_cse_id:      String,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      app_name:           "Varinaut API".to_owned(),
      debug:              true,
      database_url:       "sqlite://./varinaut.db".to_owned(),
      host:               "127.0.0.1".to_owned(),
      port:               8000,
      cors_origins:       vec!["http://localhost:5173".to_owned()],
      default_page_size:  100,
      max_page_size:      1000,
      ai_model_name:      String::new(),
      ai_model_api_key:   String::new(),
      ai_model_api_url:   String::new(),
      x_api_key:          String::new(),
      x_api_secret:       String::new(),
      polymarket_api_key: String::new(),
      google_api_key:     String::new(),
      google_cse_id:      String::new(),
    }
  }
}

impl Settings {
  /// Load settings from `path` (if it exists) and the process environment.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    Self::from_builder(
      Config::builder().add_source(File::from(path).required(false)),
      Environment::with_prefix(ENV_PREFIX),
    )
  }

  fn from_builder(
    builder: ConfigBuilder<DefaultState>,
    env: Environment,
  ) -> Result<Self, ConfigError> {
    // Environment values stay strings; typed fields convert on deserialise.
    let settings: Self = builder
      .add_source(env)
      .build()?
      .try_deserialize()?;
    settings.validate()?;
    Ok(settings)
  }

  fn validate(&self) -> Result<(), ConfigError> {
    if self.default_page_size == 0 || self.max_page_size == 0 {
      return Err(ConfigError::Message(
        "page sizes must be at least 1".to_owned(),
      ));
    }
    Ok(())
  }

  pub fn store_location(&self) -> varinaut_store_sqlite::Result<StoreLocation> {
    StoreLocation::from_url(&self.database_url)
  }

  pub fn paging(&self) -> PagingConfig {
    PagingConfig {
      default_limit: self.default_page_size.min(self.max_page_size),
      max_limit:     self.max_page_size,
    }
  }

  pub fn bind_address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

fn origin_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Origins {
    List(Vec<String>),
    Joined(String),
  }

  Ok(match Origins::deserialize(deserializer)? {
    Origins::List(list) => list,
    Origins::Joined(joined) => joined
      .split(',')
      .map(str::trim)
      .filter(|o| !o.is_empty())
      .map(str::to_owned)
      .collect(),
  })
}

struct Secret<'a>(&'a str);

impl fmt::Debug for Secret<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.0.is_empty() { f.write_str("\"\"") } else { f.write_str("<redacted>") }
  }
}

impl fmt::Debug for Settings {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Settings")
      .field("app_name", &self.app_name)
      .field("debug", &self.debug)
      .field("database_url", &self.database_url)
      .field("host", &self.host)
      .field("port", &self.port)
      .field("cors_origins", &self.cors_origins)
      .field("default_page_size", &self.default_page_size)
      .field("max_page_size", &self.max_page_size)
      .field("ai_model_name", &self.ai_model_name)
      .field("ai_model_api_key", &Secret(&self.ai_model_api_key))
      .field("ai_model_api_url", &self.ai_model_api_url)
      .field("x_api_key", &Secret(&self.x_api_key))
      .field("x_api_secret", &Secret(&self.x_api_secret))
      .field("polymarket_api_key", &Secret(&self.polymarket_api_key))
      .field("google_api_key", &Secret(&self.google_api_key))
      .field("google_cse_id", &Secret(&self.google_cse_id))
      .finish()
  }
}
