use std::{path::PathBuf, str::FromStr};

use serde::Deserialize;
use serde_with::serde_as;
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use strum::{Display, EnumString};

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub storage: StorageSettings,
    pub camera: CameraSettings,
    pub media: MediaSettings,
    pub profile_cache: ProfileCacheSettings,
}

#[serde_as]
#[derive(Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub port: u16,
    pub host: String,
}

#[serde_as]
#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub port: u16,
    pub host: String,
    pub database_name: String,
    pub require_ssl: bool,
}

#[serde_as]
#[derive(Deserialize, Clone, Debug)]
pub struct StorageSettings {
    pub bucket: String,
    /// Properties file with `SUPABASE_URL` and `SUPABASE_KEY`. The process
    /// environment is used when unset.
    pub credentials_file: Option<PathBuf>,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub signed_url_ttl_days: i64,
}

#[serde_as]
#[derive(Deserialize, Clone, Debug)]
pub struct CameraSettings {
    /// Whether the host grants camera access at all.
    pub enabled: bool,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub timeout_secs: u64,
}

#[serde_as]
#[derive(Deserialize, Clone, Debug)]
pub struct MediaSettings {
    pub normalize_jpeg: bool,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub jpeg_quality: u8,
    pub gallery_dir: Option<PathBuf>,
}

#[serde_as]
#[derive(Deserialize, Clone, Debug)]
pub struct ProfileCacheSettings {
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub ttl_secs: u64,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub max_capacity: u64,
}

impl DatabaseSettings {
    pub fn without_db(&self) -> PgConnectOptions {
        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };

        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .password(&self.password)
            .ssl_mode(ssl_mode)
    }

    pub fn with_db(&self) -> PgConnectOptions {
        self.without_db().database(&self.database_name)
    }
}

pub fn read_config() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().map_err(|e| {
        config::ConfigError::Message(format!("Failed to determine the current directory: {e}"))
    })?;
    let config_directory = base_path.join("config");

    let environment = Environment::from_str(
        std::env::var("APP_ENVIRONMENT")
            .unwrap_or_else(|_| "local".into())
            .as_str(),
    )
    .map_err(|e| config::ConfigError::Message(format!("Failed to parse APP_ENVIRONMENT: {e}")))?;
    let environment_filename = format!("{}.yaml", environment);

    let settings = config::Config::builder()
        .add_source(config::File::from(config_directory.join("base.yaml")))
        .add_source(config::File::from(
            config_directory.join(environment_filename),
        ))
        .add_source(
            config::Environment::with_prefix("AVATAR")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}

#[derive(Display, Debug, EnumString, PartialEq, Eq)]
pub enum Environment {
    #[strum(ascii_case_insensitive, serialize = "local")]
    Local,
    #[strum(ascii_case_insensitive, serialize = "production")]
    Production,
}
