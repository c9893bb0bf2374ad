use std::{
    collections::HashMap,
    env, fmt, fs,
    path::{Path, PathBuf},
};

use thiserror::Error;

pub const ENDPOINT_PROPERTY: &str = "SUPABASE_URL";
pub const ACCESS_KEY_PROPERTY: &str = "SUPABASE_KEY";

/// Source of the storage endpoint and access key.
///
/// Values are resolved once, when the provider is built. Empty strings are
/// reported as missing.
pub trait CredentialsProvider: Send + Sync {
    fn endpoint(&self) -> Option<String>;

    fn access_key(&self) -> Option<String>;

    /// Both values, or `None` if either one is missing.
    fn credentials(&self) -> Option<Credentials> {
        let endpoint = self.endpoint().filter(|v| !v.trim().is_empty())?;
        let access_key = self.access_key().filter(|v| !v.trim().is_empty())?;

        Some(Credentials {
            endpoint: endpoint.trim().trim_end_matches('/').to_string(),
            access_key: access_key.trim().to_string(),
        })
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub endpoint: String,
    pub access_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("endpoint", &self.endpoint)
            .field("access_key", &"<redacted>")
            .finish()
    }
}

#[derive(Error, Debug)]
pub enum CredentialsError {
    #[error("failed to read credentials file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Credentials known up front, e.g. from tests or an already parsed config.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    endpoint: Option<String>,
    access_key: Option<String>,
}

impl StaticCredentials {
    pub fn new(endpoint: impl Into<String>, access_key: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            access_key: Some(access_key.into()),
        }
    }

    pub fn missing() -> Self {
        Self::default()
    }
}

impl CredentialsProvider for StaticCredentials {
    fn endpoint(&self) -> Option<String> {
        self.endpoint.clone()
    }

    fn access_key(&self) -> Option<String> {
        self.access_key.clone()
    }
}

/// Reads `SUPABASE_URL` and `SUPABASE_KEY` from a packaged `key=value`
/// properties file.
#[derive(Debug, Clone, Default)]
pub struct PropertiesFileCredentials {
    values: HashMap<String, String>,
}

impl PropertiesFileCredentials {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CredentialsError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| CredentialsError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self::parse(&raw))
    }

    pub fn parse(raw: &str) -> Self {
        let values = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
            .filter_map(|line| {
                let split_at = line.find(['=', ':'])?;
                let (name, value) = line.split_at(split_at);
                let name = name.trim();
                if name.is_empty() {
                    return None;
                }
                Some((name.to_string(), value[1..].trim().to_string()))
            })
            .collect();

        Self { values }
    }
}

impl CredentialsProvider for PropertiesFileCredentials {
    fn endpoint(&self) -> Option<String> {
        self.values.get(ENDPOINT_PROPERTY).cloned()
    }

    fn access_key(&self) -> Option<String> {
        self.values.get(ACCESS_KEY_PROPERTY).cloned()
    }
}

/// Reads `SUPABASE_URL` and `SUPABASE_KEY` from the process environment,
/// after loading a `.env` file if one exists.
#[derive(Debug, Clone, Default)]
pub struct EnvCredentials {
    endpoint: Option<String>,
    access_key: Option<String>,
}

impl EnvCredentials {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            endpoint: env::var(ENDPOINT_PROPERTY).ok(),
            access_key: env::var(ACCESS_KEY_PROPERTY).ok(),
        }
    }
}

impl CredentialsProvider for EnvCredentials {
    fn endpoint(&self) -> Option<String> {
        self.endpoint.clone()
    }

    fn access_key(&self) -> Option<String> {
        self.access_key.clone()
    }
}
