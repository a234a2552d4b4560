//! Credentials and settings: YAML file first, environment second.

use std::path::{Path, PathBuf};

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

use crate::error::FatalError;

pub const DEFAULT_BASE_URL: &str = "https://apigw-uswest4.central.arubanetworks.com";
pub const DEFAULT_CONFIG_PATH: &str = "info.yml";

/// Shape of the YAML file. Every field is optional here; required-ness is
/// checked after the environment fallback is applied.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfig {
    #[serde(default, deserialize_with = "scalar")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub client_id: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub client_secret: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub customer_id: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub base_url: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub data_file: Option<String>,
}

// customer_id is often written unquoted
fn scalar<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    use serde_yaml::Value;
    match Option::<Value>::deserialize(d)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(D::Error::custom(format!("expected a scalar value, found {other:?}"))),
    }
}

#[derive(Clone)]
pub struct CentralConfig {
    pub username: String,
    pub password: String,
    pub client_id: String,
    pub client_secret: String,
    pub customer_id: String,
    pub base_url: String,
    pub data_file: Option<PathBuf>,
}

// password and client_secret stay out of logs
impl std::fmt::Debug for CentralConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CentralConfig")
            .field("username", &self.username)
            .field("client_id", &self.client_id)
            .field("customer_id", &self.customer_id)
            .field("base_url", &self.base_url)
            .field("data_file", &self.data_file)
            .finish_non_exhaustive()
    }
}

impl RawConfig {
    /// Reads `path`; a missing file is an empty config.
    pub fn load(path: &Path) -> Result<Self, FatalError> {
        Ok(read_file(path)?.unwrap_or_default())
    }

    /// Manifest location from the file, else `CENTRAL_DATA_FILE`. Needed
    /// before any credential is checked.
    pub fn data_file<F>(&self, env: F) -> Option<PathBuf>
    where
        F: Fn(&str) -> Option<String>,
    {
        pick(self.data_file.clone(), "CENTRAL_DATA_FILE", &env).map(PathBuf::from)
    }
}

fn pick<F>(file: Option<String>, var: &str, env: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    file.filter(|v| !v.trim().is_empty())
        .or_else(|| env(var).filter(|v| !v.trim().is_empty()))
}

impl CentralConfig {
    /// Reads `path` (if it exists) and fills gaps from the process environment.
    pub fn load(path: &Path) -> Result<Self, FatalError> {
        Self::resolve(RawConfig::load(path)?, |k| std::env::var(k).ok())
    }

    /// Applies the environment fallback through `env` and checks required keys.
    pub fn resolve<F>(raw: RawConfig, env: F) -> Result<Self, FatalError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_file = raw.data_file(&env);
        let require = |file: Option<String>, key: &'static str, var: &'static str| {
            pick(file, var, &env).ok_or(FatalError::MissingConfig { key, env: var })
        };

        Ok(Self {
            username: require(raw.username, "username", "CENTRAL_USERNAME")?,
            password: require(raw.password, "password", "CENTRAL_PASSWORD")?,
            client_id: require(raw.client_id, "client_id", "CENTRAL_CLIENT_ID")?,
            client_secret: require(raw.client_secret, "client_secret", "CENTRAL_CLIENT_SECRET")?,
            customer_id: require(raw.customer_id, "customer_id", "CENTRAL_CUSTOMER_ID")?,
            base_url: pick(raw.base_url, "CENTRAL_BASE_URL", &env)
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            data_file,
        })
    }
}

fn read_file(path: &Path) -> Result<Option<RawConfig>, FatalError> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(FatalError::ConfigParse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        }
    };
    parse(&content).map(Some).map_err(|reason| FatalError::ConfigParse {
        path: path.to_path_buf(),
        reason,
    })
}

pub fn parse(content: &str) -> Result<RawConfig, String> {
    if content.trim().is_empty() {
        return Ok(RawConfig::default());
    }
    serde_yaml::from_str(content).map_err(|e| e.to_string())
}
