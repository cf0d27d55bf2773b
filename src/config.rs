use crate::error::ConfigError;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const TIMEOUT_VAR: &str = "MEDIADUMP_TIMEOUT_SECS";

/// Connection settings for a Radarr or Sonarr instance.
#[derive(Debug, Clone)]
pub struct ServarrConfig {
    pub api_key: String,
    pub base_url: Url,
}

#[derive(Debug, Clone)]
pub struct DeezerConfig {
    pub user_id: u64,
}

/// Output paths replacing an upstream's defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputOverrides {
    pub json: Option<PathBuf>,
    pub csv: Option<PathBuf>,
}

/// Names of the variables read for one upstream.
#[derive(Debug, Clone, Copy)]
pub struct EnvKeys {
    pub api_key: &'static str,
    pub base_url: &'static str,
    pub json_path: &'static str,
    pub csv_path: &'static str,
}

pub const RADARR: EnvKeys = EnvKeys {
    api_key: "RADARR_API_KEY",
    base_url: "RADARR_BASE_URL",
    json_path: "RADARR_JSON_PATH",
    csv_path: "RADARR_CSV_PATH",
};

pub const SONARR: EnvKeys = EnvKeys {
    api_key: "SONARR_API_KEY",
    base_url: "SONARR_BASE_URL",
    json_path: "SONARR_JSON_PATH",
    csv_path: "SONARR_CSV_PATH",
};

pub const DEEZER_USER_ID: &str = "DEEZER_USER_ID";
pub const DEEZER_JSON_PATH: &str = "DEEZER_JSON_PATH";
pub const DEEZER_CSV_PATH: &str = "DEEZER_CSV_PATH";

/// Reads settings through a lookup function so they can come from the process
/// environment or from a map in tests.
pub struct Env<F> {
    lookup: F,
}

impl Env<fn(&str) -> Option<String>> {
    /// The process environment, after loading `.env` from the working directory if there is one.
    pub fn from_process() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("loaded environment from {}", path.display());
        }
        Self {
            lookup: |key| std::env::var(key).ok(),
        }
    }
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    pub fn new(lookup: F) -> Self {
        Self { lookup }
    }

    /// A set, non blank value.
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn require(&self, key: &'static str) -> Result<String, ConfigError> {
        self.get(key).ok_or(ConfigError::Missing(key))
    }

    pub fn servarr(&self, keys: EnvKeys) -> Result<ServarrConfig, ConfigError> {
        let api_key = self.require(keys.api_key)?;
        let base_url = parse_base_url(keys.base_url, &self.require(keys.base_url)?)?;
        Ok(ServarrConfig { api_key, base_url })
    }

    pub fn servarr_outputs(&self, keys: EnvKeys) -> OutputOverrides {
        OutputOverrides {
            json: self.get(keys.json_path).map(PathBuf::from),
            csv: self.get(keys.csv_path).map(PathBuf::from),
        }
    }

    pub fn deezer(&self) -> Result<DeezerConfig, ConfigError> {
        let value = self.require(DEEZER_USER_ID)?;
        let user_id = value.parse().map_err(|_| ConfigError::NotNumeric {
            key: DEEZER_USER_ID,
            value,
        })?;
        Ok(DeezerConfig { user_id })
    }

    pub fn deezer_outputs(&self) -> OutputOverrides {
        OutputOverrides {
            json: self.get(DEEZER_JSON_PATH).map(PathBuf::from),
            csv: self.get(DEEZER_CSV_PATH).map(PathBuf::from),
        }
    }

    /// The request timeout, if one is set.
    pub fn timeout(&self) -> Result<Option<Duration>, ConfigError> {
        self.get(TIMEOUT_VAR)
            .map(|value| {
                let secs = value.parse().map_err(|_| ConfigError::NotNumeric {
                    key: TIMEOUT_VAR,
                    value,
                })?;
                validate_timeout(secs)
            })
            .transpose()
    }
}

/// Accept 1 to 300 seconds.
pub fn validate_timeout(secs: u64) -> Result<Duration, ConfigError> {
    if (1..=300).contains(&secs) {
        Ok(Duration::from_secs(secs))
    } else {
        Err(ConfigError::Timeout(secs))
    }
}

/// Parse an absolute http(s) base url. A trailing slash is dropped so paths can be appended.
fn parse_base_url(key: &'static str, value: &str) -> Result<Url, ConfigError> {
    let invalid = || ConfigError::InvalidUrl {
        key,
        value: value.to_string(),
    };

    let url = Url::parse(value.trim_end_matches('/')).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(invalid());
    }
    Ok(url)
}
