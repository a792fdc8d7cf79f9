use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_GA_API_BASE_URL: &str = "https://analyticsdata.googleapis.com";
pub const DEFAULT_ADS_API_BASE_URL: &str = "https://googleads.googleapis.com";
pub const DEFAULT_ADS_API_VERSION: &str = "v19";
pub const DEFAULT_OAUTH_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<String>),
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: String, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api_server: ServerConfig,
    pub analytics: AnalyticsConfig,
    pub ads: AdsConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origin for the dashboard front end.
    /// If None, any origin is allowed.
    #[serde(default)]
    pub cors_allow_origin: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// GA4 property id, with or without the `properties/` prefix
    pub property_id: String,
    /// Service-account key file contents (JSON)
    pub credentials_json: String,
    #[serde(default = "AnalyticsConfig::default_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdsConfig {
    pub client_id: String,
    pub client_secret: String,
    pub developer_token: String,
    pub refresh_token: String,
    pub customer_id: String,
    /// Manager account used to reach `customer_id`
    #[serde(default)]
    pub login_customer_id: Option<String>,
    #[serde(default = "AdsConfig::default_base_url")]
    pub base_url: String,
    #[serde(default = "AdsConfig::default_api_version")]
    pub api_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "HttpConfig::default_token_url")]
    pub oauth_token_url: String,
    #[serde(default = "HttpConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl AnalyticsConfig {
    fn default_base_url() -> String {
        DEFAULT_GA_API_BASE_URL.to_string()
    }
}

impl AdsConfig {
    fn default_base_url() -> String {
        DEFAULT_ADS_API_BASE_URL.to_string()
    }

    fn default_api_version() -> String {
        DEFAULT_ADS_API_VERSION.to_string()
    }
}

impl HttpConfig {
    fn default_token_url() -> String {
        DEFAULT_OAUTH_TOKEN_URL.to_string()
    }

    const fn default_timeout_secs() -> u64 {
        30
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            oauth_token_url: Self::default_token_url(),
            timeout_secs: Self::default_timeout_secs(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    ///
    /// Every missing required variable is collected so a single startup
    /// error names all of them.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mut missing = Vec::new();
        let mut required = |name: &str| match get(name) {
            Some(value) => value,
            None => {
                missing.push(name.to_string());
                String::new()
            }
        };

        let property_id = required("GA_PROPERTY_ID");
        let credentials_json = required("GOOGLE_APPLICATION_CREDENTIALS_JSON");
        let client_id = required("GOOGLE_ADS_CLIENT_ID");
        let client_secret = required("GOOGLE_ADS_CLIENT_SECRET");
        let developer_token = required("GOOGLE_ADS_DEVELOPER_TOKEN");
        let refresh_token = required("GOOGLE_ADS_REFRESH_TOKEN");
        let customer_id = required("GOOGLE_ADS_CLIENT_CUSTOMER_ID");

        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let api_host = get("API_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let api_port = parse_var(&get, "API_PORT", 8080u16)?;
        let timeout_secs = parse_var(&get, "PROVIDER_TIMEOUT_SECS", HttpConfig::default_timeout_secs())?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "PROVIDER_TIMEOUT_SECS".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Config {
            api_server: ServerConfig {
                host: api_host,
                port: api_port,
                cors_allow_origin: get("CORS_ALLOW_ORIGIN"),
            },
            analytics: AnalyticsConfig {
                property_id,
                credentials_json,
                base_url: get("GA_API_BASE_URL").unwrap_or_else(AnalyticsConfig::default_base_url),
            },
            ads: AdsConfig {
                client_id,
                client_secret,
                developer_token,
                refresh_token,
                customer_id,
                login_customer_id: get("GOOGLE_ADS_LOGIN_CUSTOMER_ID"),
                base_url: get("GOOGLE_ADS_API_BASE_URL").unwrap_or_else(AdsConfig::default_base_url),
                api_version: get("GOOGLE_ADS_API_VERSION")
                    .unwrap_or_else(AdsConfig::default_api_version),
            },
            http: HttpConfig {
                oauth_token_url: get("GOOGLE_OAUTH_TOKEN_URL")
                    .unwrap_or_else(HttpConfig::default_token_url),
                timeout_secs,
            },
        })
    }
}

fn parse_var<T, G>(get: &G, name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
            name: name.to_string(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
