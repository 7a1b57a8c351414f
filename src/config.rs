//! Configuration types for zuora-toolkit

use crate::batch::{BatchSizes, QueryBatchSize};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use url::Url;

/// Default SOAP endpoint (API sandbox, WSDL version 63.0)
pub const DEFAULT_ENDPOINT: &str = "https://apisandbox.zuora.com/apps/services/a/63.0";

/// API credentials
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    /// API user name
    pub username: String,
    /// API user password
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Endpoint descriptor and HTTP settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Initial SOAP endpoint; replaced by the server URL returned at login
    #[serde(default = "default_endpoint")]
    pub url: String,

    /// User-Agent sent on HTTP requests (default: "Zuora/1.0.0")
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Timeout for export file downloads (default: 300 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: default_endpoint(),
            user_agent: default_user_agent(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Session lifetime settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    /// How long a session token is trusted after login (default: 600000 ms)
    #[serde(
        rename = "session_length_millis",
        default = "default_session_length",
        with = "millis_serde"
    )]
    pub session_length: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_length: default_session_length(),
        }
    }
}

/// Query and create/update/delete batching settings
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct BatchConfig {
    /// `QueryOptions.batchSize` for query / queryMore (default: 2000)
    #[serde(default)]
    pub query_batch_size: QueryBatchSize,

    /// Batch size range for create/update/delete/amend (default: 8..=50)
    #[serde(default)]
    pub sizes: BatchSizes,

    /// How long split sub-batches may run before they are reported as timed out
    /// (default: 60 seconds)
    #[serde(default = "default_dispatch_timeout", with = "duration_serde")]
    pub dispatch_timeout: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            query_batch_size: QueryBatchSize::default(),
            sizes: BatchSizes::default(),
            dispatch_timeout: default_dispatch_timeout(),
        }
    }
}

/// Export pipeline settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Sleep between export status polls (default: 5 seconds)
    #[serde(default = "default_poll_interval", with = "duration_serde")]
    pub poll_interval: Duration,

    /// Maximum number of status polls (None = poll until the job completes)
    #[serde(default)]
    pub max_tries: Option<u32>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            max_tries: None,
        }
    }
}

/// Export file download settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Default directory persisted exports are written to (default: ".")
    #[serde(default = "default_drop_dir")]
    pub drop_dir: PathBuf,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            drop_dir: default_drop_dir(),
        }
    }
}

/// Main configuration for ZuoraClient
///
/// Fields are organized into logical sub-configs:
/// - [`credentials`](Credentials) - API user and password
/// - [`endpoint`](EndpointConfig) - endpoint descriptor, user agent, HTTP timeout
/// - [`session`](SessionConfig) - session lifetime
/// - [`batch`](BatchConfig) - query and CRUD batch sizes
/// - [`export`](ExportConfig) - export polling
/// - [`download`](DownloadConfig) - export file drop directory
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// API credentials
    pub credentials: Credentials,

    /// Endpoint descriptor and HTTP settings
    #[serde(default)]
    pub endpoint: EndpointConfig,

    /// Session lifetime
    #[serde(default)]
    pub session: SessionConfig,

    /// Batching limits
    #[serde(default)]
    pub batch: BatchConfig,

    /// Export polling
    #[serde(default)]
    pub export: ExportConfig,

    /// Export downloads
    #[serde(default)]
    pub download: DownloadConfig,
}

impl Config {
    /// Build a config for the given user with defaults everywhere else
    pub fn with_credentials(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            credentials: Credentials {
                username: username.into(),
                password: password.into(),
            },
            ..Default::default()
        }
    }

    /// Parsed initial endpoint
    pub fn endpoint_url(&self) -> Result<Url> {
        let url = Url::parse(&self.endpoint.url).map_err(|e| {
            Error::validation("endpoint.url", format!("invalid endpoint URL: {e}"))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::validation(
                "endpoint.url",
                format!("endpoint must be http or https, got {}", url.scheme()),
            ));
        }
        Ok(url)
    }

    /// Check every setting, failing on the first invalid one
    pub fn validate(&self) -> Result<()> {
        if self.credentials.username.trim().is_empty() {
            return Err(Error::validation(
                "credentials.username",
                "username must not be empty",
            ));
        }
        self.endpoint_url()?;
        if self.session.session_length.is_zero() {
            return Err(Error::validation(
                "session.session_length_millis",
                "session length must be greater than zero",
            ));
        }
        BatchSizes::new(self.batch.sizes.min(), self.batch.sizes.max())?;
        QueryBatchSize::new(self.batch.query_batch_size.get())?;
        if self.export.max_tries == Some(0) {
            return Err(Error::validation(
                "export.max_tries",
                "max_tries must be at least 1 when set",
            ));
        }
        Ok(())
    }

    /// Parse a config from JSON and validate it
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_user_agent() -> String {
    "Zuora/1.0.0".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_session_length() -> Duration {
    Duration::from_millis(600_000)
}

fn default_dispatch_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_drop_dir() -> PathBuf {
    PathBuf::from(".")
}

// Duration serialization helper (whole seconds)
pub(crate) mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }

    /// Same encoding for optional durations
    pub(crate) mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use std::time::Duration;

        pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match duration {
                Some(duration) => serializer.serialize_some(&duration.as_secs()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_secs))
        }
    }
}

// Millisecond Duration serialization helper (session length)
mod millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
