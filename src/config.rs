use serde::Deserialize;

use crate::models::{Provider, slug};
use crate::recorder::RecorderError;

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_STORAGE_CLASS: &str = "StandardStorage";
pub const AWS_NAMESPACE: &str = "AWS/S3";
pub const DEFAULT_OCI_ENDPOINT_TEMPLATE: &str = "https://telemetry.{region}.oraclecloud.com";
pub const DEFAULT_OCI_NAMESPACE_TEMPLATE: &str = "oci_objectstorage/{namespace}";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub recorder: RecorderConfig,
    /// Legacy flat keys, used when the provider section leaves a key unset.
    #[serde(default)]
    pub s3: BucketConfig,
    pub aws: Option<BucketConfig>,
    pub oci: Option<OciConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_pool_size: u32,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// Optional cron expression for prune + VACUUM (e.g. "0 30 3 * * *"). Uses local time.
    #[serde(default)]
    pub maintenance_schedule: Option<String>,
    /// Run maintenance every N seconds when maintenance_schedule is not set.
    #[serde(default = "default_maintenance_interval_secs")]
    pub maintenance_interval_secs: u64,
}

fn default_retention_days() -> u32 {
    30
}

fn default_maintenance_interval_secs() -> u64 {
    86_400
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecorderConfig {
    #[serde(default)]
    pub provider: Provider,
    /// Beat period. Must divide into a minute so every hour sees a minute-0 beat.
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

fn default_heartbeat_interval_secs() -> u64 {
    60
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500
}

/// Per-provider (or legacy) connection and bucket keys. All optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BucketConfig {
    pub region: Option<String>,
    pub key: Option<String>,
    pub secret: Option<String>,
    pub bucket: Option<String>,
    pub class: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OciConfig {
    /// Tenancy object-storage namespace.
    pub namespace: Option<String>,
    #[serde(flatten)]
    pub bucket: BucketConfig,
    /// Full metrics endpoint URL; templated from the region when unset.
    pub endpoint: Option<String>,
}

/// Static API credentials. Without them the AWS default credential chain is used.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub key: String,
    pub secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &self.key)
            .field("secret", &"***")
            .finish()
    }
}

/// Everything one recording cycle needs to reach a provider and name the bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub provider: Provider,
    pub region: String,
    pub credentials: Option<Credentials>,
    pub bucket: String,
    pub storage_class: String,
    pub namespace: String,
    /// Custom metrics endpoint (OCI); None uses the provider default.
    pub endpoint: Option<String>,
}

impl ProviderSettings {
    pub fn slug(&self) -> String {
        slug(self.provider, &self.bucket, &self.storage_class)
    }
}

/// `scoped ?? legacy ?? default`. Empty strings count as unset.
pub fn resolve(
    scoped: Option<&str>,
    legacy: Option<&str>,
    default: Option<&str>,
) -> Option<String> {
    scoped
        .filter(|s| !s.is_empty())
        .or(legacy.filter(|s| !s.is_empty()))
        .or(default)
        .map(str::to_string)
}

fn template(pattern: &str, name: &str, value: &str) -> String {
    pattern.replace(&format!("{{{name}}}"), value)
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.database.retention_days > 0,
            "database.retention_days must be > 0, got {}",
            self.database.retention_days
        );
        anyhow::ensure!(
            self.database.maintenance_interval_secs > 0,
            "database.maintenance_interval_secs must be > 0, got {}",
            self.database.maintenance_interval_secs
        );
        if let Some(ref schedule) = self.database.maintenance_schedule {
            anyhow::ensure!(
                <cron::Schedule as std::str::FromStr>::from_str(schedule).is_ok(),
                "database.maintenance_schedule is not a valid cron expression: {}",
                schedule
            );
        }
        let beat = self.recorder.heartbeat_interval_secs;
        anyhow::ensure!(
            beat > 0 && 60 % beat == 0,
            "recorder.heartbeat_interval_secs must divide 60, got {}",
            beat
        );
        anyhow::ensure!(
            self.recorder.request_timeout_secs > 0,
            "recorder.request_timeout_secs must be > 0, got {}",
            self.recorder.request_timeout_secs
        );
        anyhow::ensure!(
            self.recorder.max_attempts > 0,
            "recorder.max_attempts must be > 0, got {}",
            self.recorder.max_attempts
        );
        Ok(())
    }

    /// Resolves connection and bucket parameters for `provider` from the
    /// provider section, then the legacy `[s3]` keys, then defaults.
    pub fn provider_settings(&self, provider: Provider) -> Result<ProviderSettings, RecorderError> {
        let missing = |field: &'static str| RecorderError::ConfigurationMissing { provider, field };
        let legacy = &self.s3;

        let (scoped, oci) = match provider {
            Provider::Aws => (self.aws.clone().unwrap_or_default(), None),
            Provider::Oci => {
                let oci = self.oci.as_ref().ok_or_else(|| missing("oci"))?;
                (oci.bucket.clone(), Some(oci))
            }
        };

        let pick = |scoped: &Option<String>, legacy: &Option<String>, default: Option<&str>| {
            resolve(scoped.as_deref(), legacy.as_deref(), default)
        };
        let region = pick(&scoped.region, &legacy.region, Some(DEFAULT_REGION))
            .ok_or_else(|| missing("region"))?;
        let bucket = pick(&scoped.bucket, &legacy.bucket, None).ok_or_else(|| missing("bucket"))?;
        let storage_class = pick(&scoped.class, &legacy.class, Some(DEFAULT_STORAGE_CLASS))
            .ok_or_else(|| missing("class"))?;
        let key = pick(&scoped.key, &legacy.key, None);
        let secret = pick(&scoped.secret, &legacy.secret, None);
        let credentials = match (key, secret) {
            (Some(key), Some(secret)) => Some(Credentials { key, secret }),
            _ => None,
        };

        let (namespace, endpoint) = match oci {
            None => (AWS_NAMESPACE.to_string(), None),
            Some(oci) => {
                let ns = oci
                    .namespace
                    .as_deref()
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| missing("namespace"))?;
                let endpoint = resolve(
                    oci.endpoint.as_deref(),
                    None,
                    Some(template(DEFAULT_OCI_ENDPOINT_TEMPLATE, "region", &region).as_str()),
                );
                (
                    template(DEFAULT_OCI_NAMESPACE_TEMPLATE, "namespace", ns),
                    endpoint,
                )
            }
        };

        Ok(ProviderSettings {
            provider,
            region,
            credentials,
            bucket,
            storage_class,
            namespace,
            endpoint,
        })
    }
}
