// Config loading, validation and provider resolution tests

use s3pulse::config::AppConfig;
use s3pulse::models::Provider;
use s3pulse::recorder::RecorderError;

const VALID_CONFIG: &str = r#"
[server]
port = 8081
host = "0.0.0.0"

[database]
path = "data/s3pulse.db"
max_pool_size = 4

[recorder]
provider = "aws"
heartbeat_interval_secs = 60
request_timeout_secs = 30
max_attempts = 3

[s3]
region = "us-west-2"
key = "legacy-key"
secret = "legacy-secret"
bucket = "legacy-bucket"
class = "StandardStorage"

[aws]
bucket = "aws-bucket"
"#;

#[test]
fn test_config_loads_from_str() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("load_from_str");
    assert_eq!(config.server.port, 8081);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.database.path, "data/s3pulse.db");
    assert_eq!(config.recorder.provider, Provider::Aws);
    assert_eq!(config.recorder.max_attempts, 3);
}

#[test]
fn test_config_defaults_when_omitted() {
    let minimal = r#"
[server]
port = 8081
host = "0.0.0.0"

[database]
path = "data/s3pulse.db"
max_pool_size = 4
"#;
    let config = AppConfig::load_from_str(minimal).expect("valid");
    assert_eq!(config.database.retention_days, 30);
    assert_eq!(config.database.maintenance_interval_secs, 86_400);
    assert!(config.database.maintenance_schedule.is_none());
    assert_eq!(config.recorder.provider, Provider::Aws);
    assert_eq!(config.recorder.heartbeat_interval_secs, 60);
    assert_eq!(config.recorder.request_timeout_secs, 30);
    assert_eq!(config.recorder.max_attempts, 3);
    assert_eq!(config.recorder.retry_backoff_ms, 500);
    assert!(config.aws.is_none());
    assert!(config.oci.is_none());
}

#[test]
fn test_config_validation_rejects_invalid_port() {
    let bad = VALID_CONFIG.replace("port = 8081", "port = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("server.port"));
}

#[test]
fn test_config_validation_rejects_empty_db_path() {
    let bad = VALID_CONFIG.replace("path = \"data/s3pulse.db\"", "path = \"\"");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("database.path"));
}

#[test]
fn test_config_validation_rejects_max_pool_size_zero() {
    let bad = VALID_CONFIG.replace("max_pool_size = 4", "max_pool_size = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("max_pool_size"));
}

#[test]
fn test_config_validation_rejects_heartbeat_not_dividing_minute() {
    for bad_value in ["0", "45", "120"] {
        let bad = VALID_CONFIG.replace(
            "heartbeat_interval_secs = 60",
            &format!("heartbeat_interval_secs = {bad_value}"),
        );
        let err = AppConfig::load_from_str(&bad).unwrap_err();
        assert!(err.to_string().contains("heartbeat_interval_secs"));
    }
}

#[test]
fn test_config_validation_rejects_request_timeout_zero() {
    let bad = VALID_CONFIG.replace("request_timeout_secs = 30", "request_timeout_secs = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("request_timeout_secs"));
}

#[test]
fn test_config_validation_rejects_max_attempts_zero() {
    let bad = VALID_CONFIG.replace("max_attempts = 3", "max_attempts = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("max_attempts"));
}

#[test]
fn test_config_validation_rejects_bad_cron() {
    let bad = VALID_CONFIG.replace(
        "max_pool_size = 4",
        "max_pool_size = 4\nmaintenance_schedule = \"every day\"",
    );
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("maintenance_schedule"));
}

#[test]
fn test_config_accepts_valid_cron() {
    let good = VALID_CONFIG.replace(
        "max_pool_size = 4",
        "max_pool_size = 4\nmaintenance_schedule = \"0 30 3 * * *\"",
    );
    assert!(AppConfig::load_from_str(&good).is_ok());
}

#[test]
fn test_config_rejects_unknown_provider() {
    let bad = VALID_CONFIG.replace("provider = \"aws\"", "provider = \"gcs\"");
    assert!(AppConfig::load_from_str(&bad).is_err());
}

#[test]
fn test_config_validation_rejects_invalid_toml() {
    let err = AppConfig::load_from_str("not valid toml [[[").unwrap_err();
    assert!(!err.to_string().is_empty());
}

#[test]
fn test_config_load_from_file_via_env() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, VALID_CONFIG).unwrap();
    unsafe { std::env::set_var("CONFIG_FILE", path.to_str().unwrap()) };
    let result = AppConfig::load();
    unsafe { std::env::remove_var("CONFIG_FILE") };
    let config = result.expect("load from CONFIG_FILE");
    assert_eq!(config.server.port, 8081);
    assert_eq!(config.database.path, "data/s3pulse.db");
}

#[test]
fn test_aws_settings_merge_scoped_and_legacy_keys() {
    let config = AppConfig::load_from_str(VALID_CONFIG).unwrap();
    let s = config.provider_settings(Provider::Aws).unwrap();
    assert_eq!(s.bucket, "aws-bucket");
    assert_eq!(s.region, "us-west-2");
    assert_eq!(s.storage_class, "StandardStorage");
    assert_eq!(s.namespace, "AWS/S3");
    assert!(s.endpoint.is_none());
    let creds = s.credentials.as_ref().expect("legacy credentials");
    assert_eq!(creds.key, "legacy-key");
    assert_eq!(s.slug(), "aws.aws-bucket.StandardStorage");
}

#[test]
fn test_aws_settings_without_credentials_use_default_chain() {
    let config = AppConfig::load_from_str(
        r#"
[server]
port = 8081
host = "0.0.0.0"

[database]
path = "data/s3pulse.db"
max_pool_size = 4

[aws]
bucket = "b"
key = "only-key"
"#,
    )
    .unwrap();
    let s = config.provider_settings(Provider::Aws).unwrap();
    assert!(s.credentials.is_none());
    assert_eq!(s.region, "us-east-1");
}

#[test]
fn test_oci_settings_require_section() {
    let config = AppConfig::load_from_str(VALID_CONFIG).unwrap();
    let err = config.provider_settings(Provider::Oci).unwrap_err();
    assert!(matches!(
        err,
        RecorderError::ConfigurationMissing {
            provider: Provider::Oci,
            field: "oci"
        }
    ));
}

#[test]
fn test_oci_settings_require_namespace() {
    let with_oci = format!("{VALID_CONFIG}\n[oci]\nbucket = \"media\"\n");
    let config = AppConfig::load_from_str(&with_oci).unwrap();
    let err = config.provider_settings(Provider::Oci).unwrap_err();
    assert!(matches!(
        err,
        RecorderError::ConfigurationMissing {
            field: "namespace",
            ..
        }
    ));
}

#[test]
fn test_oci_settings_fall_back_to_legacy_and_honor_endpoint_override() {
    let with_oci = format!(
        "{VALID_CONFIG}\n[oci]\nnamespace = \"tenancy\"\nendpoint = \"https://metrics.example.test\"\n"
    );
    let config = AppConfig::load_from_str(&with_oci).unwrap();
    let s = config.provider_settings(Provider::Oci).unwrap();
    assert_eq!(s.bucket, "legacy-bucket");
    assert_eq!(s.region, "us-west-2");
    assert_eq!(s.namespace, "oci_objectstorage/tenancy");
    assert_eq!(s.endpoint.as_deref(), Some("https://metrics.example.test"));
    assert_eq!(s.slug(), "oci.legacy-bucket.StandardStorage");
}
