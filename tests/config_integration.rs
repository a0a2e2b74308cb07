//! Loading configuration files from disk.

use std::time::Duration;

use doi_transfer_core::config::{ConfigError, ProviderKind, StagingConfig};
use doi_transfer_core::resolver::build_provider_registry;
use doi_transfer_core::{Destination, StagingPipeline};
use tempfile::TempDir;

const FULL_CONFIG: &str = r#"
doi_resolver_url = "https://resolver.example.org/doi"
redirect_timeout_ms = 1500
connect_timeout_secs = 3
supported_destinations = ["s3", "dcache"]

[transfer]
url = "https://fts3.example.org:8446"
timeout_ms = 20000

[[providers]]
id = "zenodo"
kind = "zenodo"
name = "Zenodo"
timeout_ms = 2500

[[providers]]
id = "b2share-mirror"
kind = "b2share"
name = "B2Share mirror"
base_url = "https://b2share.mirror.example.org"
"#;

#[test]
fn test_load_full_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, FULL_CONFIG).unwrap();

    let config = StagingConfig::load(&path).unwrap();
    assert_eq!(config.doi_resolver_url.as_str(), "https://resolver.example.org/doi");
    assert_eq!(config.redirect_timeout(), Duration::from_millis(1500));
    assert_eq!(config.connect_timeout(), Duration::from_secs(3));
    assert!(config.supports(Destination::S3));
    assert!(!config.supports(Destination::Ftp));

    let transfer = config.transfer.as_ref().unwrap();
    assert_eq!(transfer.timeout(), Duration::from_secs(20));

    assert_eq!(config.providers.len(), 2);
    assert_eq!(config.providers[0].kind, ProviderKind::Zenodo);
    assert_eq!(config.providers[0].timeout(), Duration::from_millis(2500));
    assert_eq!(config.providers[1].timeout_ms, 5000);

    let registry = build_provider_registry(&config).unwrap();
    assert_eq!(registry.provider_ids(), vec!["zenodo", "b2share-mirror"]);

    let pipeline = StagingPipeline::from_config(&config).unwrap();
    assert!(format!("{pipeline:?}").contains("fts3.example.org"));
}

#[test]
fn test_load_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = StagingConfig::load(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn test_load_rejects_unknown_destination() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "supported_destinations = [\"tape\"]\n").unwrap();
    assert!(matches!(
        StagingConfig::load(&path).unwrap_err(),
        ConfigError::Parse(_)
    ));
}

#[test]
fn test_load_rejects_duplicate_provider_ids() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[[providers]]
id = "zenodo"
kind = "zenodo"
name = "Zenodo"

[[providers]]
id = "zenodo"
kind = "zenodo"
name = "Zenodo again"
"#,
    )
    .unwrap();
    let err = StagingConfig::load(&path).unwrap_err();
    assert!(err.to_string().contains("duplicate provider id"));
}
