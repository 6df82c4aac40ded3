//! hoard.toml configuration parsing and serialization

use camino::{Utf8Path, Utf8PathBuf};
use hoard_core::error::HoardError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ConfigResult;

/// Complete hoard.toml configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HoardToml {
    /// Where blobs and records live
    #[serde(default)]
    pub storage: StorageSection,

    /// Dedup filter sizing
    #[serde(default)]
    pub dedup: DedupSection,

    /// File record retention and scanning
    #[serde(default)]
    pub records: RecordsSection,

    /// Staging-area archive
    #[serde(default)]
    pub archive: ArchiveSection,
}

/// Storage locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSection {
    /// Flat directory holding the blobs
    #[serde(default = "default_blob_dir")]
    pub blob_dir: Utf8PathBuf,

    /// Snapshot file of the record store (file backend only)
    #[serde(default = "default_records_path")]
    pub records_path: Utf8PathBuf,

    /// Dedup filter snapshot, kept apart from the records (file backend only)
    #[serde(default = "default_filter_path")]
    pub filter_path: Utf8PathBuf,
}

/// Counting bloom filter parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DedupSection {
    /// Number of distinct blobs the filter is sized for
    #[serde(default = "default_expected_items")]
    pub expected_items: u64,

    /// Target false-positive rate
    #[serde(default = "default_error_rate")]
    pub error_rate: f64,
}

/// Where file records are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecordsBackend {
    /// JSON snapshot at `storage.records_path`
    #[default]
    File,
    /// Process memory only
    Memory,
}

/// File record settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordsSection {
    #[serde(default)]
    pub backend: RecordsBackend,

    /// Days a record stays resolvable after upload
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,

    /// Keys examined per scan page
    #[serde(default = "default_scan_batch")]
    pub scan_batch: usize,
}

/// Staging-area archive settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveSection {
    /// Directory the archive adapter mirrors objects into
    #[serde(default = "default_archive_root")]
    pub root: Utf8PathBuf,
}

fn default_blob_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("hoard_storage/blobs")
}

fn default_records_path() -> Utf8PathBuf {
    Utf8PathBuf::from("hoard_storage/records.json")
}

fn default_filter_path() -> Utf8PathBuf {
    Utf8PathBuf::from("hoard_storage/filter.json")
}

fn default_expected_items() -> u64 {
    100_000
}

fn default_error_rate() -> f64 {
    0.01
}

fn default_retention_days() -> u64 {
    30
}

fn default_scan_batch() -> usize {
    100
}

fn default_archive_root() -> Utf8PathBuf {
    Utf8PathBuf::from("hoard_storage/archive")
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            blob_dir: default_blob_dir(),
            records_path: default_records_path(),
            filter_path: default_filter_path(),
        }
    }
}

impl Default for DedupSection {
    fn default() -> Self {
        Self {
            expected_items: default_expected_items(),
            error_rate: default_error_rate(),
        }
    }
}

impl Default for RecordsSection {
    fn default() -> Self {
        Self {
            backend: RecordsBackend::default(),
            retention_days: default_retention_days(),
            scan_batch: default_scan_batch(),
        }
    }
}

impl Default for ArchiveSection {
    fn default() -> Self {
        Self {
            root: default_archive_root(),
        }
    }
}

impl RecordsSection {
    /// Retention as a duration
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_days.saturating_mul(24 * 60 * 60))
    }
}

impl HoardToml {
    /// Make every relative path absolute against `base`
    pub fn resolve_paths(&mut self, base: &Utf8Path) {
        for path in [
            &mut self.storage.blob_dir,
            &mut self.storage.records_path,
            &mut self.storage.filter_path,
            &mut self.archive.root,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

/// Parse TOML string to HoardToml configuration
pub fn parse_hoard_toml(content: &str) -> ConfigResult<HoardToml> {
    // toml_edit first for syntax errors with locations
    content
        .parse::<toml_edit::Document>()
        .map_err(|e| HoardError::TomlParse {
            message: format!("TOML syntax error: {}", e),
        })?;

    let config: HoardToml = toml::from_str(content).map_err(|e| HoardError::TomlParse {
        message: format!("TOML parsing error: {}", e),
    })?;

    validate_config(&config)?;

    Ok(config)
}

/// Serialize HoardToml to TOML string
pub fn serialize_hoard_toml(config: &HoardToml) -> ConfigResult<String> {
    toml::to_string_pretty(config).map_err(|e| HoardError::TomlParse {
        message: format!("TOML serialization error: {}", e),
    })
}

/// Validate configuration values
pub fn validate_config(config: &HoardToml) -> ConfigResult<()> {
    if config.dedup.expected_items == 0 {
        return Err(HoardError::ConfigValidation {
            field: "dedup.expected_items".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }

    let rate = config.dedup.error_rate;
    if !(rate > 0.0 && rate < 1.0) {
        return Err(HoardError::ConfigValidation {
            field: "dedup.error_rate".to_string(),
            reason: format!("{} is not between 0 and 1", rate),
        });
    }

    if config.records.retention_days == 0 {
        return Err(HoardError::ConfigValidation {
            field: "records.retention_days".to_string(),
            reason: "must be at least one day".to_string(),
        });
    }

    if config.records.scan_batch == 0 {
        return Err(HoardError::ConfigValidation {
            field: "records.scan_batch".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }

    if config.storage.blob_dir.as_str().is_empty() {
        return Err(HoardError::ConfigValidation {
            field: "storage.blob_dir".to_string(),
            reason: "must not be empty".to_string(),
        });
    }

    Ok(())
}

/// Load and parse hoard.toml from file path
pub async fn load_from_file(path: &Utf8Path) -> ConfigResult<HoardToml> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| HoardError::io(format!("Failed to read {}", path), e))?;

    parse_hoard_toml(&content).map_err(|e| match e {
        HoardError::TomlParse { message } => HoardError::TomlParse {
            message: format!("In file {}: {}", path, message),
        },
        HoardError::ConfigValidation { field, reason } => HoardError::ConfigValidation {
            field,
            reason: format!("{} (in {})", reason, path),
        },
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config = parse_hoard_toml("").unwrap();
        assert_eq!(config, HoardToml::default());
        assert_eq!(config.records.retention_days, 30);
        assert_eq!(config.records.retention(), Duration::from_secs(30 * 86_400));
        assert_eq!(config.records.backend, RecordsBackend::File);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[storage]
blob_dir = "/srv/hoard/blobs"
records_path = "/srv/hoard/records.json"
filter_path = "/srv/hoard/filter.json"

[dedup]
expected_items = 5000
error_rate = 0.001

[records]
backend = "memory"
retention_days = 7
scan_batch = 250

[archive]
root = "/srv/hoard/archive"
"#;

        let config = parse_hoard_toml(toml).unwrap();
        assert_eq!(config.storage.blob_dir, "/srv/hoard/blobs");
        assert_eq!(config.storage.filter_path, "/srv/hoard/filter.json");
        assert_eq!(config.dedup.expected_items, 5000);
        assert_eq!(config.dedup.error_rate, 0.001);
        assert_eq!(config.records.backend, RecordsBackend::Memory);
        assert_eq!(config.records.retention_days, 7);
        assert_eq!(config.records.scan_batch, 250);
        assert_eq!(config.archive.root, "/srv/hoard/archive");
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let toml = r#"
[dedup]
expected_items = 10
"#;
        let config = parse_hoard_toml(toml).unwrap();
        assert_eq!(config.dedup.expected_items, 10);
        assert_eq!(config.dedup.error_rate, 0.01);
        assert_eq!(config.records, RecordsSection::default());
    }

    #[test]
    fn test_syntax_error() {
        let err = parse_hoard_toml("[dedup\nerror_rate = 0.1").unwrap_err();
        assert!(matches!(err, HoardError::TomlParse { .. }));
    }

    #[test]
    fn test_invalid_values() {
        for toml in [
            "[dedup]\nexpected_items = 0",
            "[dedup]\nerror_rate = 1.5",
            "[dedup]\nerror_rate = 0.0",
            "[records]\nretention_days = 0",
            "[records]\nscan_batch = 0",
            "[records]\nbackend = \"redis\"",
        ] {
            assert!(parse_hoard_toml(toml).is_err(), "accepted: {}", toml);
        }
    }

    #[test]
    fn test_round_trip_serialization() {
        let mut config = HoardToml::default();
        config.dedup.error_rate = 0.05;
        config.records.backend = RecordsBackend::Memory;

        let serialized = serialize_hoard_toml(&config).unwrap();
        let reparsed = parse_hoard_toml(&serialized).unwrap();
        assert_eq!(config, reparsed);
    }

    #[test]
    fn test_load_from_file_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("hoard.toml")).unwrap();
        std::fs::write(&path, "[dedup]\nerror_rate = 3.0\n").unwrap();

        let err = tokio_test::block_on(load_from_file(&path)).unwrap_err();
        match err {
            HoardError::ConfigValidation { field, reason } => {
                assert_eq!(field, "dedup.error_rate");
                assert!(reason.contains(path.as_str()));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let missing = tokio_test::block_on(load_from_file(&path.with_file_name("absent.toml")));
        assert!(matches!(missing, Err(HoardError::Io { .. })));
    }

    #[test]
    fn test_resolve_paths() {
        let mut config = HoardToml::default();
        config.archive.root = Utf8PathBuf::from("/abs/archive");
        config.resolve_paths(Utf8Path::new("/srv/app"));

        assert_eq!(config.storage.blob_dir, "/srv/app/hoard_storage/blobs");
        assert_eq!(config.storage.records_path, "/srv/app/hoard_storage/records.json");
        assert_eq!(config.storage.filter_path, "/srv/app/hoard_storage/filter.json");
        assert_eq!(config.archive.root, "/abs/archive");
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Valid filter parameters survive a serialize/parse cycle.
        #[test]
        fn dedup_params_round_trip(items in 1u64..10_000_000, rate in 0.0001f64..0.5) {
            let mut config = HoardToml::default();
            config.dedup.expected_items = items;
            config.dedup.error_rate = rate;

            let reparsed = parse_hoard_toml(&serialize_hoard_toml(&config).unwrap()).unwrap();
            prop_assert_eq!(reparsed.dedup, config.dedup);
        }
    }
}
