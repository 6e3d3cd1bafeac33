//! Temporary on-disk catalogs.
//!
//! Helpers for writing a catalog (and optionally a config file) into a
//! temp directory so loaders can be exercised against real files.

use std::path::PathBuf;

use tagtree_config::AppConfig;
use tagtree_core::Registry;
use tempfile::TempDir;

/// A test-scoped catalog file with an owned temp directory.
///
/// The temp directory is deleted automatically when this value is dropped,
/// guaranteeing cleanup even on panic.
pub struct TestCatalog {
    pub catalog_path: PathBuf,
    pub config_path: PathBuf,
    _temp_dir: TempDir,
}

impl TestCatalog {
    /// Write `json` to `registry.json` and a config pointing at it.
    pub async fn with_json(json: &str) -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let catalog_path = temp_dir.path().join("registry.json");
        let config_path = temp_dir.path().join("tagtree.toml");

        tokio::fs::write(&catalog_path, json)
            .await
            .expect("failed to write test catalog");

        let toml = format!(
            "[registry]\nsource = {:?}\n",
            catalog_path.display().to_string()
        );
        tokio::fs::write(&config_path, toml)
            .await
            .expect("failed to write test config");

        Self {
            catalog_path,
            config_path,
            _temp_dir: temp_dir,
        }
    }

    /// Write the standard model catalog.
    pub async fn model_catalog() -> Self {
        Self::with_json(crate::fixtures::MODEL_CATALOG).await
    }

    /// Load the config file written alongside the catalog.
    pub async fn config(&self) -> AppConfig {
        AppConfig::load(&self.config_path)
            .await
            .expect("failed to parse test config")
    }

    /// Load the catalog with default options.
    pub async fn registry(&self) -> Registry {
        Registry::from_path(&self.catalog_path)
            .await
            .expect("failed to load test catalog")
    }

    /// Overwrite the catalog file (for rebuild testing).
    pub async fn write_json(&self, json: &str) {
        tokio::fs::write(&self.catalog_path, json)
            .await
            .expect("failed to write updated catalog");
    }
}
