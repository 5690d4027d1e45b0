//! Filesystem-backed model registry.
//!
//! Each registered model lives under `<root>/<name>/` with a `registry.json`
//! index and one `v<N>/` directory per version holding its artifact files.
//! Aliases are movable pointers from a name (`Challenger`, `Champion`) to a
//! version.

use crate::domain::errors::RegistryError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const ALIAS_CHALLENGER: &str = "Challenger";
pub const ALIAS_CHAMPION: &str = "Champion";

const INDEX_FILE: &str = "registry.json";

/// Lifecycle status of a registered version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModelStatus {
    Ready,
}

impl ModelStatus {
    pub fn is_ready(self) -> bool {
        matches!(self, ModelStatus::Ready)
    }
}

impl fmt::Display for ModelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelStatus::Ready => write!(f, "READY"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelVersion {
    pub version: u32,
    pub run_name: String,
    pub status: ModelStatus,
    pub created_at: DateTime<Utc>,
    pub artifacts: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ModelIndex {
    versions: Vec<ModelVersion>,
    aliases: BTreeMap<String, u32>,
}

pub struct ModelRegistry {
    root: PathBuf,
}

impl ModelRegistry {
    /// Opens a registry rooted at `root`, creating the directory if absent.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn model_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Directory holding the artifact files of one version.
    pub fn version_dir(&self, name: &str, version: u32) -> PathBuf {
        self.model_dir(name).join(format!("v{version}"))
    }

    fn load_index(&self, name: &str) -> Result<ModelIndex, RegistryError> {
        let path = self.model_dir(name).join(INDEX_FILE);
        if !path.exists() {
            return Err(RegistryError::ModelNotFound {
                name: name.to_string(),
            });
        }
        let data = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&data)?)
    }

    fn store_index(&self, name: &str, index: &ModelIndex) -> Result<(), RegistryError> {
        let dir = self.model_dir(name);
        fs::create_dir_all(&dir)?;
        let data = serde_json::to_string_pretty(index)?;
        fs::write(dir.join(INDEX_FILE), data)?;
        Ok(())
    }

    /// Registers a new version of `name` by copying the given artifact files
    /// into the registry. Returns the new version number; the version is
    /// READY once registered.
    pub fn log_model(
        &self,
        name: &str,
        run_name: &str,
        artifacts: &[(&str, &Path)],
    ) -> Result<u32, RegistryError> {
        let mut index = match self.load_index(name) {
            Ok(index) => index,
            Err(RegistryError::ModelNotFound { .. }) => ModelIndex::default(),
            Err(e) => return Err(e),
        };

        let version = index.versions.last().map_or(1, |v| v.version + 1);
        let dir = self.version_dir(name, version);
        fs::create_dir_all(&dir)?;

        let mut names = Vec::with_capacity(artifacts.len());
        for (file_name, source) in artifacts {
            if !source.exists() {
                return Err(RegistryError::ArtifactMissing {
                    path: source.display().to_string(),
                });
            }
            fs::copy(source, dir.join(file_name))?;
            names.push((*file_name).to_string());
        }

        index.versions.push(ModelVersion {
            version,
            run_name: run_name.to_string(),
            status: ModelStatus::Ready,
            created_at: Utc::now(),
            artifacts: names,
        });
        self.store_index(name, &index)?;

        info!("Registered {} version {} (run '{}')", name, version, run_name);
        Ok(version)
    }

    /// Points `alias` at an existing version of `name`.
    pub fn set_alias(&self, name: &str, alias: &str, version: u32) -> Result<(), RegistryError> {
        let mut index = self.load_index(name)?;
        if !index.versions.iter().any(|v| v.version == version) {
            return Err(RegistryError::VersionNotFound {
                name: name.to_string(),
                version,
            });
        }
        index.aliases.insert(alias.to_string(), version);
        self.store_index(name, &index)?;
        info!("Alias '{}' of {} now points at version {}", alias, name, version);
        Ok(())
    }

    pub fn version_by_alias(&self, name: &str, alias: &str) -> Result<ModelVersion, RegistryError> {
        let index = self.load_index(name)?;
        let version = *index
            .aliases
            .get(alias)
            .ok_or_else(|| RegistryError::AliasNotFound {
                name: name.to_string(),
                alias: alias.to_string(),
            })?;
        index
            .versions
            .into_iter()
            .find(|v| v.version == version)
            .ok_or(RegistryError::VersionNotFound {
                name: name.to_string(),
                version,
            })
    }

    pub fn status_by_alias(&self, name: &str, alias: &str) -> Result<ModelStatus, RegistryError> {
        Ok(self.version_by_alias(name, alias)?.status)
    }

    /// Path of one artifact file inside a version directory.
    pub fn artifact_path(
        &self,
        name: &str,
        version: u32,
        file_name: &str,
    ) -> Result<PathBuf, RegistryError> {
        let path = self.version_dir(name, version).join(file_name);
        if !path.exists() {
            return Err(RegistryError::ArtifactMissing {
                path: path.display().to_string(),
            });
        }
        Ok(path)
    }

    /// Copies every artifact of a version into `dst` (the scratch directory
    /// used while assembling composite bundles). Returns the copied paths.
    pub fn download_artifacts(
        &self,
        name: &str,
        version: u32,
        dst: &Path,
    ) -> Result<Vec<PathBuf>, RegistryError> {
        let index = self.load_index(name)?;
        let entry = index
            .versions
            .iter()
            .find(|v| v.version == version)
            .ok_or(RegistryError::VersionNotFound {
                name: name.to_string(),
                version,
            })?;

        fs::create_dir_all(dst)?;
        let mut copied = Vec::with_capacity(entry.artifacts.len());
        for file_name in &entry.artifacts {
            let source = self.artifact_path(name, version, file_name)?;
            let target = dst.join(file_name);
            fs::copy(&source, &target)?;
            copied.push(target);
        }
        Ok(copied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_registry(tag: &str) -> ModelRegistry {
        let root = std::env::temp_dir().join(format!("registry_test_{}_{tag}", std::process::id()));
        fs::remove_dir_all(&root).ok();
        ModelRegistry::open(root).unwrap()
    }

    fn write_artifact(tag: &str, name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("artifact_{}_{tag}_{name}", std::process::id()));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn versions_increment_and_report_ready() {
        let registry = scratch_registry("versions");
        let artifact = write_artifact("versions", "model.json", "{}");

        let v1 = registry
            .log_model("TestModel", "run_1", &[("model.json", artifact.as_path())])
            .unwrap();
        let v2 = registry
            .log_model("TestModel", "run_2", &[("model.json", artifact.as_path())])
            .unwrap();

        assert_eq!(v1, 1);
        assert_eq!(v2, 2);

        registry.set_alias("TestModel", ALIAS_CHALLENGER, v2).unwrap();
        let status = registry
            .status_by_alias("TestModel", ALIAS_CHALLENGER)
            .unwrap();
        assert!(status.is_ready());
        assert_eq!(status.to_string(), "READY");
    }

    #[test]
    fn alias_moves_between_versions() {
        let registry = scratch_registry("alias");
        let artifact = write_artifact("alias", "model.json", "{}");

        let v1 = registry
            .log_model("TestModel", "run_1", &[("model.json", artifact.as_path())])
            .unwrap();
        let v2 = registry
            .log_model("TestModel", "run_2", &[("model.json", artifact.as_path())])
            .unwrap();

        registry.set_alias("TestModel", ALIAS_CHAMPION, v1).unwrap();
        registry.set_alias("TestModel", ALIAS_CHAMPION, v2).unwrap();
        let resolved = registry.version_by_alias("TestModel", ALIAS_CHAMPION).unwrap();
        assert_eq!(resolved.version, v2);
        assert_eq!(resolved.run_name, "run_2");
    }

    #[test]
    fn unknown_lookups_fail_with_typed_errors() {
        let registry = scratch_registry("missing");
        assert!(matches!(
            registry.version_by_alias("NoSuchModel", ALIAS_CHAMPION),
            Err(RegistryError::ModelNotFound { .. })
        ));

        let artifact = write_artifact("missing", "model.json", "{}");
        registry
            .log_model("TestModel", "run_1", &[("model.json", artifact.as_path())])
            .unwrap();
        assert!(matches!(
            registry.version_by_alias("TestModel", ALIAS_CHAMPION),
            Err(RegistryError::AliasNotFound { .. })
        ));
        assert!(matches!(
            registry.set_alias("TestModel", ALIAS_CHAMPION, 9),
            Err(RegistryError::VersionNotFound { .. })
        ));
    }

    #[test]
    fn download_copies_all_artifacts() {
        let registry = scratch_registry("download");
        let a = write_artifact("download", "model.json", "{\"w\":1}");
        let b = write_artifact("download", "scaler_x.bin", "bounds");

        let version = registry
            .log_model(
                "TestModel",
                "run_1",
                &[("model.json", a.as_path()), ("scaler_x.bin", b.as_path())],
            )
            .unwrap();

        let dst = std::env::temp_dir().join(format!("download_dst_{}", std::process::id()));
        fs::remove_dir_all(&dst).ok();
        let copied = registry.download_artifacts("TestModel", version, &dst).unwrap();

        assert_eq!(copied.len(), 2);
        assert_eq!(fs::read_to_string(dst.join("model.json")).unwrap(), "{\"w\":1}");
        assert_eq!(fs::read_to_string(dst.join("scaler_x.bin")).unwrap(), "bounds");
    }
}
