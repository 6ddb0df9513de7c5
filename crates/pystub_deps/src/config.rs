//! `pystub.toml` ワークスペース設定。
//!
//! ```toml
//! [workspace]
//! root = "app"
//! shared-unit = "commonMain"
//!
//! [modules.app.units.commonMain]
//! api = ["project:pycomposeui"]
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::DependencyClass;
use crate::repository::LocalRepository;
use crate::resolver::{BuildModule, BuildUnit, Workspace};
use crate::selector::{DependencySelector, SelectorError};

const DEFAULT_SHARED_UNIT: &str = "commonMain";
const DEFAULT_LOCK_DIR: &str = "build/pystub";

/// 設定ファイルの読み込み・検証エラー。
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("設定ファイル {path:?} を読み込めません: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("設定ファイル {path:?} の解析に失敗しました: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("ルートモジュール '{0}' が [modules] に定義されていません")]
    UnknownRootModule(String),
    #[error("共有ユニット '{unit}' がルートモジュール '{module}' に定義されていません")]
    UnknownSharedUnit { unit: String, module: String },
    #[error("{module}:{unit} の依存宣言が不正です: {source}")]
    Selector {
        module: String,
        unit: String,
        #[source]
        source: SelectorError,
    },
    #[error("ホームディレクトリを特定できないため '{0}' を展開できません")]
    HomeDirectoryUnavailable(String),
}

/// `pystub.toml` 全体。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct WorkspaceConfig {
    pub workspace: WorkspaceSection,
    #[serde(default)]
    pub modules: IndexMap<String, ModuleConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct WorkspaceSection {
    pub root: String,
    #[serde(default = "default_shared_unit")]
    pub shared_unit: String,
    /// ルートモジュールのディレクトリからの相対パス。
    #[serde(default)]
    pub lock_dir: Option<String>,
    #[serde(default)]
    pub repositories: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct ModuleConfig {
    /// 省略時はモジュール名。
    #[serde(default)]
    pub dir: Option<String>,
    #[serde(default)]
    pub units: IndexMap<String, UnitConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct UnitConfig {
    #[serde(default)]
    pub api: Vec<String>,
    #[serde(default)]
    pub implementation: Vec<String>,
    /// モジュールディレクトリからの相対パス。
    #[serde(default)]
    pub output_dir: Option<String>,
}

fn default_shared_unit() -> String {
    DEFAULT_SHARED_UNIT.to_string()
}

impl WorkspaceConfig {
    /// 設定ファイルを読み込み、ファイルのあるディレクトリを基準に `Workspace` を構築する。
    pub fn load(path: impl AsRef<Path>) -> Result<Workspace, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let base = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        debug!(config = %path.display(), modules = config.modules.len(), "loaded workspace configuration");
        config.into_workspace(base)
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 検証済みの `Workspace` に変換する。相対パスは `base` を起点に解決する。
    pub fn into_workspace(self, base: &Path) -> Result<Workspace, ConfigError> {
        let WorkspaceConfig { workspace, modules } = self;

        let mut built = IndexMap::new();
        for (name, module) in modules {
            let dir = resolve_path(base, module.dir.as_deref().unwrap_or(&name))?;
            let mut build_module = BuildModule::new(name.clone(), dir.clone());

            for (unit_name, unit) in module.units {
                let output_dir = match unit.output_dir.as_deref() {
                    Some(raw) => resolve_path(&dir, raw)?,
                    None => dir
                        .join("src")
                        .join(&unit_name)
                        .join("generated")
                        .join("meta"),
                };

                let mut build_unit = BuildUnit::new(name.clone(), unit_name.clone(), output_dir);
                for (class, raw_selectors) in [
                    (DependencyClass::Implementation, &unit.implementation),
                    (DependencyClass::Api, &unit.api),
                ] {
                    for raw in raw_selectors {
                        let selector = raw.parse::<DependencySelector>().map_err(|source| {
                            ConfigError::Selector {
                                module: name.clone(),
                                unit: unit_name.clone(),
                                source,
                            }
                        })?;
                        build_unit = build_unit.with_dependency(class, selector);
                    }
                }
                build_module = build_module.with_unit(build_unit);
            }

            built.insert(name, build_module);
        }

        let root = built
            .get(&workspace.root)
            .ok_or_else(|| ConfigError::UnknownRootModule(workspace.root.clone()))?;
        if !root.units.contains_key(&workspace.shared_unit) {
            return Err(ConfigError::UnknownSharedUnit {
                unit: workspace.shared_unit.clone(),
                module: workspace.root.clone(),
            });
        }

        let lock_dir = resolve_path(
            &root.dir,
            workspace.lock_dir.as_deref().unwrap_or(DEFAULT_LOCK_DIR),
        )?;

        let repositories = if workspace.repositories.is_empty() {
            LocalRepository::default_roots()
        } else {
            workspace
                .repositories
                .iter()
                .map(|raw| resolve_path(base, raw))
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(Workspace {
            root: workspace.root,
            shared_unit: workspace.shared_unit,
            lock_dir,
            repositories,
            modules: built,
        })
    }
}

/// `~` を展開し、相対パスを `base` に連結する。
fn resolve_path(base: &Path, raw: &str) -> Result<PathBuf, ConfigError> {
    let expanded = if raw == "~" {
        dirs::home_dir().ok_or_else(|| ConfigError::HomeDirectoryUnavailable(raw.to_string()))?
    } else if let Some(rest) = raw.strip_prefix("~/") {
        dirs::home_dir()
            .ok_or_else(|| ConfigError::HomeDirectoryUnavailable(raw.to_string()))?
            .join(rest)
    } else {
        PathBuf::from(raw)
    };

    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        Ok(base.join(expanded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"
[workspace]
root = "app"
lock-dir = "build/meta"
repositories = ["/opt/m2"]

[modules.app]
dir = "app"

[modules.app.units.commonMain]
api = ["project:pycomposeui"]
implementation = ["org.example:widgets:1.0.0"]

[modules.app.units.androidMain]
implementation = ["file:libs/local.jar"]
output-dir = "generated/android"

[modules.pycomposeui.units.commonMain]
api = ["org.example:runtime:2.0"]
"#;

    #[test]
    fn builds_workspace_with_resolved_paths() {
        let workspace = WorkspaceConfig::parse(SAMPLE)
            .unwrap()
            .into_workspace(Path::new("/work"))
            .unwrap();

        assert_eq!(workspace.root, "app");
        assert_eq!(workspace.shared_unit, "commonMain");
        assert_eq!(workspace.lock_dir, PathBuf::from("/work/app/build/meta"));
        assert_eq!(workspace.repositories, vec![PathBuf::from("/opt/m2")]);

        let app = workspace.module("app").unwrap();
        let common = &app.units["commonMain"];
        assert_eq!(
            common.output_dir,
            PathBuf::from("/work/app/src/commonMain/generated/meta")
        );
        assert_eq!(
            common.selectors(DependencyClass::Api),
            &[DependencySelector::Project("pycomposeui".to_string())]
        );
        assert_eq!(common.selectors(DependencyClass::Implementation).len(), 1);

        let android = &app.units["androidMain"];
        assert_eq!(android.output_dir, PathBuf::from("/work/app/generated/android"));

        let library = workspace.module("pycomposeui").unwrap();
        assert_eq!(library.dir, PathBuf::from("/work/pycomposeui"));
    }

    #[test]
    fn unit_order_follows_the_file() {
        let workspace = WorkspaceConfig::parse(SAMPLE)
            .unwrap()
            .into_workspace(Path::new("/work"))
            .unwrap();
        let names = workspace.module("app").unwrap().units.keys().cloned().collect::<Vec<_>>();
        assert_eq!(names, vec!["commonMain", "androidMain"]);
    }

    #[test]
    fn missing_root_module_is_rejected() {
        let config = WorkspaceConfig::parse(
            r#"
[workspace]
root = "absent"
[modules.app.units.commonMain]
"#,
        )
        .unwrap();
        let error = config.into_workspace(Path::new("/work")).unwrap_err();
        assert!(matches!(error, ConfigError::UnknownRootModule(name) if name == "absent"));
    }

    #[test]
    fn missing_shared_unit_is_rejected() {
        let config = WorkspaceConfig::parse(
            r#"
[workspace]
root = "app"
shared-unit = "jvmMain"
[modules.app.units.commonMain]
"#,
        )
        .unwrap();
        let error = config.into_workspace(Path::new("/work")).unwrap_err();
        assert!(matches!(error, ConfigError::UnknownSharedUnit { .. }));
    }

    #[test]
    fn malformed_selector_names_its_unit() {
        let config = WorkspaceConfig::parse(
            r#"
[workspace]
root = "app"
[modules.app.units.commonMain]
implementation = ["org.example:broken"]
"#,
        )
        .unwrap();
        let error = config.into_workspace(Path::new("/work")).unwrap_err();
        match error {
            ConfigError::Selector { module, unit, .. } => {
                assert_eq!(module, "app");
                assert_eq!(unit, "commonMain");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn load_resolves_relative_to_config_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("pystub.toml");
        fs::write(&path, SAMPLE).unwrap();

        let workspace = WorkspaceConfig::load(&path).unwrap();
        assert_eq!(workspace.module("app").unwrap().dir, temp.path().join("app"));
    }

    #[test]
    fn load_reports_parse_errors_with_path() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("pystub.toml");
        fs::write(&path, "[workspace\nroot = ").unwrap();

        let error = WorkspaceConfig::load(&path).unwrap_err();
        assert!(matches!(error, ConfigError::Parse { path: reported, .. } if reported == path));
    }

    #[test]
    fn home_prefix_is_expanded() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        assert_eq!(
            resolve_path(Path::new("/work"), "~/.m2/repository").unwrap(),
            home.join(".m2/repository")
        );
    }
}
