//! Dependency graph resolution across build modules.
//!
//! Every unit of the root module is resolved for both dependency classes.
//! References to sibling modules (`project:` selectors) are expanded by
//! walking the referenced module's unit of the same name, restricted to its
//! `Api` class, and splicing the result into the referring unit.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::DependencyClass;
use crate::repository::ArtifactSource;
use crate::selector::DependencySelector;
use crate::snapshot::{DependencySnapshot, ResolvedArtifact, UnitSnapshot, UnresolvedDependency, UnresolvedReport};

/// 依存解決中の致命的なエラー。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("ルートモジュール '{0}' がワークスペースに存在しません")]
    UnknownRootModule(String),
    #[error("'{required_by}' が参照するモジュール '{name}' がワークスペースに存在しません")]
    UnknownModule { name: String, required_by: String },
    #[error("モジュール依存に循環が検出されました: {chain}")]
    Cycle { chain: String },
}

/// 独立してコンパイルされる単位。依存宣言と出力ディレクトリを持つ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildUnit {
    pub module: String,
    pub name: String,
    pub output_dir: PathBuf,
    pub dependencies: BTreeMap<DependencyClass, Vec<DependencySelector>>,
}

impl BuildUnit {
    pub fn new(module: impl Into<String>, name: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
            output_dir: output_dir.into(),
            dependencies: BTreeMap::new(),
        }
    }

    pub fn with_dependency(mut self, class: DependencyClass, selector: DependencySelector) -> Self {
        self.dependencies.entry(class).or_default().push(selector);
        self
    }

    pub fn selectors(&self, class: DependencyClass) -> &[DependencySelector] {
        self.dependencies
            .get(&class)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn label(&self) -> String {
        format!("{}:{}", self.module, self.name)
    }
}

/// ビルドユニットをまとめるモジュール。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildModule {
    pub name: String,
    pub dir: PathBuf,
    pub units: IndexMap<String, BuildUnit>,
}

impl BuildModule {
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            dir: dir.into(),
            units: IndexMap::new(),
        }
    }

    pub fn with_unit(mut self, unit: BuildUnit) -> Self {
        self.units.insert(unit.name.clone(), unit);
        self
    }
}

/// Explicit configuration handed to the resolver and the later stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub root: String,
    pub shared_unit: String,
    pub lock_dir: PathBuf,
    pub repositories: Vec<PathBuf>,
    pub modules: IndexMap<String, BuildModule>,
}

impl Workspace {
    pub fn module(&self, name: &str) -> Option<&BuildModule> {
        self.modules.get(name)
    }

    pub fn root_module(&self) -> Result<&BuildModule, ResolveError> {
        self.module(&self.root)
            .ok_or_else(|| ResolveError::UnknownRootModule(self.root.clone()))
    }
}

/// Output of a resolution pass: snapshot plus the parallel unresolved report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub snapshot: DependencySnapshot,
    pub unresolved: UnresolvedReport,
}

#[derive(Debug, Default)]
struct ClassResolution {
    artifacts: IndexMap<PathBuf, ResolvedArtifact>,
    unresolved: Vec<UnresolvedDependency>,
}

impl ClassResolution {
    fn push_artifact(&mut self, artifact: ResolvedArtifact) {
        self.artifacts.entry(artifact.file.clone()).or_insert(artifact);
    }

    fn splice(&mut self, other: ClassResolution) {
        for artifact in other.artifacts.into_values() {
            self.push_artifact(artifact);
        }
        self.unresolved.extend(other.unresolved);
    }
}

pub struct DependencyGraphResolver<'a> {
    workspace: &'a Workspace,
    source: &'a dyn ArtifactSource,
}

impl<'a> DependencyGraphResolver<'a> {
    pub fn new(workspace: &'a Workspace, source: &'a dyn ArtifactSource) -> Self {
        Self { workspace, source }
    }

    pub fn resolve(&self) -> Result<Resolution, ResolveError> {
        let root = self.workspace.root_module()?;
        let mut stack = vec![root.name.clone()];
        let mut resolution = Resolution::default();

        for unit in root.units.values() {
            let mut snapshot = UnitSnapshot::new(&unit.output_dir);
            let mut unresolved = BTreeMap::new();

            for class in DependencyClass::ALL {
                let resolved = self.resolve_class(root, unit, class, &mut stack)?;
                debug!(
                    unit = %unit.label(),
                    class = %class,
                    artifacts = resolved.artifacts.len(),
                    unresolved = resolved.unresolved.len(),
                    "resolved dependency class"
                );
                snapshot
                    .artifacts
                    .insert(class, resolved.artifacts.into_values().collect());
                unresolved.insert(class, resolved.unresolved);
            }

            resolution.snapshot.units.insert(unit.name.clone(), snapshot);
            resolution.unresolved.units.insert(unit.name.clone(), unresolved);
        }

        Ok(resolution)
    }

    fn resolve_class(
        &self,
        module: &BuildModule,
        unit: &BuildUnit,
        class: DependencyClass,
        stack: &mut Vec<String>,
    ) -> Result<ClassResolution, ResolveError> {
        let mut resolved = ClassResolution::default();

        for selector in unit.selectors(class) {
            match selector {
                DependencySelector::Project(name) => {
                    let referenced =
                        self.workspace
                            .module(name)
                            .ok_or_else(|| ResolveError::UnknownModule {
                                name: name.clone(),
                                required_by: unit.label(),
                            })?;
                    let spliced = self.resolve_module_api(referenced, &unit.name, stack)?;
                    resolved.splice(spliced);
                }
                DependencySelector::File(path) => {
                    let file = absolutize(&module.dir, path);
                    if file.exists() {
                        resolved.push_artifact(file_artifact(file));
                    } else {
                        warn!(unit = %unit.label(), path = %file.display(), "dependency file not found");
                        resolved.unresolved.push(UnresolvedDependency::new(
                            selector.to_string(),
                            format!("File not found: {}", file.display()),
                        ));
                    }
                }
                DependencySelector::Module(coordinates) => match self.source.locate(coordinates) {
                    Ok(file) => resolved.push_artifact(ResolvedArtifact::new(
                        coordinates.artifact_id.clone(),
                        coordinates.group_id.clone(),
                        coordinates.version.clone(),
                        file,
                    )),
                    Err(failure) => {
                        warn!(unit = %unit.label(), coordinates = %coordinates, "dependency could not be resolved");
                        resolved.unresolved.push(UnresolvedDependency::new(
                            selector.to_string(),
                            failure.to_string(),
                        ));
                    }
                },
            }
        }

        Ok(resolved)
    }

    /// Resolves the `Api` class of `module`'s unit named `unit_name`.
    fn resolve_module_api(
        &self,
        module: &BuildModule,
        unit_name: &str,
        stack: &mut Vec<String>,
    ) -> Result<ClassResolution, ResolveError> {
        if stack.iter().any(|entry| entry == &module.name) {
            let mut chain = stack.clone();
            chain.push(module.name.clone());
            return Err(ResolveError::Cycle {
                chain: chain.join(" -> "),
            });
        }

        let Some(unit) = module.units.get(unit_name) else {
            debug!(module = %module.name, unit = unit_name, "referenced module has no matching unit");
            return Ok(ClassResolution::default());
        };

        stack.push(module.name.clone());
        let result = self.resolve_class(module, unit, DependencyClass::Api, stack);
        stack.pop();
        result
    }
}

fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn file_artifact(file: PathBuf) -> ResolvedArtifact {
    let name = file
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    ResolvedArtifact::new(name, "", "", file)
}
