//! Merging of stub files that collide between the shared tree and the
//! platform-specific trees.
//!
//! When `pkg/__init__.pyi` exists in both the shared unit's output and a
//! specific unit's output, the shared file becomes `pkg/_pkg.pyi`, the
//! specific one `pkg/_pkg_<identity>.pyi`, and the shared `__init__.pyi` is
//! rewritten to re-export both.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::stub::INIT_FILE_NAME;

/// Leaf name used for stubs in the default package.
const ROOT_LEAF: &str = "root";

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("shared stub tree {0} does not exist")]
    MissingSharedTree(PathBuf),
    #[error("IO error while reconciling {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to walk stub tree {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Relative file paths of one unit's output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubTree {
    pub identity: String,
    pub root: PathBuf,
    pub files: BTreeSet<PathBuf>,
}

impl StubTree {
    pub fn new(identity: impl Into<String>, root: impl Into<PathBuf>, files: BTreeSet<PathBuf>) -> Self {
        Self {
            identity: identity.into(),
            root: root.into(),
            files,
        }
    }

    /// Walks `root` and records every file relative to it. A missing root
    /// yields an empty tree.
    pub fn collect(identity: impl Into<String>, root: impl Into<PathBuf>) -> Result<Self, ReconcileError> {
        let root = root.into();
        let mut files = BTreeSet::new();
        if root.is_dir() {
            for entry in WalkDir::new(&root) {
                let entry = entry.map_err(|source| ReconcileError::Walk {
                    path: root.clone(),
                    source,
                })?;
                if !entry.file_type().is_file() {
                    continue;
                }
                if let Ok(relative) = entry.path().strip_prefix(&root) {
                    files.insert(relative.to_path_buf());
                }
            }
        }
        Ok(Self::new(identity, root, files))
    }

    /// `androidMain` -> `android`.
    pub fn identity_for_unit(unit: &str) -> String {
        match unit.strip_suffix("Main") {
            Some(stripped) if !stripped.is_empty() => stripped.to_string(),
            _ => unit.to_string(),
        }
    }
}

/// One colliding declaration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollisionRecord {
    pub shared_dir: PathBuf,
    pub specific_dir: PathBuf,
    pub leaf: String,
    pub identity: String,
}

impl CollisionRecord {
    pub fn shared_renamed(&self) -> PathBuf {
        self.shared_dir.join(format!("_{}.pyi", self.leaf))
    }

    pub fn specific_renamed(&self) -> PathBuf {
        self.specific_dir
            .join(format!("_{}_{}.pyi", self.leaf, self.identity))
    }
}

pub struct CollisionReconciler {
    shared: StubTree,
    specifics: Vec<StubTree>,
}

impl CollisionReconciler {
    pub fn new(shared: StubTree, specifics: Vec<StubTree>) -> Self {
        Self { shared, specifics }
    }

    /// Collects the shared tree and every specific tree from disk.
    pub fn from_dirs(
        shared: (&str, &Path),
        specifics: &[(&str, &Path)],
    ) -> Result<Self, ReconcileError> {
        let (shared_identity, shared_root) = shared;
        if !shared_root.is_dir() {
            return Err(ReconcileError::MissingSharedTree(shared_root.to_path_buf()));
        }
        let shared = StubTree::collect(shared_identity, shared_root)?;
        let specifics = specifics
            .iter()
            .map(|(identity, root)| StubTree::collect(*identity, *root))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(shared, specifics))
    }

    /// Declaration files present at the same relative path in the shared tree
    /// and a specific tree. Does not touch the file system.
    pub fn find_collisions(&self) -> Vec<CollisionRecord> {
        let mut collisions = Vec::new();
        for specific in &self.specifics {
            for relative in self.shared.files.intersection(&specific.files) {
                if relative.file_name().and_then(|name| name.to_str()) != Some(INIT_FILE_NAME) {
                    continue;
                }
                let package = relative
                    .parent()
                    .filter(|parent| !parent.as_os_str().is_empty());
                let leaf = package
                    .and_then(Path::file_name)
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| ROOT_LEAF.to_string());
                let within = |root: &Path| match package {
                    Some(package) => root.join(package),
                    None => root.to_path_buf(),
                };

                collisions.push(CollisionRecord {
                    shared_dir: within(&self.shared.root),
                    specific_dir: within(&specific.root),
                    leaf,
                    identity: specific.identity.clone(),
                });
            }
        }
        collisions
    }

    /// Renames colliding files and rewrites the shared aggregators.
    pub fn apply(&self) -> Result<Vec<CollisionRecord>, ReconcileError> {
        let collisions = self.find_collisions();

        let mut by_shared_dir: BTreeMap<&Path, Vec<&CollisionRecord>> = BTreeMap::new();
        for collision in &collisions {
            by_shared_dir
                .entry(collision.shared_dir.as_path())
                .or_default()
                .push(collision);
        }

        for (shared_dir, group) in by_shared_dir {
            let init = shared_dir.join(INIT_FILE_NAME);
            let Some(first) = group.first() else {
                continue;
            };

            rename(&init, &first.shared_renamed())?;
            let mut aggregator = format!("from ._{} import *\n", first.leaf);
            for collision in &group {
                rename(
                    &collision.specific_dir.join(INIT_FILE_NAME),
                    &collision.specific_renamed(),
                )?;
                aggregator.push_str(&format!(
                    "from ._{}_{} import *\n",
                    collision.leaf, collision.identity
                ));
                debug!(
                    shared = %collision.shared_dir.display(),
                    specific = %collision.specific_dir.display(),
                    identity = %collision.identity,
                    "reconciled colliding stub"
                );
            }

            fs::write(&init, aggregator).map_err(|source| ReconcileError::Io {
                path: init.clone(),
                source,
            })?;
        }

        if !collisions.is_empty() {
            info!(collisions = collisions.len(), "reconciled stub collisions");
        }
        Ok(collisions)
    }
}

fn rename(from: &Path, to: &Path) -> Result<(), ReconcileError> {
    fs::rename(from, to).map_err(|source| ReconcileError::Io {
        path: from.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn tree(identity: &str, root: &str, files: &[&str]) -> StubTree {
        StubTree::new(
            identity,
            root,
            files.iter().map(PathBuf::from).collect(),
        )
    }

    #[test]
    fn identity_strips_main_suffix() {
        assert_eq!(StubTree::identity_for_unit("androidMain"), "android");
        assert_eq!(StubTree::identity_for_unit("desktop"), "desktop");
        assert_eq!(StubTree::identity_for_unit("Main"), "Main");
    }

    #[test]
    fn collisions_are_the_intersection_of_declaration_files() {
        let reconciler = CollisionReconciler::new(
            tree("common", "/out/common", &["ui/__init__.pyi", "core/__init__.pyi", "__init__.pyi", "ui/notes.txt"]),
            vec![
                tree("android", "/out/android", &["ui/__init__.pyi", "__init__.pyi", "ui/notes.txt"]),
                tree("desktop", "/out/desktop", &["net/__init__.pyi"]),
            ],
        );

        let collisions = reconciler.find_collisions();
        assert_eq!(
            collisions,
            vec![
                CollisionRecord {
                    shared_dir: PathBuf::from("/out/common"),
                    specific_dir: PathBuf::from("/out/android"),
                    leaf: "root".to_string(),
                    identity: "android".to_string(),
                },
                CollisionRecord {
                    shared_dir: PathBuf::from("/out/common/ui"),
                    specific_dir: PathBuf::from("/out/android/ui"),
                    leaf: "ui".to_string(),
                    identity: "android".to_string(),
                },
            ]
        );
    }

    #[test]
    fn missing_shared_tree_fails() {
        let temp = tempdir().unwrap();
        let missing = temp.path().join("absent");
        let error = CollisionReconciler::from_dirs(("common", missing.as_path()), &[])
            .err()
            .unwrap();
        assert!(matches!(error, ReconcileError::MissingSharedTree(path) if path == missing));
    }

    #[test]
    fn every_colliding_specific_gets_an_import_line() {
        let temp = tempdir().unwrap();
        let common = temp.path().join("common");
        let android = temp.path().join("android");
        let desktop = temp.path().join("desktop");
        for (root, body) in [(&common, "class A: ..."), (&android, "class B: ..."), (&desktop, "class C: ...")] {
            fs::create_dir_all(root.join("pkg")).unwrap();
            fs::write(root.join("pkg").join(INIT_FILE_NAME), body).unwrap();
        }

        let reconciler = CollisionReconciler::from_dirs(
            ("common", common.as_path()),
            &[("android", android.as_path()), ("desktop", desktop.as_path())],
        )
        .unwrap();
        let collisions = reconciler.apply().unwrap();
        assert_eq!(collisions.len(), 2);

        assert_eq!(
            fs::read_to_string(common.join("pkg").join(INIT_FILE_NAME)).unwrap(),
            "from ._pkg import *\nfrom ._pkg_android import *\nfrom ._pkg_desktop import *\n"
        );
        assert_eq!(fs::read_to_string(common.join("pkg/_pkg.pyi")).unwrap(), "class A: ...");
        assert_eq!(
            fs::read_to_string(android.join("pkg/_pkg_android.pyi")).unwrap(),
            "class B: ..."
        );
        assert_eq!(
            fs::read_to_string(desktop.join("pkg/_pkg_desktop.pyi")).unwrap(),
            "class C: ..."
        );
        assert!(!android.join("pkg").join(INIT_FILE_NAME).exists());
    }
}
