use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::DependencyClass;

/// 解決済みアーティファクト。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResolvedArtifact {
    pub name: String,
    pub group: String,
    pub version: String,
    pub file: PathBuf,
}

impl ResolvedArtifact {
    pub fn new(
        name: impl Into<String>,
        group: impl Into<String>,
        version: impl Into<String>,
        file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            group: group.into(),
            version: version.into(),
            file: file.into(),
        }
    }
}

/// 解決できなかった依存。診断用に保持するだけで、解決処理は継続する。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnresolvedDependency {
    pub selector: String,
    pub message: String,
}

impl UnresolvedDependency {
    pub fn new(selector: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            message: message.into(),
        }
    }
}

/// ビルドユニット一件分のスナップショット。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct UnitSnapshot {
    pub directory: PathBuf,
    #[serde(default)]
    pub artifacts: BTreeMap<DependencyClass, Vec<ResolvedArtifact>>,
}

impl UnitSnapshot {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            artifacts: BTreeMap::new(),
        }
    }

    pub fn artifacts_of(&self, class: DependencyClass) -> &[ResolvedArtifact] {
        self.artifacts
            .get(&class)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// スタブ生成の入力順（`Implementation` の後に `Api`）で全アーティファクトを返す。
    pub fn generation_inputs(&self) -> Vec<&ResolvedArtifact> {
        DependencyClass::ALL
            .iter()
            .flat_map(|class| self.artifacts_of(*class))
            .collect()
    }

    fn canonicalize(&mut self) {
        for artifacts in self.artifacts.values_mut() {
            artifacts.sort_by(|left, right| {
                left.file
                    .cmp(&right.file)
                    .then_with(|| left.name.cmp(&right.name))
                    .then_with(|| left.group.cmp(&right.group))
                    .then_with(|| left.version.cmp(&right.version))
            });
        }
    }
}

/// ユニット名をキーにした依存解決結果。ロックファイルの永続化形式でもある。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct DependencySnapshot {
    pub units: BTreeMap<String, UnitSnapshot>,
}

impl DependencySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unit(&self, name: &str) -> Option<&UnitSnapshot> {
        self.units.get(name)
    }

    /// アーティファクト順序に依存しない正規形を返す。
    pub fn canonical(&self) -> DependencySnapshot {
        let mut canonical = self.clone();
        for unit in canonical.units.values_mut() {
            unit.canonicalize();
        }
        canonical
    }
}

/// スナップショットと同じキー構造で未解決依存を保持する。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct UnresolvedReport {
    pub units: BTreeMap<String, BTreeMap<DependencyClass, Vec<UnresolvedDependency>>>,
}

impl UnresolvedReport {
    pub fn of(&self, unit: &str, class: DependencyClass) -> &[UnresolvedDependency] {
        self.units
            .get(unit)
            .and_then(|classes| classes.get(&class))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.units
            .values()
            .all(|classes| classes.values().all(Vec::is_empty))
    }

    pub fn total(&self) -> usize {
        self.units
            .values()
            .flat_map(|classes| classes.values())
            .map(Vec::len)
            .sum()
    }
}
