// pystub_deps - Build unit dependency resolution
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod config;
pub mod lock;
pub mod report;
pub mod repository;
pub mod resolver;
pub mod selector;
pub mod snapshot;

pub use config::{ConfigError, ModuleConfig, UnitConfig, WorkspaceConfig, WorkspaceSection};
pub use lock::{ChangeGate, GateOutcome, LOCK_FILE_NAME, LockError, NEW_FILE_NAME, snapshots_equivalent};
pub use report::render_report;
pub use repository::{ArtifactSource, LocalRepository, LookupFailure};
pub use resolver::{BuildModule, BuildUnit, DependencyGraphResolver, Resolution, ResolveError, Workspace};
pub use selector::{ArtifactCoordinates, DependencySelector, SelectorError};
pub use snapshot::{
    DependencySnapshot, ResolvedArtifact, UnitSnapshot, UnresolvedDependency, UnresolvedReport,
};

/// 依存の公開範囲。`Api` は推移的に公開され、`Implementation` はユニット内に閉じる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DependencyClass {
    Implementation,
    Api,
}

impl DependencyClass {
    pub const ALL: [DependencyClass; 2] = [DependencyClass::Implementation, DependencyClass::Api];

    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyClass::Implementation => "Implementation",
            DependencyClass::Api => "Api",
        }
    }
}

impl fmt::Display for DependencyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
