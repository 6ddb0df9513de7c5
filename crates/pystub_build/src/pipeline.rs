use std::path::{Path, PathBuf};

use pystub_deps::DependencySnapshot;
use tracing::info;

use crate::BuildError;
use crate::metadata::ClassTableBuilder;
use crate::reconcile::{CollisionReconciler, CollisionRecord, StubTree};
use crate::stub::{StubSynthesizer, SynthesisSummary};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitReport {
    pub unit: String,
    pub directory: PathBuf,
    pub artifacts: usize,
    pub summary: SynthesisSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationReport {
    pub units: Vec<UnitReport>,
    pub collisions: Vec<CollisionRecord>,
}

/// Introspects every unit's artifacts, writes its stub tree and reconciles
/// the specific trees against `shared_unit`.
pub fn generate(snapshot: &DependencySnapshot, shared_unit: &str) -> Result<GenerationReport, BuildError> {
    let shared = snapshot
        .unit(shared_unit)
        .ok_or_else(|| BuildError::MissingSharedUnit(shared_unit.to_string()))?;

    let mut report = GenerationReport::default();
    for (name, unit) in &snapshot.units {
        let artifacts = unit.generation_inputs();
        let table = ClassTableBuilder::scan(artifacts.iter().copied()).map_err(|source| {
            BuildError::Introspect {
                unit: name.clone(),
                source,
            }
        })?;

        let summary = StubSynthesizer::new(&unit.directory)
            .synthesize(&table)
            .map_err(|source| BuildError::Stub {
                unit: name.clone(),
                source,
            })?;

        info!(
            unit = %name,
            artifacts = artifacts.len(),
            classes = table.len(),
            "generated unit stubs"
        );
        report.units.push(UnitReport {
            unit: name.clone(),
            directory: unit.directory.clone(),
            artifacts: artifacts.len(),
            summary,
        });
    }

    let specifics = snapshot
        .units
        .iter()
        .filter(|(name, _)| name.as_str() != shared_unit)
        .map(|(name, unit)| (StubTree::identity_for_unit(name), unit.directory.as_path()))
        .collect::<Vec<_>>();
    let specifics = specifics
        .iter()
        .map(|(identity, dir)| (identity.as_str(), *dir))
        .collect::<Vec<(&str, &Path)>>();

    let shared_identity = StubTree::identity_for_unit(shared_unit);
    let reconciler =
        CollisionReconciler::from_dirs((shared_identity.as_str(), shared.directory.as_path()), &specifics)?;
    report.collisions = reconciler.apply()?;

    Ok(report)
}
