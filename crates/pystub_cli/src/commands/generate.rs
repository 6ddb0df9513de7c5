use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use pystub_build::GenerationReport;
use pystub_deps::{ChangeGate, render_report};
use tracing::info;

use super::resolve_workspace;

/// Result of a `generate` invocation.
#[derive(Debug)]
pub enum GenerateOutcome {
    Skipped,
    Generated(GenerationReport),
}

pub fn run(config: &Path, skip_unchanged: bool, out: &mut dyn Write) -> Result<GenerateOutcome> {
    let (workspace, resolution) = resolve_workspace(config)?;
    write!(
        out,
        "{}",
        render_report(&resolution.snapshot, &resolution.unresolved)
    )?;

    let gate = ChangeGate::new(&workspace.lock_dir)
        .evaluate(&resolution.snapshot)
        .with_context(|| format!("failed to update lock in {}", workspace.lock_dir.display()))?;
    info!(changed = gate.changed, digest = %gate.digest, "dependency lock evaluated");

    if skip_unchanged && !gate.changed {
        writeln!(out, "\nDependencies unchanged; skipping stub generation.")?;
        return Ok(GenerateOutcome::Skipped);
    }

    write!(out, "\nAssembling meta package for source sets...")?;
    out.flush()?;
    let report = pystub_build::generate(&resolution.snapshot, &workspace.shared_unit)
        .context("stub generation failed")?;
    writeln!(out, " Done!")?;

    for unit in &report.units {
        writeln!(
            out,
            "  {}: {} classes in {} files ({})",
            unit.unit,
            unit.summary.classes,
            unit.summary.files,
            unit.directory.display()
        )?;
    }
    for collision in &report.collisions {
        writeln!(
            out,
            "  merged {} with {} variant",
            collision.shared_dir.display(),
            collision.identity
        )?;
    }

    Ok(GenerateOutcome::Generated(report))
}
