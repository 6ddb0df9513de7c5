use std::path::Path;

use anyhow::{Context, Result};
use pystub_deps::{DependencyGraphResolver, LocalRepository, Resolution, Workspace, WorkspaceConfig};
use tracing::debug;

pub mod generate;
pub mod resolve;

/// Loads the workspace configuration and resolves every root unit.
pub(crate) fn resolve_workspace(config: &Path) -> Result<(Workspace, Resolution)> {
    let workspace = WorkspaceConfig::load(config)
        .with_context(|| format!("failed to load workspace configuration {}", config.display()))?;
    debug!(
        root = %workspace.root,
        modules = workspace.modules.len(),
        repositories = workspace.repositories.len(),
        "workspace loaded"
    );

    let repository = LocalRepository::new(workspace.repositories.iter().cloned());
    let resolution = DependencyGraphResolver::new(&workspace, &repository)
        .resolve()
        .context("dependency resolution failed")?;
    Ok((workspace, resolution))
}
