use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use pystub_deps::{DependencySnapshot, UnresolvedReport, render_report};
use serde::Serialize;

use super::resolve_workspace;

#[derive(Serialize)]
struct ResolveOutput<'a> {
    snapshot: &'a DependencySnapshot,
    unresolved: &'a UnresolvedReport,
}

pub fn run(config: &Path, json: bool, out: &mut dyn Write) -> Result<()> {
    let (_, resolution) = resolve_workspace(config)?;

    if json {
        let output = ResolveOutput {
            snapshot: &resolution.snapshot,
            unresolved: &resolution.unresolved,
        };
        let encoded = serde_json::to_string_pretty(&output).context("failed to encode resolution")?;
        writeln!(out, "{encoded}")?;
    } else {
        write!(
            out,
            "{}",
            render_report(&resolution.snapshot, &resolution.unresolved)
        )?;
    }
    Ok(())
}
