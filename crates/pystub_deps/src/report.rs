use std::fmt::Write as _;

use crate::DependencyClass;
use crate::snapshot::{DependencySnapshot, UnresolvedReport};

/// 依存ツリーを人間向けのテキストに整形する。
pub fn render_report(snapshot: &DependencySnapshot, unresolved: &UnresolvedReport) -> String {
    let mut out = String::new();

    for (unit_name, unit) in &snapshot.units {
        let _ = writeln!(out, "Dependencies for source set: {unit_name}");
        let _ = writeln!(
            out,
            "  Meta package generation directory: {}",
            unit.directory.display()
        );

        for class in DependencyClass::ALL {
            let artifacts = unit.artifacts_of(class);
            let problems = unresolved.of(unit_name, class);

            let _ = writeln!(out, "  Configuration: {unit_name}{class}");
            let _ = writeln!(out, "    Resolved artifacts:{}", none_marker(artifacts.is_empty()));
            for artifact in artifacts {
                let _ = writeln!(out, "      {}", artifact.file.display());
            }

            let _ = writeln!(out, "    Unresolved dependencies:{}", none_marker(problems.is_empty()));
            for problem in problems {
                let _ = writeln!(out, "      {}", problem.selector);
                let _ = writeln!(out, "        - Problem: {}", indent_continuation(&problem.message));
            }
        }
    }

    out
}

fn none_marker(empty: bool) -> &'static str {
    if empty { " NONE" } else { "" }
}

fn indent_continuation(message: &str) -> String {
    message.lines().collect::<Vec<_>>().join("\n          ")
}
