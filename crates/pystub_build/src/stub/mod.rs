//! Python interface stub generation.
//!
//! Every visible top-level class becomes a `class` block in the
//! `__init__.pyi` of its package directory. Nested classes declared through
//! `InnerClasses` are rendered inside their enclosing block.

mod file;

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use thiserror::Error;
use tracing::{debug, info};

use crate::descriptor::annotation_type;
use crate::metadata::{ClassRecord, ClassTable, FieldRecord, MethodRecord};

pub use file::StubFile;

/// Declaration file name used for every package directory.
pub const INIT_FILE_NAME: &str = "__init__.pyi";

const INDENT: &str = "    ";
const INSTANCE_MARKER: &str = "INSTANCE";
const COMPANION_MARKER: &str = "Companion";

#[derive(Debug, Error)]
pub enum StubError {
    #[error("IO error while writing stubs to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SynthesisSummary {
    pub classes: usize,
    pub files: usize,
}

pub struct StubSynthesizer {
    output_dir: PathBuf,
}

impl StubSynthesizer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Clears the output directory and writes one stub file per package.
    pub fn synthesize(&self, table: &ClassTable) -> Result<SynthesisSummary, StubError> {
        self.reset_output_dir()?;

        let mut files: BTreeMap<PathBuf, StubFile> = BTreeMap::new();
        let mut classes = 0;
        for record in table.top_level() {
            let path = self.stub_path(record);
            let block = render_class(record, table, 0);
            files
                .entry(path.clone())
                .or_insert_with(|| StubFile::new(path))
                .push_block(block);
            classes += 1;
        }

        let summary = SynthesisSummary {
            classes,
            files: files.len(),
        };
        for file in files.into_values() {
            let path = file.flush()?;
            debug!(path = %path.display(), "wrote stub file");
        }

        info!(
            output = %self.output_dir.display(),
            classes = summary.classes,
            files = summary.files,
            "synthesized stubs"
        );
        Ok(summary)
    }

    fn reset_output_dir(&self) -> Result<(), StubError> {
        if self.output_dir.exists() {
            fs::remove_dir_all(&self.output_dir).map_err(|source| StubError::Io {
                path: self.output_dir.clone(),
                source,
            })?;
        }
        fs::create_dir_all(&self.output_dir).map_err(|source| StubError::Io {
            path: self.output_dir.clone(),
            source,
        })
    }

    fn stub_path(&self, record: &ClassRecord) -> PathBuf {
        let mut path = self.output_dir.clone();
        let package = record.package_path();
        if !package.is_empty() {
            path.extend(package.split('/'));
        }
        path.join(INIT_FILE_NAME)
    }
}

/// Renders the block for `record` at nesting `depth`.
fn render_class(record: &ClassRecord, table: &ClassTable, depth: usize) -> Vec<String> {
    let indent = INDENT.repeat(depth);
    let body_indent = INDENT.repeat(depth + 1);
    let binary_simple = record.binary_simple_name();
    // `Outer.Inner` for nested blocks, used for the singleton annotation
    let display_name = binary_simple.replace('$', ".");
    let simple = binary_simple.rsplit('$').next().unwrap_or(binary_simple);
    let owner = record.dotted_name();

    let mut lines = vec![format!("{indent}class {simple}:")];
    let mut body = Vec::new();

    let mut instance_written = false;
    for field in record.fields.iter().filter(|field| is_visible_field(field)) {
        if field.name.contains(INSTANCE_MARKER) {
            if !instance_written {
                body.push(format!("{body_indent}{INSTANCE_MARKER}: {display_name}"));
                instance_written = true;
            }
            continue;
        }
        let annotation = annotation_type(&field.descriptor, &owner);
        body.push(format!("{body_indent}{}: {annotation}", field.name));
    }

    for name in method_groups(&record.methods) {
        body.push(format!("{body_indent}def {name}(self, *args, **kwargs): ..."));
    }

    for child in nested_children(record, table) {
        if !body.is_empty() {
            body.push(String::new());
        }
        body.extend(render_class(child, table, depth + 1));
    }

    if body.is_empty() {
        body.push(format!("{body_indent}..."));
    }
    lines.extend(body);
    lines
}

fn is_visible_field(field: &FieldRecord) -> bool {
    field.access.is_visible()
        && !field.name.starts_with('$')
        && !field.name.starts_with(COMPANION_MARKER)
}

/// Distinct method base names in first-seen order. Overload-mangling
/// suffixes are cut at the first `$` or `-`.
fn method_groups(methods: &[MethodRecord]) -> IndexSet<&str> {
    methods
        .iter()
        .filter(|method| method.access.is_visible() && !method.name.starts_with('<'))
        .filter_map(|method| {
            let base = method.name.split(['$', '-']).next().unwrap_or_default();
            (!base.is_empty()).then_some(base)
        })
        .collect()
}

/// Direct nested classes of `record` that are present in `table`, in
/// `InnerClasses` order. Anonymous classes (integer names) are dropped.
///
/// Member entries name their outer class and simple name; entries without
/// an outer class fall back to the `<record>$<Simple>` naming convention.
fn nested_children<'t>(record: &ClassRecord, table: &'t ClassTable) -> Vec<&'t ClassRecord> {
    let prefix = format!("{}$", record.name);
    let mut seen = IndexSet::new();
    for entry in &record.nested {
        let simple = match (&entry.outer, &entry.simple_name) {
            (Some(outer), Some(simple)) if *outer == record.name => simple.as_str(),
            // member of some other class
            (Some(_), _) => continue,
            (None, _) => match entry.name.strip_prefix(&prefix) {
                Some(simple) => simple,
                None => continue,
            },
        };
        if simple.is_empty() || simple.contains('$') || simple.parse::<u64>().is_ok() {
            continue;
        }
        seen.insert(entry.name.as_str());
    }

    seen.into_iter()
        .filter_map(|name| table.get(name))
        .collect()
}
