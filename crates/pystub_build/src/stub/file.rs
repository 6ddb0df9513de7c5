use std::fs;
use std::path::{Path, PathBuf};

use super::StubError;

/// A declaration file under construction. Blocks are separated by one blank line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubFile {
    path: PathBuf,
    lines: Vec<String>,
}

impl StubFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lines: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn push_block(&mut self, block: Vec<String>) {
        if !self.lines.is_empty() {
            self.lines.push(String::new());
        }
        self.lines.extend(block);
    }

    pub fn render(&self) -> String {
        let mut content = self.lines.join("\n");
        content.push('\n');
        content
    }

    /// Writes the file, creating parent directories. Consumes the builder.
    pub fn flush(self) -> Result<PathBuf, StubError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| StubError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&self.path, self.render()).map_err(|source| StubError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(self.path)
    }
}
