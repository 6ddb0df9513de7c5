use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{self, BufReader, Cursor, Read, Seek};
use std::path::{Path, PathBuf};

use pystub_deps::ResolvedArtifact;
use thiserror::Error;
use tracing::{debug, trace};
use walkdir::WalkDir;
use zip::ZipArchive;
use zip::result::ZipError;

use super::classfile::{ClassParseError, parse_class};
use super::index::ClassTable;

#[derive(Debug, Error)]
pub enum IntrospectError {
    #[error("IO error while scanning {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("ZIP error while scanning {path}: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: ZipError,
    },
    #[error("Class parse error in {path}: {source}")]
    ClassFile {
        path: PathBuf,
        #[source]
        source: ClassParseError,
    },
}

/// Accumulates the class records of several artifacts into one table.
#[derive(Debug, Default)]
pub struct ClassTableBuilder {
    table: ClassTable,
    duplicates: usize,
}

impl ClassTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans every artifact in order and returns the combined table.
    pub fn scan<'a, I>(artifacts: I) -> Result<ClassTable, IntrospectError>
    where
        I: IntoIterator<Item = &'a ResolvedArtifact>,
    {
        let mut builder = Self::new();
        for artifact in artifacts {
            builder.scan_artifact(&artifact.file)?;
        }
        Ok(builder.finish())
    }

    pub fn scan_artifact(&mut self, path: &Path) -> Result<(), IntrospectError> {
        let before = self.table.len();

        if path.is_dir() {
            self.scan_directory(path)?;
        } else if is_archive(path) {
            self.scan_archive(path)?;
        } else if has_extension(path, "class") {
            self.scan_class_file(path)?;
        } else if !path.exists() {
            return Err(IntrospectError::Io {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, "artifact does not exist"),
            });
        } else {
            debug!(path = %path.display(), "skipping artifact with unknown format");
            return Ok(());
        }

        debug!(
            path = %path.display(),
            classes = self.table.len() - before,
            "scanned artifact"
        );
        Ok(())
    }

    pub fn finish(self) -> ClassTable {
        if self.duplicates > 0 {
            debug!(duplicates = self.duplicates, "ignored duplicate class definitions");
        }
        self.table
    }

    fn scan_directory(&mut self, root: &Path) -> Result<(), IntrospectError> {
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(|error| {
                let path = error.path().unwrap_or(root).to_path_buf();
                IntrospectError::Io {
                    path,
                    source: io::Error::other(error),
                }
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if is_archive(path) {
                self.scan_archive(path)?;
                continue;
            }

            let relative = path.strip_prefix(root).unwrap_or(path);
            let relative = relative.to_string_lossy().replace('\\', "/");
            if has_extension(path, "class") && !should_skip_entry(&relative) {
                self.scan_class_file(path)?;
            }
        }
        Ok(())
    }

    fn scan_archive(&mut self, path: &Path) -> Result<(), IntrospectError> {
        let file = File::open(path).map_err(|source| IntrospectError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let archive = ZipArchive::new(BufReader::new(file)).map_err(|source| IntrospectError::Zip {
            path: path.to_path_buf(),
            source,
        })?;
        self.scan_zip(archive, path)
    }

    /// `label` is the path reported in errors; nested archives use `outer!/inner.jar`.
    fn scan_zip<R: Read + Seek>(
        &mut self,
        mut archive: ZipArchive<R>,
        label: &Path,
    ) -> Result<(), IntrospectError> {
        let mut buffer = Vec::new();

        for idx in 0..archive.len() {
            let mut entry = archive.by_index(idx).map_err(|source| IntrospectError::Zip {
                path: label.to_path_buf(),
                source,
            })?;

            if !entry.is_file() {
                continue;
            }

            let name = entry.name().to_string();
            if should_skip_entry(&name) {
                continue;
            }

            let nested_archive = is_archive(Path::new(&name));
            if !nested_archive && !name.ends_with(".class") {
                continue;
            }

            buffer.clear();
            entry
                .read_to_end(&mut buffer)
                .map_err(|source| IntrospectError::Io {
                    path: archive_entry_path(label, &name),
                    source,
                })?;
            drop(entry);

            let virtual_path = archive_entry_path(label, &name);
            if nested_archive {
                trace!(path = %virtual_path.display(), "scanning nested archive");
                let inner = ZipArchive::new(Cursor::new(std::mem::take(&mut buffer))).map_err(
                    |source| IntrospectError::Zip {
                        path: virtual_path.clone(),
                        source,
                    },
                )?;
                self.scan_zip(inner, &virtual_path)?;
            } else {
                self.index_class_bytes(&buffer, virtual_path)?;
            }
        }

        Ok(())
    }

    fn scan_class_file(&mut self, path: &Path) -> Result<(), IntrospectError> {
        let buffer = fs::read(path).map_err(|source| IntrospectError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.index_class_bytes(&buffer, path.to_path_buf())
    }

    fn index_class_bytes(&mut self, bytes: &[u8], virtual_path: PathBuf) -> Result<(), IntrospectError> {
        let record = parse_class(bytes).map_err(|source| IntrospectError::ClassFile {
            path: virtual_path.clone(),
            source,
        })?;

        let name = record.name.clone();
        if !self.table.insert(record) {
            self.duplicates += 1;
            trace!(class = %name, path = %virtual_path.display(), "duplicate class ignored");
        }
        Ok(())
    }
}

fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| matches_ignore_case(ext, &["jar", "zip", "aar"]))
        .unwrap_or(false)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| ext.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

fn matches_ignore_case(candidate: &str, values: &[&str]) -> bool {
    values
        .iter()
        .any(|value| candidate.eq_ignore_ascii_case(value))
}

fn should_skip_entry(name: &str) -> bool {
    if name.starts_with("META-INF/") {
        return true;
    }
    let file_name = name.rsplit('/').next().unwrap_or(name);
    matches!(file_name, "module-info.class" | "package-info.class")
}

fn archive_entry_path(archive: &Path, entry: &str) -> PathBuf {
    let mut display = archive.display().to_string();
    display.push('!');
    display.push('/');
    display.push_str(entry);
    PathBuf::from(display)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_entries_are_skipped() {
        assert!(should_skip_entry("META-INF/versions/9/a/B.class"));
        assert!(should_skip_entry("module-info.class"));
        assert!(should_skip_entry("a/b/package-info.class"));
        assert!(!should_skip_entry("a/b/Widget.class"));
    }

    #[test]
    fn archive_detection_is_case_insensitive() {
        assert!(is_archive(Path::new("libs/ui.JAR")));
        assert!(is_archive(Path::new("ui-release.aar")));
        assert!(!is_archive(Path::new("Widget.class")));
    }

    #[test]
    fn virtual_paths_nest() {
        let outer = archive_entry_path(Path::new("/repo/ui.aar"), "classes.jar");
        let inner = archive_entry_path(&outer, "a/B.class");
        assert_eq!(inner, PathBuf::from("/repo/ui.aar!/classes.jar!/a/B.class"));
    }

    #[test]
    fn missing_artifact_is_an_io_error() {
        let mut builder = ClassTableBuilder::new();
        let error = builder
            .scan_artifact(Path::new("/definitely/not/here.jar"))
            .unwrap_err();
        assert!(matches!(error, IntrospectError::Io { .. }));
    }
}
