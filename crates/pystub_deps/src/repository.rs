//! Artifact lookup against local Maven-layout repositories.

use std::fmt;
use std::path::PathBuf;

use tracing::debug;

use crate::selector::ArtifactCoordinates;

/// Archive extensions tried for every coordinate, in order.
const ARCHIVE_EXTENSIONS: &[&str] = &["jar", "aar"];

/// Lookup miss, with every location that was searched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupFailure {
    pub coordinates: String,
    pub searched: Vec<PathBuf>,
}

impl fmt::Display for LookupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Could not find {}.", self.coordinates)?;
        if self.searched.is_empty() {
            return write!(f, " No repositories are configured.");
        }
        writeln!(f)?;
        write!(f, "Searched in the following locations:")?;
        for location in &self.searched {
            writeln!(f)?;
            write!(f, "  - {}", location.display())?;
        }
        Ok(())
    }
}

/// Maps Maven coordinates to archive files on disk.
pub trait ArtifactSource {
    fn locate(&self, coordinates: &ArtifactCoordinates) -> Result<PathBuf, LookupFailure>;
}

/// Ordered list of repository roots laid out as `group/artifact/version/artifact-version.jar`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalRepository {
    roots: Vec<PathBuf>,
}

impl LocalRepository {
    pub fn new<I>(roots: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        Self {
            roots: roots.into_iter().collect(),
        }
    }

    /// `~/.m2/repository`, when a home directory can be determined.
    pub fn default_roots() -> Vec<PathBuf> {
        dirs::home_dir()
            .map(|home| vec![home.join(".m2").join("repository")])
            .unwrap_or_default()
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

impl ArtifactSource for LocalRepository {
    fn locate(&self, coordinates: &ArtifactCoordinates) -> Result<PathBuf, LookupFailure> {
        let mut searched = Vec::new();
        for root in &self.roots {
            for extension in ARCHIVE_EXTENSIONS {
                let candidate = root.join(coordinates.archive_path(extension));
                if candidate.is_file() {
                    debug!(coordinates = %coordinates, path = %candidate.display(), "artifact located");
                    return Ok(candidate);
                }
                searched.push(candidate);
            }
        }

        Err(LookupFailure {
            coordinates: coordinates.to_string(),
            searched,
        })
    }
}
