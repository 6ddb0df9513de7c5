use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::snapshot::DependencySnapshot;

/// 前回実行時のスナップショット。
pub const LOCK_FILE_NAME: &str = "meta_json.lock";
/// 比較のためだけに書き出す一時ファイル。
pub const NEW_FILE_NAME: &str = "meta_json.new";

/// ロックファイル関連のエラー。
#[derive(Debug, Error)]
pub enum LockError {
    #[error("ロックファイル {path:?} の読み書きに失敗しました: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("スナップショットの JSON 変換に失敗しました ({path:?}): {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// 変更判定の結果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateOutcome {
    pub changed: bool,
    /// 正規形 JSON の SHA-256。
    pub digest: String,
}

/// 依存スナップショットを永続化されたロックと比較する。
///
/// 並行プロセスからの同時実行は想定していない（ファイルロックは行わない）。
#[derive(Debug, Clone)]
pub struct ChangeGate {
    lock_path: PathBuf,
    new_path: PathBuf,
}

impl ChangeGate {
    pub fn new(lock_dir: impl AsRef<Path>) -> Self {
        let lock_dir = lock_dir.as_ref();
        Self {
            lock_path: lock_dir.join(LOCK_FILE_NAME),
            new_path: lock_dir.join(NEW_FILE_NAME),
        }
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Writes the canonical snapshot to the scratch file, compares it with the
    /// lock and replaces the lock when they differ.
    pub fn evaluate(&self, snapshot: &DependencySnapshot) -> Result<GateOutcome, LockError> {
        if let Some(parent) = self.new_path.parent() {
            fs::create_dir_all(parent).map_err(|source| LockError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let canonical = snapshot.canonical();
        let encoded = serde_json::to_string_pretty(&canonical).map_err(|source| LockError::Json {
            path: self.new_path.clone(),
            source,
        })?;
        write(&self.new_path, &encoded)?;

        let fresh = self.read_snapshot(&self.new_path)?;
        let digest = format!("{:x}", Sha256::digest(encoded.as_bytes()));

        let changed = match self.load_previous()? {
            Some(previous) => !snapshots_equivalent(&previous, &fresh),
            None => true,
        };

        if changed {
            fs::rename(&self.new_path, &self.lock_path).map_err(|source| LockError::Io {
                path: self.lock_path.clone(),
                source,
            })?;
            info!(lock = %self.lock_path.display(), digest = %digest, "dependency snapshot changed");
        } else {
            fs::remove_file(&self.new_path).map_err(|source| LockError::Io {
                path: self.new_path.clone(),
                source,
            })?;
            debug!(lock = %self.lock_path.display(), "dependency snapshot unchanged");
        }

        Ok(GateOutcome { changed, digest })
    }

    fn load_previous(&self) -> Result<Option<DependencySnapshot>, LockError> {
        if !self.lock_path.exists() {
            return Ok(None);
        }

        match self.read_snapshot(&self.lock_path) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(LockError::Json { source, .. }) => {
                warn!(lock = %self.lock_path.display(), error = %source, "ignoring unreadable lock file");
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    fn read_snapshot(&self, path: &Path) -> Result<DependencySnapshot, LockError> {
        let content = fs::read_to_string(path).map_err(|source| LockError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| LockError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// 構造的な同値判定。アーティファクトの並び順は無視し、各フィールドは完全一致を要求する。
pub fn snapshots_equivalent(left: &DependencySnapshot, right: &DependencySnapshot) -> bool {
    left.canonical() == right.canonical()
}

fn write(path: &Path, content: &str) -> Result<(), LockError> {
    fs::write(path, content).map_err(|source| LockError::Io {
        path: path.to_path_buf(),
        source,
    })
}
