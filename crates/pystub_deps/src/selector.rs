use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

/// 依存セレクタの解析エラー。
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("依存セレクタが空です")]
    Empty,
    #[error("モジュール参照 '{0}' にモジュール名がありません")]
    MissingModuleName(String),
    #[error("ファイル参照 '{0}' にパスがありません")]
    MissingFilePath(String),
    #[error("依存セレクタ '{0}' は group:artifact:version[:classifier] 形式ではありません")]
    InvalidCoordinates(String),
}

/// バージョンや分類子を含む完全なアーティファクト座標。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactCoordinates {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub classifier: Option<String>,
}

impl ArtifactCoordinates {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            classifier: None,
        }
    }

    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }

    fn group_path(&self) -> String {
        self.group_id.replace('.', "/")
    }

    fn version_path(&self) -> String {
        format!(
            "{}/{}/{}",
            self.group_path(),
            self.artifact_id,
            self.version
        )
    }

    fn basename(&self) -> String {
        match &self.classifier {
            Some(classifier) => format!("{}-{}-{}", self.artifact_id, self.version, classifier),
            None => format!("{}-{}", self.artifact_id, self.version),
        }
    }

    /// Maven レイアウト上の相対パス（例: `org/example/lib/1.0/lib-1.0.jar`）。
    pub fn archive_path(&self, extension: &str) -> String {
        format!("{}/{}.{}", self.version_path(), self.basename(), extension)
    }
}

impl fmt::Display for ArtifactCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(classifier) = &self.classifier {
            write!(
                f,
                "{}:{}:{}:{}",
                self.group_id, self.artifact_id, self.version, classifier
            )
        } else {
            write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
        }
    }
}

/// ビルドユニットに宣言された依存一件。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DependencySelector {
    /// 同一ワークスペース内の別モジュール（`project:name` / `:name`）。
    Project(String),
    /// モジュールディレクトリからの相対パスで指定したアーカイブ。
    File(PathBuf),
    /// Maven 座標。
    Module(ArtifactCoordinates),
}

impl FromStr for DependencySelector {
    type Err = SelectorError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(SelectorError::Empty);
        }

        if let Some(name) = trimmed
            .strip_prefix("project:")
            .or_else(|| trimmed.strip_prefix(':'))
        {
            let name = name.trim().trim_start_matches(':');
            if name.is_empty() {
                return Err(SelectorError::MissingModuleName(raw.to_string()));
            }
            return Ok(DependencySelector::Project(name.to_string()));
        }

        if let Some(path) = trimmed.strip_prefix("file:") {
            let path = path.trim();
            if path.is_empty() {
                return Err(SelectorError::MissingFilePath(raw.to_string()));
            }
            return Ok(DependencySelector::File(PathBuf::from(path)));
        }

        let segments = trimmed.split(':').map(str::trim).collect::<Vec<_>>();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(SelectorError::InvalidCoordinates(raw.to_string()));
        }
        match segments.as_slice() {
            [group, artifact, version] => Ok(DependencySelector::Module(
                ArtifactCoordinates::new(*group, *artifact, *version),
            )),
            [group, artifact, version, classifier] => Ok(DependencySelector::Module(
                ArtifactCoordinates::new(*group, *artifact, *version).with_classifier(*classifier),
            )),
            _ => Err(SelectorError::InvalidCoordinates(raw.to_string())),
        }
    }
}

impl fmt::Display for DependencySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencySelector::Project(name) => write!(f, "project :{name}"),
            DependencySelector::File(path) => write!(f, "file:{}", path.display()),
            DependencySelector::Module(coordinates) => coordinates.fmt(f),
        }
    }
}
