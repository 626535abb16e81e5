//! Error taxonomy for generation and rollback.
//!
//! Every variant knows a stable snake-case `code()` for reports and, where a
//! run-level flag resolves it, a `hint()` naming that flag. Validation and
//! conflict errors carry the complete list of offending fields/artifacts so a
//! single run surfaces the whole defect list.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::emit::TargetKind;

/// Result alias used across the engine.
pub type ScaffoldResult<T> = Result<T, ScaffoldError>;

/// One problem found while validating a schema document or project config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Dotted location, e.g. `shop/products.price.meta.scale`
    pub location: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ValidationIssue {
    pub fn new(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            message: message.into(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, " ({hint})")?;
        }
        Ok(())
    }
}

/// An artifact that exists on disk with content the engine did not produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictDetail {
    pub path: String,
    pub target_kind: TargetKind,
    /// True when the manifest tracked this path and the file was edited since.
    pub tracked: bool,
}

#[derive(Debug, Error)]
pub enum ScaffoldError {
    #[error("validation failed with {} issue(s):\n{}", issues.len(), render_lines(issues))]
    Validation { issues: Vec<ValidationIssue> },

    #[error(
        "{} artifact(s) differ from what would be generated:\n{}",
        conflicts.len(),
        render_conflicts(conflicts)
    )]
    Conflict { conflicts: Vec<ConflictDetail> },

    #[error("no manifest entry for {layer}/{collection}")]
    ManifestMismatch { layer: String, collection: String },

    #[error("{} was modified since generation", path.display())]
    ModifiedSinceGeneration { path: PathBuf },

    #[error("path '{path}' escapes the project root")]
    UnsafePath { path: String },

    #[error("manifest at {} is unreadable: {reason}", path.display())]
    Manifest { path: PathBuf, reason: String },

    #[error("failed to parse {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("rendering {template} failed: {source}")]
    Render {
        template: String,
        #[source]
        source: tera::Error,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ScaffoldError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn validation(issues: Vec<ValidationIssue>) -> Self {
        Self::Validation { issues }
    }

    /// Stable identifier used in JSON reports and logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::Conflict { .. } => "conflict_error",
            Self::ManifestMismatch { .. } => "manifest_mismatch",
            Self::ModifiedSinceGeneration { .. } => "modified_since_generation",
            Self::UnsafePath { .. } => "unsafe_path",
            Self::Manifest { .. } => "manifest_error",
            Self::Parse { .. } => "parse_error",
            Self::Render { .. } => "render_error",
            Self::Io { .. } => "io_error",
        }
    }

    /// The run-level flag (if any) that would resolve this error.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Conflict { .. } => Some("re-run with --force to overwrite the listed files"),
            Self::ModifiedSinceGeneration { .. } => {
                Some("re-run with --force to release it anyway")
            }
            Self::ManifestMismatch { .. } => {
                Some("run `crudkit list` to see what the manifest tracks")
            }
            _ => None,
        }
    }

    /// Issues carried by a validation failure, empty otherwise.
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            Self::Validation { issues } => issues,
            _ => &[],
        }
    }
}

fn render_lines(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("  - {issue}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_conflicts(conflicts: &[ConflictDetail]) -> String {
    conflicts
        .iter()
        .map(|c| {
            let origin = if c.tracked {
                "edited since generation"
            } else {
                "not created by crudkit"
            };
            format!("  - {} [{}] ({origin})", c.path, c.target_kind)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
