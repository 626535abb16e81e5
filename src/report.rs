//! Rendering run reports for people (text) and tools (JSON).
//!
//! Reports go to stdout; logs go to stderr.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::error::ScaffoldError;
use crate::generate::{Action, GenerationReport};
use crate::manifest::ManifestEntry;
use crate::rollback::{ArtifactOutcome, EntryState, RollbackReport};

/// Report format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Human-readable lines (default)
    #[default]
    Text,
    /// Machine-readable JSON
    Json,
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Plain-text rendering of a report.
pub trait TextReport {
    fn to_text(&self) -> String;
}

/// Renders a report in the requested format.
pub fn render<T: Serialize + TextReport>(report: &T, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Text => Ok(report.to_text()),
        ReportFormat::Json => {
            serde_json::to_string_pretty(report).context("Failed to serialize report")
        }
    }
}

impl TextReport for GenerationReport {
    fn to_text(&self) -> String {
        let mut content = String::new();
        if self.dry_run {
            content.push_str("dry run: nothing was written\n");
        }
        for collection in &self.collections {
            content.push_str(&format!(
                "{}/{} ({})\n",
                collection.layer, collection.collection, collection.entry
            ));
            for planned in &collection.artifacts {
                content.push_str(&format!(
                    "  {:<9} {:<16} {}\n",
                    planned.action.to_string(),
                    planned.artifact.target_kind.to_string(),
                    planned.artifact.path
                ));
            }
            for carried in &collection.carried_forward {
                content.push_str(&format!(
                    "  {:<9} {:<16} {}\n",
                    "kept",
                    carried.target_kind.to_string(),
                    carried.path
                ));
            }
        }
        content.push_str(&format!(
            "{} create, {} update, {} overwrite, {} skip, {} conflict\n",
            self.count(Action::Create),
            self.count(Action::Update),
            self.count(Action::Overwrite),
            self.count(Action::Skip),
            self.count(Action::Conflict),
        ));
        content
    }
}

impl TextReport for RollbackReport {
    fn to_text(&self) -> String {
        let mut content = String::new();
        if self.dry_run {
            content.push_str("dry run: nothing was removed\n");
        }
        for entry in &self.entries {
            content.push_str(&format!(
                "{}/{} ({})\n",
                entry.layer, entry.collection, entry.state
            ));
            for artifact in &entry.artifacts {
                content.push_str(&format!(
                    "  {:<9} {:<16} {}\n",
                    artifact.outcome.to_string(),
                    artifact.target_kind.to_string(),
                    artifact.path
                ));
            }
            for dir in &entry.pruned {
                content.push_str(&format!("  {:<9} {:<16} {}/\n", "pruned", "", dir));
            }
        }
        for issue in &self.issues {
            content.push_str(&format!("! [{}] {}\n", issue.code, issue.message));
            if let Some(hint) = issue.hint {
                content.push_str(&format!("  hint: {hint}\n"));
            }
        }
        let removed = self
            .entries
            .iter()
            .filter(|e| e.state == EntryState::Removed)
            .count();
        content.push_str(&format!(
            "{} removed, {} retained; {} deleted, {} kept, {} missing, {} modified, {} failed\n",
            removed,
            self.retained(),
            self.count(ArtifactOutcome::Deleted),
            self.count(ArtifactOutcome::Kept),
            self.count(ArtifactOutcome::Missing),
            self.count(ArtifactOutcome::Modified),
            self.count(ArtifactOutcome::Failed),
        ));
        content
    }
}

/// One manifest entry as shown by `list`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListedEntry {
    pub layer: String,
    pub collection: String,
    pub generated_at: DateTime<Utc>,
    pub artifacts: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ListReport {
    pub entries: Vec<ListedEntry>,
}

impl ListReport {
    pub fn from_entries(entries: &[&ManifestEntry]) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|entry| ListedEntry {
                    layer: entry.layer.clone(),
                    collection: entry.collection.clone(),
                    generated_at: entry.generated_at,
                    artifacts: entry.artifacts.iter().map(|a| a.path.clone()).collect(),
                })
                .collect(),
        }
    }
}

impl TextReport for ListReport {
    fn to_text(&self) -> String {
        if self.entries.is_empty() {
            return "no generated collections\n".to_string();
        }
        let mut content = String::new();
        for entry in &self.entries {
            content.push_str(&format!(
                "{}/{}  {} files  {}\n",
                entry.layer,
                entry.collection,
                entry.artifacts.len(),
                entry.generated_at.to_rfc3339()
            ));
        }
        content
    }
}

#[derive(Debug, Serialize)]
struct ErrorReport<'a> {
    code: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<&'a str>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    issues: &'a [crate::error::ValidationIssue],
}

/// Renders a failed run. Engine errors keep their code and hint; anything
/// else is reported as `internal_error`.
pub fn render_error(err: &anyhow::Error, format: ReportFormat) -> String {
    let engine = err.downcast_ref::<ScaffoldError>();
    let report = ErrorReport {
        code: engine.map_or("internal_error", ScaffoldError::code),
        message: format!("{err:#}"),
        hint: engine.and_then(ScaffoldError::hint),
        issues: engine.map(ScaffoldError::issues).unwrap_or_default(),
    };
    match format {
        ReportFormat::Json => serde_json::to_string_pretty(&report)
            .unwrap_or_else(|_| format!("{{\"code\":\"{}\"}}", report.code)),
        ReportFormat::Text => {
            let mut content = format!("error[{}]: {}\n", report.code, report.message);
            if let Some(hint) = report.hint {
                content.push_str(&format!("hint: {hint}\n"));
            }
            content
        }
    }
}
