//! Rollback: reverse manifest entries while protecting edited files.
//!
//! Each entry moves through
//!
//! ```text
//! Pending ─> per artifact {Modified | Failed | Deleted | Kept | Missing}
//!         ─> Removed   (every artifact handled, entry dropped from the manifest)
//!         ─> Retained  (entry shrinks to the modified or failed artifacts)
//! ```
//!
//! Issues never abort a bulk run; they are collected into the report.

use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use strum::Display;

use crate::emit::TargetKind;
use crate::error::{ScaffoldError, ScaffoldResult};
use crate::fingerprint::fingerprint_file;
use crate::manifest::{EntryKey, ManifestEntry, ManifestFilter, ManifestStore, TrackedArtifact};
use crate::schema::ProjectConfigDef;
use crate::select::Selector;
use crate::writer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ArtifactOutcome {
    Deleted,
    /// File left on disk, tracking dropped
    Kept,
    /// Already gone
    Missing,
    /// Edited since generation and not forced
    Modified,
    /// Could not be inspected or removed; see the report's issues
    Failed,
}

impl ArtifactOutcome {
    pub fn handled(self) -> bool {
        !matches!(self, ArtifactOutcome::Modified | ArtifactOutcome::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum EntryState {
    Removed,
    Retained,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactResult {
    pub path: String,
    pub target_kind: TargetKind,
    pub outcome: ArtifactOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryReport {
    pub layer: String,
    pub collection: String,
    pub artifacts: Vec<ArtifactResult>,
    pub state: EntryState,
    /// Directories removed because they became empty
    pub pruned: Vec<String>,
}

/// A non-fatal problem found during rollback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollbackIssue {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'static str>,
}

impl From<&ScaffoldError> for RollbackIssue {
    fn from(err: &ScaffoldError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
            hint: err.hint(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackReport {
    pub dry_run: bool,
    pub entries: Vec<EntryReport>,
    pub issues: Vec<RollbackIssue>,
}

impl RollbackReport {
    pub fn retained(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.state == EntryState::Retained)
            .count()
    }

    pub fn count(&self, outcome: ArtifactOutcome) -> usize {
        self.entries
            .iter()
            .flat_map(|e| e.artifacts.iter())
            .filter(|a| a.outcome == outcome)
            .count()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RollbackOptions {
    pub dry_run: bool,
    pub keep_files: bool,
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkTarget {
    /// Every entry of a layer
    Layer(String),
    /// Every `(layer, collection)` pair listed in a project config's targets
    Config(PathBuf),
}

/// Rolls back one entry. A missing entry is an error here, unlike in bulk runs.
pub fn rollback_single(
    store: &mut ManifestStore,
    layer: &str,
    collection: &str,
    options: &RollbackOptions,
) -> ScaffoldResult<RollbackReport> {
    if store.get(layer, collection).is_none() {
        return Err(ScaffoldError::ManifestMismatch {
            layer: layer.to_string(),
            collection: collection.to_string(),
        });
    }
    rollback_keys(store, &[(layer.to_string(), collection.to_string())], options)
}

pub fn rollback_bulk(
    store: &mut ManifestStore,
    target: &BulkTarget,
    options: &RollbackOptions,
) -> ScaffoldResult<RollbackReport> {
    let keys: Vec<EntryKey> = match target {
        BulkTarget::Layer(layer) => {
            let keys: Vec<EntryKey> = store
                .list(ManifestFilter::Layer(layer))
                .into_iter()
                .map(ManifestEntry::key)
                .collect();
            if keys.is_empty() {
                tracing::info!(layer = %layer, "no manifest entries in layer");
            }
            keys
        }
        BulkTarget::Config(path) => config_keys(path)?,
    };
    rollback_keys(store, &keys, options)
}

/// Presents every entry to `selector` and rolls back the chosen ones.
pub fn rollback_interactive(
    store: &mut ManifestStore,
    selector: &mut dyn Selector,
    options: &RollbackOptions,
) -> ScaffoldResult<RollbackReport> {
    let keys = {
        let entries = store.list(ManifestFilter::All);
        selector.select(&entries)?
    };
    if keys.is_empty() {
        tracing::info!("nothing selected");
        return Ok(RollbackReport {
            dry_run: options.dry_run,
            ..RollbackReport::default()
        });
    }
    rollback_keys(store, &keys, options)
}

/// Rolls back the given keys in order. Keys without an entry become
/// `manifest_mismatch` issues.
pub fn rollback_keys(
    store: &mut ManifestStore,
    keys: &[EntryKey],
    options: &RollbackOptions,
) -> ScaffoldResult<RollbackReport> {
    let mut report = RollbackReport {
        dry_run: options.dry_run,
        ..RollbackReport::default()
    };

    for (layer, collection) in keys {
        let Some(entry) = store.get(layer, collection).cloned() else {
            let err = ScaffoldError::ManifestMismatch {
                layer: layer.clone(),
                collection: collection.clone(),
            };
            tracing::warn!(%layer, %collection, "no manifest entry");
            report.issues.push(RollbackIssue::from(&err));
            continue;
        };
        let entry_report = rollback_entry(store, &entry, options, &mut report.issues)?;
        tracing::info!(
            %layer,
            %collection,
            state = %entry_report.state,
            dry_run = options.dry_run,
            "rolled back entry"
        );
        report.entries.push(entry_report);
    }

    Ok(report)
}

fn rollback_entry(
    store: &mut ManifestStore,
    entry: &ManifestEntry,
    options: &RollbackOptions,
    issues: &mut Vec<RollbackIssue>,
) -> ScaffoldResult<EntryReport> {
    let root = store.root().to_path_buf();
    let mut artifacts = Vec::with_capacity(entry.artifacts.len());
    let mut emptied_dirs = BTreeSet::new();

    for tracked in &entry.artifacts {
        let outcome = match release_artifact(&root, tracked, options, issues) {
            Ok((outcome, removed_from)) => {
                if let Some(dir) = removed_from {
                    emptied_dirs.insert(dir);
                }
                outcome
            }
            Err(err) => {
                tracing::warn!(path = %tracked.path, error = %err, "could not release artifact");
                issues.push(RollbackIssue::from(&err));
                ArtifactOutcome::Failed
            }
        };
        artifacts.push(ArtifactResult {
            path: tracked.path.clone(),
            target_kind: tracked.target_kind,
            outcome,
        });
    }

    let state = if artifacts.iter().all(|a| a.outcome.handled()) {
        EntryState::Removed
    } else {
        EntryState::Retained
    };

    let mut pruned = Vec::new();
    if !options.dry_run {
        // Deepest first so parents see their children gone.
        for dir in emptied_dirs.iter().rev() {
            match writer::prune_empty_dirs(&root, dir) {
                Ok(removed) => {
                    pruned.extend(removed.iter().map(|path| relative_display(&root, path)));
                }
                Err(err) => issues.push(RollbackIssue::from(&err)),
            }
        }
        match state {
            EntryState::Removed => {
                store.remove(&entry.layer, &entry.collection)?;
            }
            EntryState::Retained => {
                let remaining = unhandled_only(entry, &artifacts);
                if remaining.artifacts.len() < entry.artifacts.len() {
                    store.record(remaining)?;
                }
            }
        }
    }

    Ok(EntryReport {
        layer: entry.layer.clone(),
        collection: entry.collection.clone(),
        artifacts,
        state,
        pruned,
    })
}

/// Decides and applies the outcome for one tracked file. Returns the
/// directory a deleted file was removed from.
fn release_artifact(
    root: &Path,
    tracked: &TrackedArtifact,
    options: &RollbackOptions,
    issues: &mut Vec<RollbackIssue>,
) -> ScaffoldResult<(ArtifactOutcome, Option<PathBuf>)> {
    let absolute = writer::resolve(root, &tracked.path)?;
    let on_disk = fingerprint_file(&absolute).map_err(|e| ScaffoldError::io(&absolute, e))?;
    let release = if options.keep_files {
        ArtifactOutcome::Kept
    } else {
        ArtifactOutcome::Deleted
    };
    let outcome = match on_disk {
        None => ArtifactOutcome::Missing,
        Some(current) if current == tracked.fingerprint => release,
        Some(_) if options.force => {
            tracing::warn!(path = %tracked.path, "releasing modified file (forced)");
            release
        }
        Some(_) => {
            issues.push(RollbackIssue::from(&ScaffoldError::ModifiedSinceGeneration {
                path: PathBuf::from(&tracked.path),
            }));
            ArtifactOutcome::Modified
        }
    };

    if outcome == ArtifactOutcome::Deleted && !options.dry_run {
        writer::remove_file(&absolute)?;
        return Ok((outcome, absolute.parent().map(Path::to_path_buf)));
    }
    Ok((outcome, None))
}

/// The entry reduced to the artifacts rollback could not release; handled
/// ones leave tracking.
fn unhandled_only(entry: &ManifestEntry, results: &[ArtifactResult]) -> ManifestEntry {
    let artifacts = entry
        .artifacts
        .iter()
        .filter(|tracked| {
            results
                .iter()
                .any(|r| r.path == tracked.path && !r.outcome.handled())
        })
        .cloned()
        .collect();
    ManifestEntry {
        artifacts,
        ..entry.clone()
    }
}

fn config_keys(path: &Path) -> ScaffoldResult<Vec<EntryKey>> {
    let config: ProjectConfigDef = crate::schema::loader::parse_document(path)?;
    let mut keys = Vec::new();
    for target in &config.targets {
        for collection in &target.collections {
            let key = (target.layer.clone(), collection.clone());
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }
    Ok(keys)
}

fn relative_display(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}
