//! Generation: plan every artifact against disk and manifest, then apply.
//!
//! Planning is pure with respect to the project: it reads files and the
//! manifest but never writes. Dry runs stop after planning; real runs refuse
//! to write anything if the plan holds a single conflict.

use chrono::{SubsecRound, Utc};
use serde::Serialize;
use std::collections::HashMap;
use strum::Display;

use crate::emit::{Artifact, EmitOptions, Renderer, emit_collection};
use crate::error::{ConflictDetail, ScaffoldError, ScaffoldResult, ValidationIssue};
use crate::fingerprint::fingerprint_file;
use crate::manifest::{ManifestEntry, ManifestFilter, ManifestStore, TrackedArtifact};
use crate::schema::CollectionSpec;
use crate::writer;

/// What a run does with one artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Action {
    /// Nothing on disk yet
    Create,
    /// Disk already holds the new content
    Skip,
    /// Disk holds what was last generated; content changed
    Update,
    /// Forced over a file that differs from what was generated
    Overwrite,
    /// Differs from what was generated and not forced
    Conflict,
}

impl Action {
    pub fn writes(self) -> bool {
        matches!(self, Action::Create | Action::Update | Action::Overwrite)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum EntryChange {
    Recorded,
    Unchanged,
    /// Dry run: nothing recorded
    Planned,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedArtifact {
    #[serde(flatten)]
    pub artifact: Artifact,
    pub action: Action,
    /// The manifest already tracked this path
    pub tracked: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionPlan {
    pub layer: String,
    pub collection: String,
    pub artifacts: Vec<PlannedArtifact>,
    /// Previously tracked artifacts this run no longer produces
    pub carried_forward: Vec<TrackedArtifact>,
    pub entry: EntryChange,
}

impl CollectionPlan {
    fn next_entry(&self) -> ManifestEntry {
        let mut artifacts: Vec<TrackedArtifact> = self
            .artifacts
            .iter()
            .map(|planned| TrackedArtifact {
                path: planned.artifact.path.clone(),
                target_kind: planned.artifact.target_kind,
                fingerprint: planned.artifact.fingerprint.clone(),
            })
            .collect();
        artifacts.extend(self.carried_forward.iter().cloned());
        ManifestEntry {
            layer: self.layer.clone(),
            collection: self.collection.clone(),
            generated_at: Utc::now().trunc_subsecs(0),
            artifacts,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationReport {
    pub dry_run: bool,
    pub collections: Vec<CollectionPlan>,
}

impl GenerationReport {
    pub fn conflicts(&self) -> Vec<ConflictDetail> {
        self.artifacts()
            .filter(|planned| planned.action == Action::Conflict)
            .map(|planned| ConflictDetail {
                path: planned.artifact.path.clone(),
                target_kind: planned.artifact.target_kind,
                tracked: planned.tracked,
            })
            .collect()
    }

    pub fn count(&self, action: Action) -> usize {
        self.artifacts().filter(|p| p.action == action).count()
    }

    pub fn artifacts(&self) -> impl Iterator<Item = &PlannedArtifact> {
        self.collections.iter().flat_map(|c| c.artifacts.iter())
    }
}

#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub emit: EmitOptions,
    pub force: bool,
    pub dry_run: bool,
}

/// Classifies one artifact. `on_disk` and `tracked` are fingerprints.
pub fn classify(new: &str, on_disk: Option<&str>, tracked: Option<&str>, force: bool) -> Action {
    match on_disk {
        None => Action::Create,
        Some(disk) if disk == new => Action::Skip,
        Some(disk) if tracked == Some(disk) => Action::Update,
        Some(_) if force => Action::Overwrite,
        Some(_) => Action::Conflict,
    }
}

/// Builds the full plan without touching the project.
pub fn plan(
    store: &ManifestStore,
    specs: &[CollectionSpec],
    options: &GenerateOptions,
) -> ScaffoldResult<GenerationReport> {
    let renderer = Renderer::new()?;
    let mut owners: HashMap<String, (String, String)> = HashMap::new();
    let tracked_by: HashMap<&str, &ManifestEntry> = store
        .list(ManifestFilter::All)
        .into_iter()
        .flat_map(|entry| entry.artifacts.iter().map(move |t| (t.path.as_str(), entry)))
        .collect();
    let mut clashes = Vec::new();
    let mut collections = Vec::with_capacity(specs.len());

    for spec in specs {
        let previous = store.get(&spec.layer, &spec.name);
        let mut artifacts = Vec::new();

        for artifact in emit_collection(spec, &options.emit, &renderer)? {
            if let Some((layer, name)) = owners.insert(artifact.path.clone(), spec.key()) {
                clashes.push(ValidationIssue::new(
                    format!("{}/{}", spec.layer, spec.name),
                    format!("{} is also produced by {layer}/{name}", artifact.path),
                ));
            }
            if let Some(owner) = tracked_by
                .get(artifact.path.as_str())
                .filter(|owner| owner.key() != spec.key())
            {
                clashes.push(ValidationIssue::new(
                    format!("{}/{}", spec.layer, spec.name),
                    format!(
                        "{} is already tracked by {}/{}",
                        artifact.path, owner.layer, owner.collection
                    ),
                ));
            }
            let absolute = writer::resolve(store.root(), &artifact.path)?;
            let on_disk =
                fingerprint_file(&absolute).map_err(|e| ScaffoldError::io(&absolute, e))?;
            let tracked = previous.and_then(|entry| entry.artifact(&artifact.path));
            let action = classify(
                &artifact.fingerprint,
                on_disk.as_deref(),
                tracked.map(|t| t.fingerprint.as_str()),
                options.force,
            );
            tracing::debug!(path = %artifact.path, %action, "classified artifact");
            artifacts.push(PlannedArtifact {
                artifact,
                action,
                tracked: tracked.is_some(),
            });
        }

        let carried_forward = previous
            .map(|entry| {
                entry
                    .artifacts
                    .iter()
                    .filter(|t| !artifacts.iter().any(|p| p.artifact.path == t.path))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        collections.push(CollectionPlan {
            layer: spec.layer.clone(),
            collection: spec.name.clone(),
            artifacts,
            carried_forward,
            entry: EntryChange::Planned,
        });
    }

    if !clashes.is_empty() {
        return Err(ScaffoldError::validation(clashes));
    }
    Ok(GenerationReport {
        dry_run: options.dry_run,
        collections,
    })
}

/// Plans and, unless this is a dry run, writes artifacts and records entries.
pub fn generate(
    store: &mut ManifestStore,
    specs: &[CollectionSpec],
    options: &GenerateOptions,
) -> ScaffoldResult<GenerationReport> {
    let mut report = plan(store, specs, options)?;
    tracing::info!(
        collections = report.collections.len(),
        create = report.count(Action::Create),
        skip = report.count(Action::Skip),
        update = report.count(Action::Update),
        overwrite = report.count(Action::Overwrite),
        conflict = report.count(Action::Conflict),
        dry_run = options.dry_run,
        "generation planned"
    );

    if options.dry_run {
        return Ok(report);
    }

    let conflicts = report.conflicts();
    if !conflicts.is_empty() {
        tracing::warn!(conflicts = conflicts.len(), "aborting before any write");
        return Err(ScaffoldError::Conflict { conflicts });
    }

    for collection in &mut report.collections {
        for planned in collection.artifacts.iter().filter(|p| p.action.writes()) {
            let absolute = writer::resolve(store.root(), &planned.artifact.path)?;
            writer::write_atomic(&absolute, planned.artifact.content.as_bytes())?;
            tracing::debug!(path = %planned.artifact.path, action = %planned.action, "wrote artifact");
        }

        let next = collection.next_entry();
        let unchanged = collection.artifacts.iter().all(|p| p.action == Action::Skip)
            && store
                .get(&collection.layer, &collection.collection)
                .is_some_and(|current| current.tracks_same_as(&next));
        collection.entry = if unchanged {
            EntryChange::Unchanged
        } else {
            store.record(next)?;
            EntryChange::Recorded
        };
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_table() {
        assert_eq!(classify("a", None, None, false), Action::Create);
        assert_eq!(classify("a", None, Some("x"), true), Action::Create);
        assert_eq!(classify("a", Some("a"), None, true), Action::Skip);
        assert_eq!(classify("a", Some("b"), Some("b"), false), Action::Update);
        assert_eq!(classify("a", Some("b"), Some("c"), false), Action::Conflict);
        assert_eq!(classify("a", Some("b"), None, false), Action::Conflict);
        assert_eq!(classify("a", Some("b"), None, true), Action::Overwrite);
        assert_eq!(classify("a", Some("b"), Some("c"), true), Action::Overwrite);
    }

    #[test]
    fn only_mutating_actions_write() {
        assert!(Action::Create.writes());
        assert!(Action::Update.writes());
        assert!(Action::Overwrite.writes());
        assert!(!Action::Skip.writes());
        assert!(!Action::Conflict.writes());
    }
}
