//! Durable record of what generation produced.
//!
//! The manifest lives at `.crudkit/manifest.json` under the project root:
//!
//! ```json
//! {
//!   "version": 1,
//!   "entries": [
//!     {
//!       "layer": "shop",
//!       "collection": "products",
//!       "generatedAt": "2026-01-01T00:00:00Z",
//!       "artifacts": [
//!         { "path": "layers/shop/types/products.ts", "targetKind": "type-decl", "fingerprint": "…" }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Entries are keyed by `(layer, collection)` and written sorted by that key.
//! Each mutation persists immediately through a temp file and rename. When the
//! last entry goes away, so do the file and its directory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::emit::TargetKind;
use crate::error::{ScaffoldError, ScaffoldResult};
use crate::schema::KnownCollections;
use crate::writer;

pub const MANIFEST_DIR: &str = ".crudkit";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const MANIFEST_VERSION: u32 = 1;

pub type EntryKey = (String, String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedArtifact {
    pub path: String,
    pub target_kind: TargetKind,
    pub fingerprint: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub layer: String,
    pub collection: String,
    pub generated_at: DateTime<Utc>,
    pub artifacts: Vec<TrackedArtifact>,
}

impl ManifestEntry {
    pub fn key(&self) -> EntryKey {
        (self.layer.clone(), self.collection.clone())
    }

    pub fn artifact(&self, path: &str) -> Option<&TrackedArtifact> {
        self.artifacts.iter().find(|a| a.path == path)
    }

    /// Same tracked paths and fingerprints, ignoring order and timestamp.
    pub fn tracks_same_as(&self, other: &ManifestEntry) -> bool {
        let mut mine: Vec<_> = self.artifacts.iter().collect();
        let mut theirs: Vec<_> = other.artifacts.iter().collect();
        mine.sort_by(|a, b| a.path.cmp(&b.path));
        theirs.sort_by(|a, b| a.path.cmp(&b.path));
        mine == theirs
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ManifestDocument {
    version: u32,
    #[serde(default)]
    entries: Vec<ManifestEntry>,
}

/// Which entries a listing returns.
#[derive(Debug, Clone, Copy)]
pub enum ManifestFilter<'a> {
    All,
    Layer(&'a str),
    Keys(&'a [EntryKey]),
}

#[derive(Debug)]
pub struct ManifestStore {
    root: PathBuf,
    path: PathBuf,
    entries: BTreeMap<EntryKey, ManifestEntry>,
}

impl ManifestStore {
    /// Opens the manifest of a project. A missing file is an empty manifest;
    /// an unreadable one is an error.
    pub fn open(root: &Path) -> ScaffoldResult<Self> {
        let path = root.join(MANIFEST_DIR).join(MANIFEST_FILE);
        let mut entries = BTreeMap::new();

        if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| ScaffoldError::io(&path, e))?;
            let manifest_err = |reason: String| ScaffoldError::Manifest {
                path: path.clone(),
                reason,
            };
            let doc: ManifestDocument =
                serde_json::from_str(&content).map_err(|e| manifest_err(e.to_string()))?;
            if doc.version != MANIFEST_VERSION {
                return Err(manifest_err(format!(
                    "unsupported version {} (expected {MANIFEST_VERSION})",
                    doc.version
                )));
            }
            for entry in doc.entries {
                let key = entry.key();
                if entries.insert(key.clone(), entry).is_some() {
                    return Err(manifest_err(format!(
                        "duplicate entry for {}/{}",
                        key.0, key.1
                    )));
                }
            }
        }

        tracing::debug!(path = %path.display(), entries = entries.len(), "opened manifest");
        Ok(Self {
            root: root.to_path_buf(),
            path,
            entries,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, layer: &str, collection: &str) -> Option<&ManifestEntry> {
        self.entries
            .get(&(layer.to_string(), collection.to_string()))
    }

    pub fn list(&self, filter: ManifestFilter<'_>) -> Vec<&ManifestEntry> {
        self.entries
            .values()
            .filter(|entry| match filter {
                ManifestFilter::All => true,
                ManifestFilter::Layer(layer) => entry.layer == layer,
                ManifestFilter::Keys(keys) => keys.contains(&entry.key()),
            })
            .collect()
    }

    /// Replaces the entry for the same key and persists.
    pub fn record(&mut self, entry: ManifestEntry) -> ScaffoldResult<()> {
        tracing::info!(
            layer = %entry.layer,
            collection = %entry.collection,
            artifacts = entry.artifacts.len(),
            "recording manifest entry"
        );
        self.entries.insert(entry.key(), entry);
        self.persist()
    }

    pub fn remove(&mut self, layer: &str, collection: &str) -> ScaffoldResult<Option<ManifestEntry>> {
        let removed = self
            .entries
            .remove(&(layer.to_string(), collection.to_string()));
        if removed.is_some() {
            tracing::info!(layer, collection, "removed manifest entry");
            self.persist()?;
        }
        Ok(removed)
    }

    /// Every tracked collection, usable as a reference target.
    pub fn known_collections(&self) -> KnownCollections {
        let mut known = KnownCollections::new();
        for (layer, collection) in self.entries.keys() {
            known.add_collection(layer, collection);
        }
        known
    }

    fn persist(&self) -> ScaffoldResult<()> {
        if self.entries.is_empty() {
            writer::remove_file(&self.path)?;
            if let Some(dir) = self.path.parent() {
                writer::prune_empty_dirs(&self.root, dir)?;
            }
            return Ok(());
        }

        let doc = ManifestDocument {
            version: MANIFEST_VERSION,
            entries: self.entries.values().cloned().collect(),
        };
        let mut json = serde_json::to_string_pretty(&doc).map_err(|e| ScaffoldError::Manifest {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        json.push('\n');
        writer::write_atomic(&self.path, json.as_bytes())
    }
}
