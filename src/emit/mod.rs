//! Emission: validated collection → intermediate representation → artifacts.
//!
//! ```text
//! CollectionSpec ─┬─> type_map (FieldType lookup) ─┐
//!                 └─> ir::CollectionIr ────────────┴─> render (tera) ─> Vec<Artifact>
//! ```
//!
//! The IR is built once per collection and knows nothing about text; the
//! renderer turns it into one artifact per [`ArtifactRole`]. Which roles are
//! produced is decided by [`EmitOptions`] and the path resolver.

pub mod ir;
pub mod render;
pub mod templates;
pub mod type_map;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::fingerprint::fingerprint_bytes;
use crate::naming::{NameSet, PathOptions, artifact_paths};
use crate::schema::{CollectionSpec, Dialect};

pub use ir::CollectionIr;
pub use render::Renderer;

/// Generated-file categories. Each kind can be toggled off independently.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum TargetKind {
    StorageSchema,
    DataAccess,
    ServerHandler,
    UiList,
    UiForm,
    UiTable,
    TypeDecl,
}

/// One concrete file a target kind produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum ArtifactRole {
    Schema,
    Seed,
    Queries,
    Composable,
    HandlerGetAll,
    HandlerGetByIds,
    HandlerCreate,
    HandlerUpdate,
    HandlerDelete,
    List,
    Form,
    Table,
    Types,
}

impl ArtifactRole {
    pub fn kind(self) -> TargetKind {
        match self {
            ArtifactRole::Schema | ArtifactRole::Seed => TargetKind::StorageSchema,
            ArtifactRole::Queries | ArtifactRole::Composable => TargetKind::DataAccess,
            ArtifactRole::HandlerGetAll
            | ArtifactRole::HandlerGetByIds
            | ArtifactRole::HandlerCreate
            | ArtifactRole::HandlerUpdate
            | ArtifactRole::HandlerDelete => TargetKind::ServerHandler,
            ArtifactRole::List => TargetKind::UiList,
            ArtifactRole::Form => TargetKind::UiForm,
            ArtifactRole::Table => TargetKind::UiTable,
            ArtifactRole::Types => TargetKind::TypeDecl,
        }
    }

    /// Roles belonging to `kind`, in emission order.
    pub fn for_kind(kind: TargetKind) -> impl Iterator<Item = ArtifactRole> {
        ArtifactRole::iter().filter(move |role| role.kind() == kind)
    }
}

/// Run-level switches that shape what gets emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitOptions {
    pub dialect: Dialect,
    pub translations: bool,
    pub auto_relations: bool,
    pub use_metadata: bool,
    /// Target kinds to emit, in [`TargetKind`] order
    pub targets: Vec<TargetKind>,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            translations: true,
            auto_relations: false,
            use_metadata: true,
            targets: TargetKind::iter().collect(),
        }
    }
}

/// A generated file, held in memory until the plan is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub target_kind: TargetKind,
    /// Project-relative path with forward slashes
    pub path: String,
    #[serde(skip)]
    pub content: String,
    pub fingerprint: String,
}

impl Artifact {
    pub fn new(target_kind: TargetKind, path: String, content: String) -> Self {
        let fingerprint = fingerprint_bytes(content.as_bytes());
        Self {
            target_kind,
            path,
            content,
            fingerprint,
        }
    }
}

/// Builds every enabled artifact for one collection.
pub fn emit_collection(
    spec: &CollectionSpec,
    options: &EmitOptions,
    renderer: &Renderer,
) -> crate::error::ScaffoldResult<Vec<Artifact>> {
    let names = NameSet::resolve(&spec.layer, &spec.name);
    let ir = CollectionIr::build(spec, &names, options);
    let path_options = PathOptions {
        seed: spec.seed.is_some(),
    };

    let mut artifacts = Vec::new();
    for kind in &options.targets {
        for slot in artifact_paths(&names, *kind, &path_options) {
            let content = renderer.render(slot.role, &ir)?;
            artifacts.push(Artifact::new(*kind, slot.path, content));
        }
    }

    tracing::debug!(
        layer = %spec.layer,
        collection = %spec.name,
        artifacts = artifacts.len(),
        "emitted collection"
    );
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn target_kinds_use_kebab_names() {
        assert_eq!(TargetKind::StorageSchema.to_string(), "storage-schema");
        assert_eq!(TargetKind::from_str("ui-table").unwrap(), TargetKind::UiTable);
        assert_eq!(
            serde_json::to_string(&TargetKind::TypeDecl).unwrap(),
            "\"type-decl\""
        );
    }

    #[test]
    fn every_kind_owns_at_least_one_role() {
        for kind in TargetKind::iter() {
            assert!(ArtifactRole::for_kind(kind).next().is_some(), "{kind}");
        }
        assert_eq!(ArtifactRole::for_kind(TargetKind::ServerHandler).count(), 5);
    }
}
