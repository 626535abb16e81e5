//! Schema document, project config and their normalized forms.
//!
//! The `*Def` types mirror what users write on disk and are deliberately
//! permissive (types and areas stay strings) so that validation can report
//! every problem at once. The `*Spec` types are what the rest of the engine
//! consumes; they only exist after validation succeeded.

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::config::PartialFlags;

/// Flat, ordered map of field name to definition.
pub type SchemaDocument = IndexMap<String, FieldDef>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    /// One of the supported field types (`string`, `decimal`, `reference`, ...)
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub meta: FieldMetaDef,
    /// Target collection for `reference` fields: `name`, `layer/name` or `:external`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_target: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldMetaDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Form area: `main`, `sidebar` or `meta`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translatable: Option<bool>,
    /// Overrides the UI input component chosen from the field type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FieldType {
    String,
    Text,
    Number,
    Integer,
    Decimal,
    Boolean,
    Date,
    Datetime,
    Uuid,
    Json,
    Array,
    Repeater,
    Reference,
}

impl FieldType {
    pub fn is_textual(self) -> bool {
        matches!(self, FieldType::String | FieldType::Text)
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FieldArea {
    #[default]
    Main,
    Sidebar,
    Meta,
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    JsonSchema,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Dialect {
    #[default]
    Sqlite,
    Postgres,
    Mysql,
}

/// Where a `reference` field points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefTarget {
    /// Layer of the target; `None` for external references
    pub layer: Option<String>,
    pub collection: String,
    pub external: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMeta {
    pub required: bool,
    pub unique: bool,
    pub max_length: Option<u32>,
    pub label: String,
    pub area: FieldArea,
    pub default: Option<Value>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub translatable: bool,
    pub component: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    pub name: String,
    pub field_type: FieldType,
    pub meta: FieldMeta,
    pub ref_target: Option<RefTarget>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hierarchy {
    pub parent_field: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Seed {
    pub count: u32,
}

/// A validated collection, ready for naming and emission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSpec {
    pub name: String,
    pub layer: String,
    pub fields: Vec<FieldSpec>,
    pub hierarchy: Option<Hierarchy>,
    pub sortable: bool,
    pub seed: Option<Seed>,
}

impl CollectionSpec {
    pub fn has_translatable_fields(&self) -> bool {
        self.fields.iter().any(|field| field.meta.translatable)
    }

    pub fn key(&self) -> (String, String) {
        (self.layer.clone(), self.name.clone())
    }
}

// ---------------------------------------------------------------------------
// Project configuration documents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyDef {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub parent_field: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedDef {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub count: Option<i64>,
}

/// Collection-level options shared by the config file and the CLI.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionOptions {
    #[serde(default)]
    pub hierarchy: Option<HierarchyDef>,
    #[serde(default)]
    pub sortable: bool,
    #[serde(default)]
    pub seed: Option<SeedDef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionDef {
    pub name: String,
    /// Schema document path, relative to the config file
    #[serde(default)]
    pub fields_file: Option<PathBuf>,
    /// Inline schema document
    #[serde(default)]
    pub fields: Option<SchemaDocument>,
    #[serde(flatten)]
    pub options: CollectionOptions,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TargetDef {
    pub layer: String,
    #[serde(default)]
    pub collections: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfigDef {
    #[serde(default)]
    pub collections: Vec<CollectionDef>,
    #[serde(default)]
    pub targets: Vec<TargetDef>,
    #[serde(default)]
    pub dialect: Option<Dialect>,
    #[serde(default)]
    pub externals: Vec<String>,
    #[serde(default)]
    pub flags: PartialFlags,
}

/// A validated multi-collection project.
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    /// One spec per (layer, collection) pair listed in `targets`
    pub collections: Vec<CollectionSpec>,
    pub dialect: Dialect,
    pub externals: Vec<String>,
    pub flags: PartialFlags,
}

impl ProjectConfig {
    pub fn keys(&self) -> Vec<(String, String)> {
        self.collections.iter().map(CollectionSpec::key).collect()
    }
}
