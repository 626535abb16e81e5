//! Schema documents, project configs and their validation.
//!
//! ```text
//! schema file / config file → loader → *Def documents → validate → CollectionSpec
//! ```

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_project_config, load_schema_document};
pub use model::{
    CollectionOptions, CollectionSpec, Dialect, FieldArea, FieldDef, FieldMeta, FieldSpec,
    FieldType, HierarchyDef, ProjectConfig, ProjectConfigDef, RefTarget, SchemaDocument, SeedDef,
};
pub use validate::{
    KnownCollections, RESERVED_FIELD_NAMES, is_reserved, validate_collection, validate_project,
};
