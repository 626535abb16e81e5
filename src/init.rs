//! `crudkit init`: starter schema document or the JSON Schema describing the format.

use schemars::schema_for;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::{ScaffoldError, ScaffoldResult, ValidationIssue};
use crate::report::TextReport;
use crate::schema::SchemaDocument;
use crate::writer;

pub const DEFAULT_EXAMPLE_PATH: &str = "schemas/example.yaml";
pub const DEFAULT_JSON_SCHEMA_PATH: &str = "schemas/crudkit.schema.json";

/// Starter schema for a `products` collection.
pub const EXAMPLE_SCHEMA: &str = r#"# Generate with:
#   crudkit generate shop products --schema schemas/example.yaml
title:
  type: string
  meta:
    required: true
    maxLength: 120
    label: Title
description:
  type: text
  meta:
    translatable: true
price:
  type: decimal
  meta:
    precision: 10
    scale: 2
    area: sidebar
inStock:
  type: boolean
  meta:
    default: true
    area: sidebar
releasedOn:
  type: date
  meta:
    area: meta
category:
  type: reference
  refTarget: ":categories"
"#;

#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    pub output: Option<PathBuf>,
    pub json_schema: bool,
    pub force: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitReport {
    pub path: String,
    pub json_schema: bool,
    pub replaced: bool,
}

impl TextReport for InitReport {
    fn to_text(&self) -> String {
        let what = if self.json_schema {
            "JSON Schema"
        } else {
            "example schema"
        };
        let verb = if self.replaced { "replaced" } else { "wrote" };
        format!("{verb} {what} at {}\n", self.path)
    }
}

/// JSON Schema for schema documents, pretty-printed.
pub fn schema_document_json_schema() -> String {
    let schema = schema_for!(SchemaDocument);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

pub fn init(root: &Path, options: &InitOptions) -> ScaffoldResult<InitReport> {
    let default = if options.json_schema {
        DEFAULT_JSON_SCHEMA_PATH
    } else {
        DEFAULT_EXAMPLE_PATH
    };
    let relative = options
        .output
        .as_deref()
        .and_then(Path::to_str)
        .unwrap_or(default)
        .replace('\\', "/");
    let absolute = writer::resolve(root, &relative)?;

    let replaced = absolute.exists();
    if replaced && !options.force {
        return Err(ScaffoldError::validation(vec![
            ValidationIssue::new(&relative, "file already exists")
                .with_hint("re-run with --force to replace it"),
        ]));
    }

    let content = if options.json_schema {
        let mut json = schema_document_json_schema();
        json.push('\n');
        json
    } else {
        EXAMPLE_SCHEMA.to_string()
    };
    writer::write_atomic(&absolute, content.as_bytes())?;
    tracing::info!(path = %relative, json_schema = options.json_schema, "initialized");

    Ok(InitReport {
        path: relative,
        json_schema: options.json_schema,
        replaced,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CollectionOptions, FieldType, KnownCollections, validate_collection};
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    #[test]
    fn example_schema_validates() {
        let doc: SchemaDocument = serde_yaml::from_str(EXAMPLE_SCHEMA).unwrap();
        let mut known = KnownCollections::new();
        known.add_external("categories");
        let spec = validate_collection(
            "shop",
            "products",
            &doc,
            &CollectionOptions::default(),
            &known,
        )
        .unwrap();
        assert_eq!(spec.fields.len(), 6);
        assert_eq!(spec.fields[2].field_type, FieldType::Decimal);
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let dir = tempdir().unwrap();
        let options = InitOptions::default();
        let first = init(dir.path(), &options).unwrap();
        assert_eq!(first.path, DEFAULT_EXAMPLE_PATH);
        assert!(!first.replaced);

        let err = init(dir.path(), &options).unwrap_err();
        assert_matches!(err, ScaffoldError::Validation { .. });

        let forced = init(
            dir.path(),
            &InitOptions {
                force: true,
                ..InitOptions::default()
            },
        )
        .unwrap();
        assert!(forced.replaced);
    }

    #[test]
    fn json_schema_describes_field_definitions() {
        let dir = tempdir().unwrap();
        let report = init(
            dir.path(),
            &InitOptions {
                json_schema: true,
                ..InitOptions::default()
            },
        )
        .unwrap();
        let written = std::fs::read_to_string(dir.path().join(&report.path)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert!(written.contains("refTarget"));
        assert!(value.is_object());
    }

    #[test]
    fn output_cannot_escape_the_project() {
        let dir = tempdir().unwrap();
        let err = init(
            dir.path(),
            &InitOptions {
                output: Some(PathBuf::from("../outside.yaml")),
                ..InitOptions::default()
            },
        )
        .unwrap_err();
        assert_matches!(err, ScaffoldError::UnsafePath { .. });
    }
}
