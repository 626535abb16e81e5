//! Reading schema documents and project configs from disk.
//!
//! The format is picked from the file extension: `.json`, `.yaml`/`.yml`
//! and `.toml`.

use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

use super::model::{ProjectConfigDef, SchemaDocument};
use crate::error::{ScaffoldError, ScaffoldResult};

pub fn load_schema_document(path: &Path) -> ScaffoldResult<SchemaDocument> {
    let doc: SchemaDocument = parse_document(path)?;
    tracing::debug!(path = %path.display(), fields = doc.len(), "loaded schema document");
    Ok(doc)
}

/// Loads a project config and inlines every `fieldsFile` it references.
///
/// `fieldsFile` paths are resolved relative to the config file's directory.
pub fn load_project_config(path: &Path) -> ScaffoldResult<ProjectConfigDef> {
    let mut config: ProjectConfigDef = parse_document(path)?;
    let base = path.parent().map(Path::to_path_buf).unwrap_or_default();

    for collection in &mut config.collections {
        if collection.fields.is_some() {
            continue;
        }
        if let Some(fields_file) = &collection.fields_file {
            let resolved = resolve_relative(&base, fields_file);
            collection.fields = Some(load_schema_document(&resolved)?);
        }
    }

    tracing::debug!(
        path = %path.display(),
        collections = config.collections.len(),
        targets = config.targets.len(),
        "loaded project config"
    );
    Ok(config)
}

fn resolve_relative(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

pub(crate) fn parse_document<T: DeserializeOwned>(path: &Path) -> ScaffoldResult<T> {
    if !path.exists() {
        return Err(ScaffoldError::Parse {
            path: path.to_path_buf(),
            reason: "file does not exist".to_string(),
        });
    }
    let contents = fs::read_to_string(path).map_err(|e| ScaffoldError::io(path, e))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parse_err = |reason: String| ScaffoldError::Parse {
        path: path.to_path_buf(),
        reason,
    };

    match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents).map_err(|e| parse_err(e.to_string())),
        "json" => serde_json::from_str(&contents).map_err(|e| parse_err(e.to_string())),
        "toml" => toml::from_str(&contents).map_err(|e| parse_err(e.to_string())),
        other => Err(parse_err(format!("unsupported extension '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    #[test]
    fn loads_yaml_and_toml_schemas_alike() {
        let dir = tempdir().unwrap();
        let yaml = dir.path().join("products.yaml");
        fs::write(
            &yaml,
            "title:\n  type: string\n  meta:\n    required: true\nprice:\n  type: decimal\n",
        )
        .unwrap();
        let toml_path = dir.path().join("products.toml");
        fs::write(
            &toml_path,
            "[title]\ntype = \"string\"\nmeta = { required = true }\n\n[price]\ntype = \"decimal\"\n",
        )
        .unwrap();

        let from_yaml = load_schema_document(&yaml).unwrap();
        let from_toml = load_schema_document(&toml_path).unwrap();
        assert_eq!(from_yaml, from_toml);
        assert_eq!(from_yaml["title"].meta.required, Some(true));
    }

    #[test]
    fn fields_file_is_resolved_next_to_the_config() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("schemas")).unwrap();
        fs::write(
            dir.path().join("schemas/products.json"),
            r#"{"title": {"type": "string"}}"#,
        )
        .unwrap();
        let config = dir.path().join("crudkit.config.json");
        fs::write(
            &config,
            r#"{
                "collections": [{"name": "products", "fieldsFile": "schemas/products.json", "sortable": true}],
                "targets": [{"layer": "shop", "collections": ["products"]}],
                "dialect": "postgres",
                "flags": {"autoRelations": true}
            }"#,
        )
        .unwrap();

        let loaded = load_project_config(&config).unwrap();
        let fields = loaded.collections[0].fields.as_ref().unwrap();
        assert!(fields.contains_key("title"));
        assert!(loaded.collections[0].options.sortable);
        assert_eq!(loaded.flags.auto_relations, Some(true));
    }

    #[test]
    fn unsupported_extension_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("schema.ini");
        fs::write(&path, "title=string").unwrap();
        assert_matches!(
            load_schema_document(&path),
            Err(ScaffoldError::Parse { reason, .. }) if reason.contains("ini")
        );
    }

    #[test]
    fn missing_file_is_reported_with_its_path() {
        let err = load_schema_document(Path::new("/nonexistent/schema.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/schema.json"));
    }
}
