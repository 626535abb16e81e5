//! Exhaustive validation of schema documents and project configs.
//!
//! Nothing here touches the filesystem. Every check appends to a shared issue
//! list instead of returning early, so one run reports the whole defect list.

use convert_case::{Case, Casing};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use strum::IntoEnumIterator;

use super::model::{
    CollectionOptions, CollectionSpec, FieldArea, FieldDef, FieldMeta, FieldSpec, FieldType,
    Hierarchy, ProjectConfig, ProjectConfigDef, RefTarget, SchemaDocument, Seed,
};
use crate::error::{ScaffoldError, ScaffoldResult, ValidationIssue};

/// Every name the engine may inject into a collection.
///
/// The set is closed: a name stays reserved even for collections that do not
/// inject it (e.g. `order` on a non-sortable collection).
pub const RESERVED_FIELD_NAMES: &[&str] = &[
    "id",
    "teamId",
    "owner",
    "createdAt",
    "updatedAt",
    "createdBy",
    "updatedBy",
    "parentId",
    "path",
    "depth",
    "order",
    "translations",
];

pub const DEFAULT_PARENT_FIELD: &str = "parentId";
pub const DEFAULT_SEED_COUNT: u32 = 10;
const MAX_SEED_COUNT: i64 = 1000;
const MAX_DECIMAL_PRECISION: i64 = 65;

static FIELD_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("field name pattern"));
static COLLECTION_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-zA-Z0-9_-]*$").expect("collection name pattern"));

/// Collections a `refTarget` may point at.
#[derive(Debug, Clone, Default)]
pub struct KnownCollections {
    internal: HashSet<(String, String)>,
    externals: HashSet<String>,
}

impl KnownCollections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_collection(&mut self, layer: &str, collection: &str) {
        self.internal
            .insert((layer.to_string(), collection.to_string()));
    }

    pub fn add_external(&mut self, name: &str) {
        self.externals.insert(name.trim_start_matches(':').to_string());
    }

    pub fn merge(&mut self, other: &KnownCollections) {
        self.internal.extend(other.internal.iter().cloned());
        self.externals.extend(other.externals.iter().cloned());
    }

    fn resolve(&self, from_layer: &str, raw: &str) -> Option<RefTarget> {
        if let Some(name) = raw.strip_prefix(':') {
            return COLLECTION_NAME.is_match(name).then(|| RefTarget {
                layer: None,
                collection: name.to_string(),
                external: true,
            });
        }
        if let Some((layer, name)) = raw.split_once('/') {
            return self
                .internal
                .contains(&(layer.to_string(), name.to_string()))
                .then(|| RefTarget {
                    layer: Some(layer.to_string()),
                    collection: name.to_string(),
                    external: false,
                });
        }
        if self
            .internal
            .contains(&(from_layer.to_string(), raw.to_string()))
        {
            return Some(RefTarget {
                layer: Some(from_layer.to_string()),
                collection: raw.to_string(),
                external: false,
            });
        }
        self.externals.contains(raw).then(|| RefTarget {
            layer: None,
            collection: raw.to_string(),
            external: true,
        })
    }
}

/// Validates a single collection's schema document.
///
/// The collection itself is always a valid reference target.
pub fn validate_collection(
    layer: &str,
    name: &str,
    doc: &SchemaDocument,
    options: &CollectionOptions,
    known: &KnownCollections,
) -> ScaffoldResult<CollectionSpec> {
    let mut known = known.clone();
    known.add_collection(layer, name);

    let mut issues = Vec::new();
    let spec = check_collection(layer, name, doc, options, &known, &mut issues);
    match spec {
        Some(spec) if issues.is_empty() => Ok(spec),
        _ => Err(ScaffoldError::validation(issues)),
    }
}

/// Validates a whole project config; `extra` holds collections known from
/// outside the config (the manifest).
pub fn validate_project(
    def: &ProjectConfigDef,
    extra: &KnownCollections,
) -> ScaffoldResult<ProjectConfig> {
    let mut issues = Vec::new();

    let mut declared = HashMap::new();
    for (index, collection) in def.collections.iter().enumerate() {
        let loc = format!("collections[{index}]");
        if !COLLECTION_NAME.is_match(&collection.name) {
            issues.push(invalid_collection_name(&loc, &collection.name));
        }
        if declared.insert(collection.name.clone(), collection).is_some() {
            issues.push(ValidationIssue::new(
                &loc,
                format!("collection '{}' is declared more than once", collection.name),
            ));
        }
        if collection.fields.is_none() {
            issues.push(
                ValidationIssue::new(&loc, "collection has neither `fields` nor `fieldsFile`")
                    .with_hint("point fieldsFile at a schema document"),
            );
        }
    }

    let mut known = extra.clone();
    for external in &def.externals {
        known.add_external(external);
    }

    let mut pairs = Vec::new();
    let mut seen_pairs = HashSet::new();
    for (t_index, target) in def.targets.iter().enumerate() {
        let loc = format!("targets[{t_index}]");
        if !COLLECTION_NAME.is_match(&target.layer) {
            issues.push(ValidationIssue::new(
                format!("{loc}.layer"),
                format!("'{}' is not a valid layer name", target.layer),
            ));
        }
        if target.collections.is_empty() {
            issues.push(ValidationIssue::new(&loc, "target lists no collections"));
        }
        for (c_index, name) in target.collections.iter().enumerate() {
            let c_loc = format!("{loc}.collections[{c_index}]");
            if !declared.contains_key(name) {
                issues.push(
                    ValidationIssue::new(&c_loc, format!("unknown collection '{name}'"))
                        .with_hint("declare it under `collections`"),
                );
                continue;
            }
            if !seen_pairs.insert((target.layer.clone(), name.clone())) {
                issues.push(ValidationIssue::new(
                    &c_loc,
                    format!("collection '{name}' appears twice in layer '{}'", target.layer),
                ));
                continue;
            }
            known.add_collection(&target.layer, name);
            pairs.push((target.layer.clone(), name.clone()));
        }
    }

    let mut collections = Vec::new();
    for (layer, name) in &pairs {
        let collection = declared[name];
        let Some(fields) = collection.fields.as_ref() else {
            continue;
        };
        if let Some(spec) =
            check_collection(layer, name, fields, &collection.options, &known, &mut issues)
        {
            collections.push(spec);
        }
    }

    if !issues.is_empty() {
        return Err(ScaffoldError::validation(issues));
    }

    Ok(ProjectConfig {
        collections,
        dialect: def.dialect.unwrap_or_default(),
        externals: def.externals.clone(),
        flags: def.flags.clone(),
    })
}

/// Normalized form used for collision checks: `team_id` == `teamId`.
pub fn collision_key(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

pub fn is_reserved(name: &str) -> bool {
    let key = collision_key(name);
    RESERVED_FIELD_NAMES
        .iter()
        .any(|reserved| collision_key(reserved) == key)
}

fn invalid_collection_name(loc: &str, name: &str) -> ValidationIssue {
    ValidationIssue::new(loc, format!("'{name}' is not a valid collection name"))
        .with_hint("use lowercase letters, digits, '-' or '_', starting with a letter")
}

fn check_collection(
    layer: &str,
    name: &str,
    doc: &SchemaDocument,
    options: &CollectionOptions,
    known: &KnownCollections,
    issues: &mut Vec<ValidationIssue>,
) -> Option<CollectionSpec> {
    let prefix = format!("{layer}/{name}");
    let before = issues.len();

    if !COLLECTION_NAME.is_match(layer) {
        issues.push(ValidationIssue::new(
            &prefix,
            format!("'{layer}' is not a valid layer name"),
        ));
    }
    if !COLLECTION_NAME.is_match(name) {
        issues.push(invalid_collection_name(&prefix, name));
    }
    if doc.is_empty() {
        issues.push(ValidationIssue::new(&prefix, "schema declares no fields"));
    }

    let hierarchy = options
        .hierarchy
        .as_ref()
        .filter(|h| h.enabled)
        .map(|h| Hierarchy {
            parent_field: h
                .parent_field
                .clone()
                .unwrap_or_else(|| DEFAULT_PARENT_FIELD.to_string()),
        });
    if let Some(h) = &hierarchy {
        let loc = format!("{prefix}.hierarchy.parentField");
        if !FIELD_NAME.is_match(&h.parent_field) {
            issues.push(ValidationIssue::new(
                &loc,
                format!("'{}' is not a valid field name", h.parent_field),
            ));
        } else if collision_key(&h.parent_field) != collision_key(DEFAULT_PARENT_FIELD)
            && is_reserved(&h.parent_field)
        {
            issues.push(ValidationIssue::new(
                &loc,
                format!("'{}' collides with a system field", h.parent_field),
            ));
        }
    }

    let seed = match options.seed.as_ref().filter(|s| s.enabled) {
        None => None,
        Some(seed) => {
            let count = seed.count.unwrap_or(i64::from(DEFAULT_SEED_COUNT));
            if !(1..=MAX_SEED_COUNT).contains(&count) {
                issues.push(ValidationIssue::new(
                    format!("{prefix}.seed.count"),
                    format!("seed count {count} is outside 1..={MAX_SEED_COUNT}"),
                ));
            }
            Some(Seed {
                count: count.clamp(1, MAX_SEED_COUNT) as u32,
            })
        }
    };

    let mut seen = HashSet::new();
    let mut fields = Vec::with_capacity(doc.len());
    for (field_name, def) in doc {
        let loc = format!("{prefix}.{field_name}");
        if !FIELD_NAME.is_match(field_name) {
            issues.push(
                ValidationIssue::new(&loc, "field name is not a valid identifier")
                    .with_hint("start with a letter; use letters, digits and '_'"),
            );
        }
        if is_reserved(field_name) {
            issues.push(
                ValidationIssue::new(&loc, format!("'{field_name}' is a reserved system field"))
                    .with_hint("system fields are injected automatically; rename this field"),
            );
        }
        if let Some(h) = &hierarchy {
            if collision_key(field_name) == collision_key(&h.parent_field) {
                issues.push(ValidationIssue::new(
                    &loc,
                    format!("'{field_name}' collides with the hierarchy parent field"),
                ));
            }
        }
        if !seen.insert(collision_key(field_name)) {
            issues.push(ValidationIssue::new(
                &loc,
                format!("'{field_name}' duplicates another field name"),
            ));
        }

        if let Some(field) = check_field(layer, field_name, def, known, &loc, issues) {
            fields.push(field);
        }
    }

    (issues.len() == before).then(|| CollectionSpec {
        name: name.to_string(),
        layer: layer.to_string(),
        fields,
        hierarchy,
        sortable: options.sortable,
        seed,
    })
}

fn check_field(
    layer: &str,
    name: &str,
    def: &FieldDef,
    known: &KnownCollections,
    loc: &str,
    issues: &mut Vec<ValidationIssue>,
) -> Option<FieldSpec> {
    let before = issues.len();
    let Ok(field_type) = FieldType::from_str(def.kind.trim().to_ascii_lowercase().as_str()) else {
        let valid = FieldType::iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        issues.push(
            ValidationIssue::new(format!("{loc}.type"), format!("unknown type '{}'", def.kind))
                .with_hint(format!("expected one of: {valid}")),
        );
        return None;
    };
    let meta = &def.meta;

    let ref_target = match (field_type, def.ref_target.as_deref()) {
        (FieldType::Reference, None) => {
            issues.push(ValidationIssue::new(
                format!("{loc}.refTarget"),
                "reference fields need a refTarget",
            ));
            None
        }
        (FieldType::Reference, Some(raw)) => {
            let resolved = known.resolve(layer, raw);
            if resolved.is_none() {
                issues.push(
                    ValidationIssue::new(
                        format!("{loc}.refTarget"),
                        format!("'{raw}' does not name a known collection"),
                    )
                    .with_hint("add it to the project config or declare it with --external"),
                );
            }
            resolved
        }
        (_, Some(_)) => {
            issues.push(ValidationIssue::new(
                format!("{loc}.refTarget"),
                "refTarget is only valid on reference fields",
            ));
            None
        }
        (_, None) => None,
    };

    if field_type != FieldType::Decimal {
        for (key, value) in [("precision", meta.precision), ("scale", meta.scale)] {
            if value.is_some() {
                issues.push(ValidationIssue::new(
                    format!("{loc}.meta.{key}"),
                    format!("{key} is only valid on decimal fields"),
                ));
            }
        }
    } else {
        if let Some(precision) = meta.precision {
            if !(1..=MAX_DECIMAL_PRECISION).contains(&precision) {
                issues.push(ValidationIssue::new(
                    format!("{loc}.meta.precision"),
                    format!("precision {precision} is outside 1..={MAX_DECIMAL_PRECISION}"),
                ));
            }
        }
        match (meta.precision, meta.scale) {
            (_, Some(scale)) if scale < 0 => issues.push(ValidationIssue::new(
                format!("{loc}.meta.scale"),
                "scale must not be negative",
            )),
            (Some(precision), Some(scale)) if scale > precision => {
                issues.push(ValidationIssue::new(
                    format!("{loc}.meta.scale"),
                    format!("scale {scale} exceeds precision {precision}"),
                ))
            }
            (None, Some(_)) => issues.push(
                ValidationIssue::new(format!("{loc}.meta.scale"), "scale without precision")
                    .with_hint("set meta.precision"),
            ),
            _ => {}
        }
    }

    if let Some(max_length) = meta.max_length {
        if !field_type.is_textual() {
            issues.push(ValidationIssue::new(
                format!("{loc}.meta.maxLength"),
                "maxLength is only valid on string and text fields",
            ));
        } else if max_length < 1 {
            issues.push(ValidationIssue::new(
                format!("{loc}.meta.maxLength"),
                "maxLength must be at least 1",
            ));
        } else if u32::try_from(max_length).is_err() {
            issues.push(ValidationIssue::new(
                format!("{loc}.meta.maxLength"),
                format!("maxLength must be at most {}", u32::MAX),
            ));
        }
    }

    let translatable = meta.translatable.unwrap_or(false);
    if translatable && !field_type.is_textual() {
        issues.push(ValidationIssue::new(
            format!("{loc}.meta.translatable"),
            "only string and text fields can be translatable",
        ));
    }

    let area = match meta.area.as_deref() {
        None => FieldArea::default(),
        Some(raw) => FieldArea::from_str(raw).unwrap_or_else(|_| {
            issues.push(
                ValidationIssue::new(format!("{loc}.meta.area"), format!("unknown area '{raw}'"))
                    .with_hint("expected main, sidebar or meta"),
            );
            FieldArea::default()
        }),
    };

    if let Some(component) = &meta.component {
        if component.trim().is_empty() {
            issues.push(ValidationIssue::new(
                format!("{loc}.meta.component"),
                "component override must not be empty",
            ));
        }
    }

    if let Some(default) = &meta.default {
        if !default_matches(field_type, default) {
            issues.push(ValidationIssue::new(
                format!("{loc}.meta.default"),
                format!("default {default} does not fit a {field_type} field"),
            ));
        }
    }

    (issues.len() == before).then(|| FieldSpec {
        name: name.to_string(),
        field_type,
        meta: FieldMeta {
            required: meta.required.unwrap_or(false),
            unique: meta.unique.unwrap_or(false),
            max_length: meta.max_length.and_then(|v| u32::try_from(v).ok()),
            label: meta
                .label
                .clone()
                .unwrap_or_else(|| name.to_case(Case::Title)),
            area,
            default: meta.default.clone(),
            precision: meta.precision.map(|v| v as u32),
            scale: meta.scale.map(|v| v as u32),
            translatable,
            component: meta.component.clone(),
        },
        ref_target,
    })
}

fn default_matches(field_type: FieldType, value: &Value) -> bool {
    use FieldType::*;
    match (field_type, value) {
        (_, Value::Null) => true,
        (String | Text | Uuid | Date | Datetime | Reference, Value::String(_)) => true,
        (Number | Decimal, Value::Number(_)) => true,
        (Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
        (Boolean, Value::Bool(_)) => true,
        (Json, Value::Object(_)) => true,
        (Array | Repeater, Value::Array(_)) => true,
        _ => false,
    }
}
