//! Intermediate representation shared by every renderer.
//!
//! A [`CollectionIr`] is built once per collection and serialized into the
//! tera context. Anything that needs a decision (which columns exist, which
//! builder a column uses, which form area a field lands in) is decided here so
//! templates only iterate and print.

use convert_case::{Case, Casing};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;

use super::EmitOptions;
use super::type_map::{self, SeedPolicy};
use crate::naming::NameSet;
use crate::schema::{CollectionSpec, Dialect, FieldArea, FieldSpec, FieldType};

const DEFAULT_DECIMAL: (u32, u32) = (10, 2);
const MYSQL_VARCHAR_LENGTH: u32 = 255;
const ID_LENGTH: u32 = 36;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnOption {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnIr {
    /// Property name in the table object
    pub name: String,
    /// Storage column name (snake case)
    pub column_name: String,
    pub builder: String,
    pub options: Vec<ColumnOption>,
    /// Chained calls without the leading dot, e.g. `notNull()`
    pub modifiers: Vec<String>,
    pub comment: Option<String>,
    pub system: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldIr {
    pub name: String,
    pub label: String,
    /// Label as a quoted TypeScript string
    pub label_ts: String,
    /// Label escaped for a double-quoted HTML attribute
    pub label_attr: String,
    pub ts_type: String,
    pub required: bool,
    pub component: String,
    pub attrs: String,
    pub area: FieldArea,
    /// Wrapped in a translations input
    pub translatable: bool,
    /// TypeScript literal for the empty form state
    pub form_default: String,
    pub max_length: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaIr {
    pub area: FieldArea,
    pub fields: Vec<FieldIr>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeMemberIr {
    pub name: String,
    pub ts_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationIr {
    pub field: String,
    pub relation: String,
    pub target_table: String,
    /// Module the target table would be imported from; `None` for externals
    pub target_module: Option<String>,
    pub external: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedValueIr {
    pub name: String,
    pub expr: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedIr {
    pub count: u32,
    pub const_name: String,
    pub values: Vec<SeedValueIr>,
}

/// Exported function names of the data-access module.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationsIr {
    pub get_all: String,
    pub get_by_ids: String,
    pub create: String,
    pub update: String,
    pub delete: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionIr {
    pub names: NameSet,
    pub dialect: Dialect,
    pub core_module: String,
    pub table_fn: String,
    /// Column builders to import from `core_module`, sorted
    pub builders: Vec<String>,
    pub columns: Vec<ColumnIr>,
    pub fields: Vec<FieldIr>,
    pub areas: Vec<AreaIr>,
    pub type_members: Vec<TypeMemberIr>,
    /// Members left out of the `New<Type>` shape
    pub omitted_on_create: Vec<String>,
    /// Feature columns the database fills in when absent
    pub defaulted_on_create: Vec<String>,
    pub relations: Vec<RelationIr>,
    pub seed: Option<SeedIr>,
    pub operations: OperationsIr,
    pub metadata: bool,
    pub sortable: bool,
    pub parent_field: Option<String>,
    pub translations: bool,
    pub translatable_fields: Vec<String>,
}

impl CollectionIr {
    pub fn build(spec: &CollectionSpec, names: &NameSet, options: &EmitOptions) -> Self {
        let dialect = options.dialect;
        let translations = options.translations && spec.has_translatable_fields();

        let mut columns = vec![
            id_column(dialect),
            text_column(dialect, "teamId", true),
            text_column(dialect, "owner", true),
        ];
        columns.extend(spec.fields.iter().map(|field| user_column(field, dialect)));
        if let Some(hierarchy) = &spec.hierarchy {
            columns.push(text_column(dialect, &hierarchy.parent_field, false));
            columns.push(system_column(
                "path",
                sized(dialect, "text"),
                vec!["notNull()".into(), "default('/')".into()],
            ));
            columns.push(system_column(
                "depth",
                int_builder(dialect),
                vec!["notNull()".into(), "default(0)".into()],
            ));
        }
        if spec.sortable {
            columns.push(system_column(
                "order",
                int_builder(dialect),
                vec!["notNull()".into(), "default(0)".into()],
            ));
        }
        if translations {
            let mut column = user_column(&translations_field(), dialect);
            column.system = true;
            columns.push(column);
        }
        if options.use_metadata {
            columns.push(timestamp_column(dialect, "createdAt", false));
            columns.push(timestamp_column(dialect, "updatedAt", true));
            columns.push(text_column(dialect, "createdBy", true));
            columns.push(text_column(dialect, "updatedBy", true));
        }

        let builders: BTreeSet<String> = columns.iter().map(|c| c.builder.clone()).collect();
        let (core_module, table_fn) = type_map::dialect_module(dialect);

        let fields: Vec<FieldIr> = spec
            .fields
            .iter()
            .map(|field| field_ir(field, translations))
            .collect();
        let areas = [FieldArea::Main, FieldArea::Sidebar, FieldArea::Meta]
            .into_iter()
            .filter_map(|area| {
                let in_area: Vec<FieldIr> =
                    fields.iter().filter(|f| f.area == area).cloned().collect();
                (!in_area.is_empty()).then_some(AreaIr {
                    area,
                    fields: in_area,
                })
            })
            .collect();

        let mut omitted_on_create = vec!["id".to_string(), "teamId".into(), "owner".into()];
        if options.use_metadata {
            omitted_on_create.extend(
                ["createdAt", "updatedAt", "createdBy", "updatedBy"].map(String::from),
            );
        }

        let defaulted_on_create = columns
            .iter()
            .filter(|c| c.system && !omitted_on_create.contains(&c.name))
            .map(|c| c.name.clone())
            .collect();

        let relations = if options.auto_relations {
            spec.fields
                .iter()
                .filter_map(|field| relation_ir(field, names))
                .collect()
        } else {
            Vec::new()
        };

        let seed = spec.seed.map(|seed| SeedIr {
            count: seed.count,
            const_name: format!("{}_SEED_COUNT", names.table.to_case(Case::UpperSnake)),
            values: spec.fields.iter().map(seed_value).collect(),
        });

        Self {
            names: names.clone(),
            dialect,
            core_module: core_module.to_string(),
            table_fn: table_fn.to_string(),
            builders: builders.into_iter().collect(),
            type_members: columns.iter().map(|c| type_member(c, spec)).collect(),
            columns,
            fields,
            areas,
            omitted_on_create,
            defaulted_on_create,
            relations,
            seed,
            operations: OperationsIr {
                get_all: format!("getAll{}", names.ui_prefix),
                get_by_ids: format!("get{}ByIds", names.ui_prefix),
                create: format!("create{}", names.type_name),
                update: format!("update{}", names.type_name),
                delete: format!("delete{}", names.type_name),
            },
            metadata: options.use_metadata,
            sortable: spec.sortable,
            parent_field: spec.hierarchy.as_ref().map(|h| h.parent_field.clone()),
            translations,
            translatable_fields: spec
                .fields
                .iter()
                .filter(|f| translations && f.meta.translatable)
                .map(|f| f.name.clone())
                .collect(),
        }
    }
}

fn system_column(name: &str, builder: (String, Vec<ColumnOption>), modifiers: Vec<String>) -> ColumnIr {
    let (builder, options) = builder;
    ColumnIr {
        name: name.to_string(),
        column_name: name.to_case(Case::Snake),
        builder,
        options,
        modifiers,
        comment: None,
        system: true,
    }
}

fn sized(dialect: Dialect, builder: &str) -> (String, Vec<ColumnOption>) {
    let options = if type_map::requires_length(dialect, builder) {
        vec![option("length", ID_LENGTH)]
    } else {
        Vec::new()
    };
    (builder.to_string(), options)
}

fn id_builder(dialect: Dialect) -> (String, Vec<ColumnOption>) {
    match dialect {
        Dialect::Mysql => sized(dialect, "varchar"),
        _ => sized(dialect, "text"),
    }
}

fn int_builder(dialect: Dialect) -> (String, Vec<ColumnOption>) {
    match dialect {
        Dialect::Mysql => ("int".to_string(), Vec::new()),
        _ => ("integer".to_string(), Vec::new()),
    }
}

fn id_column(dialect: Dialect) -> ColumnIr {
    system_column(
        "id",
        id_builder(dialect),
        vec!["primaryKey()".into(), "$defaultFn(() => nanoid())".into()],
    )
}

fn text_column(dialect: Dialect, name: &str, not_null: bool) -> ColumnIr {
    let modifiers = if not_null {
        vec!["notNull()".to_string()]
    } else {
        Vec::new()
    };
    system_column(name, id_builder(dialect), modifiers)
}

fn timestamp_column(dialect: Dialect, name: &str, on_update: bool) -> ColumnIr {
    let builder = match dialect {
        Dialect::Sqlite => (
            "integer".to_string(),
            vec![option("mode", "'timestamp'")],
        ),
        Dialect::Postgres => ("timestamp".to_string(), Vec::new()),
        Dialect::Mysql => ("datetime".to_string(), Vec::new()),
    };
    let mut modifiers = vec![
        "notNull()".to_string(),
        "$defaultFn(() => new Date())".to_string(),
    ];
    if on_update {
        modifiers.push("$onUpdate(() => new Date())".to_string());
    }
    system_column(name, builder, modifiers)
}

fn option(key: &str, value: impl ToString) -> ColumnOption {
    ColumnOption {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn translations_field() -> FieldSpec {
    FieldSpec {
        name: "translations".to_string(),
        field_type: FieldType::Json,
        meta: crate::schema::FieldMeta {
            required: false,
            unique: false,
            max_length: None,
            label: "Translations".to_string(),
            area: FieldArea::Meta,
            default: None,
            precision: None,
            scale: None,
            translatable: false,
            component: None,
        },
        ref_target: None,
    }
}

fn decimal_digits(field: &FieldSpec) -> (u32, u32) {
    match field.meta.precision {
        Some(precision) => (precision, field.meta.scale.unwrap_or(0)),
        None => DEFAULT_DECIMAL,
    }
}

fn user_column(field: &FieldSpec, dialect: Dialect) -> ColumnIr {
    let mapping = type_map::lookup(field.field_type);
    let shape = mapping.column(dialect);
    let mut options = Vec::new();
    let mut comment = None;

    if let Some(mode) = shape.mode {
        options.push(option("mode", format!("'{mode}'")));
    }
    match field.field_type {
        FieldType::Decimal => {
            let (precision, scale) = decimal_digits(field);
            if dialect == Dialect::Sqlite {
                comment = Some(format!("precision: {precision}, scale: {scale}"));
            } else {
                options.push(option("precision", precision));
                options.push(option("scale", scale));
            }
        }
        FieldType::Reference => {
            if type_map::requires_length(dialect, shape.builder) {
                options.push(option("length", ID_LENGTH));
            }
            if let Some(target) = &field.ref_target {
                comment = Some(match &target.layer {
                    Some(layer) => format!(
                        "references {}.id",
                        NameSet::resolve(layer, &target.collection).table
                    ),
                    None => format!("references external '{}'", target.collection),
                });
            }
        }
        _ => {
            if let Some(length) = field.meta.max_length {
                options.push(option("length", length));
            } else if type_map::requires_length(dialect, shape.builder) {
                let length = if field.field_type == FieldType::Uuid {
                    ID_LENGTH
                } else {
                    MYSQL_VARCHAR_LENGTH
                };
                options.push(option("length", length));
            }
        }
    }

    let mut modifiers = Vec::new();
    if field.meta.required {
        modifiers.push("notNull()".to_string());
    }
    if field.meta.unique {
        modifiers.push("unique()".to_string());
    }
    if mapping.column_default {
        if let Some(default) = &field.meta.default {
            modifiers.push(format!("default({})", ts_literal(default)));
        }
    }

    ColumnIr {
        name: field.name.clone(),
        column_name: field.name.to_case(Case::Snake),
        builder: shape.builder.to_string(),
        options,
        modifiers,
        comment,
        system: false,
    }
}

fn field_ir(field: &FieldSpec, translations: bool) -> FieldIr {
    let mapping = type_map::lookup(field.field_type);
    let mut attrs = mapping.input_attrs.to_string();
    if let Some(target) = &field.ref_target {
        let collection = match &target.layer {
            Some(layer) => format!("{layer}/{}", target.collection),
            None => format!(":{}", target.collection),
        };
        attrs = format!("collection=\"{collection}\"");
    }
    if let Some(length) = field.meta.max_length {
        let max = format!(":maxlength=\"{length}\"");
        attrs = if attrs.is_empty() {
            max
        } else {
            format!("{attrs} {max}")
        };
    }

    FieldIr {
        name: field.name.clone(),
        label: field.meta.label.clone(),
        label_ts: ts_string(&field.meta.label),
        label_attr: html_attr(&field.meta.label),
        ts_type: mapping.ts_type.to_string(),
        required: field.meta.required,
        component: field
            .meta
            .component
            .clone()
            .unwrap_or_else(|| mapping.input.to_string()),
        attrs,
        area: field.meta.area,
        translatable: translations && field.meta.translatable,
        form_default: field
            .meta
            .default
            .as_ref()
            .map(ts_literal)
            .unwrap_or_else(|| mapping.form_fallback.to_string()),
        max_length: field.meta.max_length,
    }
}

fn type_member(column: &ColumnIr, spec: &CollectionSpec) -> TypeMemberIr {
    let ts_type = match spec.fields.iter().find(|f| f.name == column.name) {
        Some(field) => {
            let base = type_map::lookup(field.field_type).ts_type;
            if field.meta.required {
                base.to_string()
            } else {
                format!("{base} | null")
            }
        }
        None => match column.name.as_str() {
            "createdAt" | "updatedAt" => "Date".to_string(),
            "depth" | "order" => "number".to_string(),
            "translations" => "Record<string, Record<string, string>> | null".to_string(),
            name if spec.hierarchy.as_ref().is_some_and(|h| h.parent_field == name) => {
                "string | null".to_string()
            }
            _ => "string".to_string(),
        },
    };
    TypeMemberIr {
        name: column.name.clone(),
        ts_type,
    }
}

fn relation_ir(field: &FieldSpec, names: &NameSet) -> Option<RelationIr> {
    let target = field.ref_target.as_ref()?;
    let relation = field
        .name
        .strip_suffix("Id")
        .filter(|stem| !stem.is_empty())
        .unwrap_or(&field.name)
        .to_string();
    Some(match &target.layer {
        Some(layer) => {
            let target_names = NameSet::resolve(layer, &target.collection);
            let target_module = if *layer == names.layer {
                format!("../{}/schema", target_names.kebab)
            } else {
                format!(
                    "../../../../{layer}/server/database/{}/schema",
                    target_names.kebab
                )
            };
            RelationIr {
                field: field.name.clone(),
                relation,
                target_table: target_names.table_export,
                target_module: Some(target_module),
                external: false,
            }
        }
        None => RelationIr {
            field: field.name.clone(),
            relation,
            target_table: target.collection.to_case(Case::Camel),
            target_module: None,
            external: true,
        },
    })
}

fn seed_value(field: &FieldSpec) -> SeedValueIr {
    let label = field.meta.label.replace(['`', '$', '\\'], "");
    let mut expr = match type_map::lookup(field.field_type).seed {
        SeedPolicy::Label => format!("`{label} ${{n}}`"),
        SeedPolicy::Paragraph => format!("`{label} ${{n}}: sample text`"),
        SeedPolicy::Counter => "n".to_string(),
        SeedPolicy::Fraction => {
            let (_, scale) = decimal_digits(field);
            format!("Number((n * 1.25).toFixed({scale}))")
        }
        SeedPolicy::Parity => "n % 2 === 0".to_string(),
        SeedPolicy::CalendarDay => {
            "`2024-01-${String(((n - 1) % 28) + 1).padStart(2, '0')}`".to_string()
        }
        SeedPolicy::Timestamp => "new Date(Date.UTC(2024, 0, 1) + (n - 1) * 86400000)".to_string(),
        SeedPolicy::Uuid => "`00000000-0000-4000-8000-${String(n).padStart(12, '0')}`".to_string(),
        SeedPolicy::EmptyObject => "{}".to_string(),
        SeedPolicy::EmptyList => "[]".to_string(),
        SeedPolicy::Placeholder if field.meta.required => "`seed-${n}`".to_string(),
        SeedPolicy::Placeholder => "null".to_string(),
    };
    if let Some(length) = field.meta.max_length {
        if field.field_type.is_textual() {
            expr = format!("{expr}.slice(0, {length})");
        }
    }
    SeedValueIr {
        name: field.name.clone(),
        expr,
    }
}

/// JSON values are valid TypeScript literals; strings use single quotes.
fn ts_literal(value: &Value) -> String {
    match value {
        Value::String(s) => ts_string(s),
        other => other.to_string(),
    }
}

fn ts_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}

fn html_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\n' | '\r' => out.push(' '),
            other => out.push(other),
        }
    }
    out
}
