//! The closed `FieldType` lookup table.
//!
//! Every per-type decision the renderers need lives in one [`TypeMapping`]
//! row: the TypeScript type, the UI input, the form fallback value, the seed
//! policy and the column builder for each dialect. Supporting a new field
//! type means adding a variant to [`FieldType`] and one row here.

use crate::schema::{Dialect, FieldType};

/// Drizzle column builder plus the `mode` option it needs, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnShape {
    pub builder: &'static str,
    pub mode: Option<&'static str>,
}

const fn shape(builder: &'static str) -> ColumnShape {
    ColumnShape {
        builder,
        mode: None,
    }
}

const fn shape_mode(builder: &'static str, mode: &'static str) -> ColumnShape {
    ColumnShape {
        builder,
        mode: Some(mode),
    }
}

/// Deterministic value a seed row gets for a field, keyed by 1-based row `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedPolicy {
    Label,
    Paragraph,
    Counter,
    Fraction,
    Parity,
    CalendarDay,
    Timestamp,
    Uuid,
    EmptyObject,
    EmptyList,
    Placeholder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeMapping {
    pub ts_type: &'static str,
    /// UI input component
    pub input: &'static str,
    /// Extra static attributes on the input
    pub input_attrs: &'static str,
    /// TypeScript literal used as the form value when no default is declared
    pub form_fallback: &'static str,
    /// Whether a declared `meta.default` becomes a column default
    pub column_default: bool,
    pub seed: SeedPolicy,
    pub sqlite: ColumnShape,
    pub postgres: ColumnShape,
    pub mysql: ColumnShape,
}

impl TypeMapping {
    pub fn column(&self, dialect: Dialect) -> ColumnShape {
        match dialect {
            Dialect::Sqlite => self.sqlite,
            Dialect::Postgres => self.postgres,
            Dialect::Mysql => self.mysql,
        }
    }
}

const STRING: TypeMapping = TypeMapping {
    ts_type: "string",
    input: "UInput",
    input_attrs: "",
    form_fallback: "''",
    column_default: true,
    seed: SeedPolicy::Label,
    sqlite: shape("text"),
    postgres: shape("varchar"),
    mysql: shape("varchar"),
};

const TEXT: TypeMapping = TypeMapping {
    ts_type: "string",
    input: "UTextarea",
    input_attrs: "",
    form_fallback: "''",
    column_default: true,
    seed: SeedPolicy::Paragraph,
    sqlite: shape("text"),
    postgres: shape("text"),
    mysql: shape("text"),
};

const NUMBER: TypeMapping = TypeMapping {
    ts_type: "number",
    input: "UInputNumber",
    input_attrs: "",
    form_fallback: "0",
    column_default: true,
    seed: SeedPolicy::Counter,
    sqlite: shape("real"),
    postgres: shape("doublePrecision"),
    mysql: shape("double"),
};

const INTEGER: TypeMapping = TypeMapping {
    ts_type: "number",
    input: "UInputNumber",
    input_attrs: ":step=\"1\"",
    form_fallback: "0",
    column_default: true,
    seed: SeedPolicy::Counter,
    sqlite: shape("integer"),
    postgres: shape("integer"),
    mysql: shape("int"),
};

const DECIMAL: TypeMapping = TypeMapping {
    ts_type: "number",
    input: "UInputNumber",
    input_attrs: "",
    form_fallback: "0",
    column_default: true,
    seed: SeedPolicy::Fraction,
    sqlite: shape("real"),
    postgres: shape("numeric"),
    mysql: shape("decimal"),
};

const BOOLEAN: TypeMapping = TypeMapping {
    ts_type: "boolean",
    input: "UCheckbox",
    input_attrs: "",
    form_fallback: "false",
    column_default: true,
    seed: SeedPolicy::Parity,
    sqlite: shape_mode("integer", "boolean"),
    postgres: shape("boolean"),
    mysql: shape("boolean"),
};

const DATE: TypeMapping = TypeMapping {
    ts_type: "string",
    input: "UInput",
    input_attrs: "type=\"date\"",
    form_fallback: "null",
    column_default: true,
    seed: SeedPolicy::CalendarDay,
    sqlite: shape("text"),
    postgres: shape_mode("date", "string"),
    mysql: shape_mode("date", "string"),
};

const DATETIME: TypeMapping = TypeMapping {
    ts_type: "Date",
    input: "UInput",
    input_attrs: "type=\"datetime-local\"",
    form_fallback: "null",
    column_default: false,
    seed: SeedPolicy::Timestamp,
    sqlite: shape_mode("integer", "timestamp"),
    postgres: shape("timestamp"),
    mysql: shape("datetime"),
};

const UUID: TypeMapping = TypeMapping {
    ts_type: "string",
    input: "UInput",
    input_attrs: "",
    form_fallback: "''",
    column_default: true,
    seed: SeedPolicy::Uuid,
    sqlite: shape("text"),
    postgres: shape("uuid"),
    mysql: shape("varchar"),
};

const JSON: TypeMapping = TypeMapping {
    ts_type: "Record<string, unknown>",
    input: "CrudJsonInput",
    input_attrs: "",
    form_fallback: "{}",
    column_default: false,
    seed: SeedPolicy::EmptyObject,
    sqlite: shape_mode("text", "json"),
    postgres: shape("jsonb"),
    mysql: shape("json"),
};

const ARRAY: TypeMapping = TypeMapping {
    ts_type: "string[]",
    input: "UInputTags",
    input_attrs: "",
    form_fallback: "[]",
    column_default: false,
    seed: SeedPolicy::EmptyList,
    sqlite: shape_mode("text", "json"),
    postgres: shape("jsonb"),
    mysql: shape("json"),
};

const REPEATER: TypeMapping = TypeMapping {
    ts_type: "Record<string, unknown>[]",
    input: "CrudRepeater",
    input_attrs: "",
    form_fallback: "[]",
    column_default: false,
    seed: SeedPolicy::EmptyList,
    sqlite: shape_mode("text", "json"),
    postgres: shape("jsonb"),
    mysql: shape("json"),
};

const REFERENCE: TypeMapping = TypeMapping {
    ts_type: "string",
    input: "CrudReferenceSelect",
    input_attrs: "",
    form_fallback: "null",
    column_default: false,
    seed: SeedPolicy::Placeholder,
    sqlite: shape("text"),
    postgres: shape("text"),
    mysql: shape("varchar"),
};

pub fn lookup(field_type: FieldType) -> &'static TypeMapping {
    match field_type {
        FieldType::String => &STRING,
        FieldType::Text => &TEXT,
        FieldType::Number => &NUMBER,
        FieldType::Integer => &INTEGER,
        FieldType::Decimal => &DECIMAL,
        FieldType::Boolean => &BOOLEAN,
        FieldType::Date => &DATE,
        FieldType::Datetime => &DATETIME,
        FieldType::Uuid => &UUID,
        FieldType::Json => &JSON,
        FieldType::Array => &ARRAY,
        FieldType::Repeater => &REPEATER,
        FieldType::Reference => &REFERENCE,
    }
}

/// Module a dialect's builders are imported from, and its table function.
pub fn dialect_module(dialect: Dialect) -> (&'static str, &'static str) {
    match dialect {
        Dialect::Sqlite => ("drizzle-orm/sqlite-core", "sqliteTable"),
        Dialect::Postgres => ("drizzle-orm/pg-core", "pgTable"),
        Dialect::Mysql => ("drizzle-orm/mysql-core", "mysqlTable"),
    }
}

/// Builders that refuse to compile without a `length` option.
pub fn requires_length(dialect: Dialect, builder: &str) -> bool {
    dialect == Dialect::Mysql && builder == "varchar"
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn every_type_has_a_column_for_every_dialect() {
        for field_type in FieldType::iter() {
            let mapping = lookup(field_type);
            for dialect in [Dialect::Sqlite, Dialect::Postgres, Dialect::Mysql] {
                assert!(!mapping.column(dialect).builder.is_empty(), "{field_type}");
            }
            assert!(!mapping.input.is_empty());
        }
    }

    #[test]
    fn decimal_uses_exact_numeric_columns_where_available() {
        let decimal = lookup(FieldType::Decimal);
        assert_eq!(decimal.column(Dialect::Postgres).builder, "numeric");
        assert_eq!(decimal.column(Dialect::Mysql).builder, "decimal");
        assert_eq!(decimal.column(Dialect::Sqlite).builder, "real");
    }

    #[test]
    fn sqlite_booleans_are_integer_mode_columns() {
        assert_eq!(
            lookup(FieldType::Boolean).column(Dialect::Sqlite),
            shape_mode("integer", "boolean")
        );
        assert!(requires_length(Dialect::Mysql, "varchar"));
        assert!(!requires_length(Dialect::Postgres, "varchar"));
    }
}
