//! Canonical names and file placement for a `(layer, collection)` pair.
//!
//! Everything here is a pure function of its inputs. The manifest stores
//! full paths for auditability, but consistency between runs comes from
//! recomputing them here, so any change to this module changes where
//! artifacts land.

use convert_case::{Case, Casing};
use serde::Serialize;

use crate::emit::{ArtifactRole, TargetKind};
use crate::error::{ScaffoldError, ScaffoldResult};

/// Words whose plural is not formed by a suffix rule. Used in both directions.
const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("mouse", "mice"),
    ("goose", "geese"),
    ("tooth", "teeth"),
    ("foot", "feet"),
    ("ox", "oxen"),
    ("criterion", "criteria"),
    ("leaf", "leaves"),
    ("life", "lives"),
    ("knife", "knives"),
    ("wife", "wives"),
    ("half", "halves"),
    ("shelf", "shelves"),
    ("movie", "movies"),
    ("cookie", "cookies"),
    ("status", "statuses"),
    ("bus", "buses"),
    ("campus", "campuses"),
    ("virus", "viruses"),
    ("quiz", "quizzes"),
    ("analysis", "analyses"),
    ("thesis", "theses"),
];

const UNCOUNTABLE: &[&str] = &[
    "data",
    "metadata",
    "equipment",
    "information",
    "feedback",
    "money",
    "news",
    "media",
    "series",
    "species",
    "sheep",
    "fish",
    "software",
];

/// Plural form of a lowercase word.
pub fn pluralize(word: &str) -> String {
    if UNCOUNTABLE.contains(&word) {
        return word.to_string();
    }
    if let Some((_, plural)) = IRREGULAR.iter().find(|(s, p)| *s == word || *p == word) {
        return plural.to_string();
    }
    if let Some(stem) = word.strip_suffix('y') {
        if !stem.is_empty() && !stem.ends_with(['a', 'e', 'i', 'o', 'u']) {
            return format!("{stem}ies");
        }
    }
    if ["s", "x", "z", "ch", "sh"].iter().any(|s| word.ends_with(s)) {
        return format!("{word}es");
    }
    format!("{word}s")
}

/// Singular form of a lowercase word. Already-singular words come back unchanged.
pub fn singularize(word: &str) -> String {
    if UNCOUNTABLE.contains(&word) {
        return word.to_string();
    }
    if let Some((singular, _)) = IRREGULAR.iter().find(|(s, p)| *s == word || *p == word) {
        return singular.to_string();
    }
    if ["ss", "us", "is"].iter().any(|s| word.ends_with(s)) {
        return word.to_string();
    }
    if let Some(stem) = word.strip_suffix("ies") {
        if !stem.is_empty() {
            return format!("{stem}y");
        }
    }
    for suffix in ["sses", "xes", "zes", "ches", "shes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    match word.strip_suffix('s') {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => word.to_string(),
    }
}

/// Applies `inflect` to the last word of a compound name (`blog_posts`).
fn inflect_last(snake: &str, inflect: fn(&str) -> String) -> String {
    match snake.rsplit_once('_') {
        Some((head, last)) => format!("{head}_{}", inflect(last)),
        None => inflect(snake),
    }
}

/// Every identifier derived from a `(layer, collection)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NameSet {
    pub layer: String,
    pub layer_pascal: String,
    /// Collection name as given by the user
    pub collection: String,
    /// camelCase singular (`blogPost`)
    pub singular: String,
    /// camelCase plural (`blogPosts`)
    pub plural: String,
    pub singular_pascal: String,
    pub plural_pascal: String,
    /// kebab-case plural, used for directories (`blog-posts`)
    pub kebab: String,
    /// Storage table (`shop_blog_posts`)
    pub table: String,
    /// Variable holding the table definition (`shopBlogPosts`)
    pub table_export: String,
    /// Component/UI prefix (`ShopBlogPosts`)
    pub ui_prefix: String,
    /// Row type name (`ShopBlogPost`)
    pub type_name: String,
    pub new_type_name: String,
    pub composable: String,
    /// Route segment under the team API (`shop-blog-posts`)
    pub api_segment: String,
    /// Route parameter for single-row handlers (`blogPostId`)
    pub id_param: String,
    /// Human title (`Blog Posts`)
    pub title: String,
}

impl NameSet {
    pub fn resolve(layer: &str, collection: &str) -> Self {
        let snake = collection.to_case(Case::Snake);
        let singular_snake = inflect_last(&snake, singularize);
        let plural_snake = inflect_last(&singular_snake, pluralize);
        let layer_snake = layer.to_case(Case::Snake);

        let table = format!("{layer_snake}_{plural_snake}");
        let ui_prefix = table.to_case(Case::Pascal);
        let type_name = format!("{layer_snake}_{singular_snake}").to_case(Case::Pascal);

        Self {
            layer: layer.to_string(),
            layer_pascal: layer_snake.to_case(Case::Pascal),
            collection: collection.to_string(),
            singular: singular_snake.to_case(Case::Camel),
            plural: plural_snake.to_case(Case::Camel),
            singular_pascal: singular_snake.to_case(Case::Pascal),
            plural_pascal: plural_snake.to_case(Case::Pascal),
            kebab: plural_snake.to_case(Case::Kebab),
            table_export: table.to_case(Case::Camel),
            composable: format!("use{ui_prefix}"),
            api_segment: table.to_case(Case::Kebab),
            id_param: format!("{}_id", singular_snake).to_case(Case::Camel),
            title: plural_snake.to_case(Case::Title),
            new_type_name: format!("New{type_name}"),
            table,
            ui_prefix,
            type_name,
        }
    }

    pub fn layer_root(&self) -> String {
        format!("layers/{}", self.layer)
    }
}

/// Inputs besides the names that change which files a kind produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathOptions {
    pub seed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSlot {
    pub role: ArtifactRole,
    pub path: String,
}

/// Canonical project-relative paths for one target kind.
pub fn artifact_paths(names: &NameSet, kind: TargetKind, options: &PathOptions) -> Vec<ArtifactSlot> {
    let root = names.layer_root();
    let database = format!("{root}/server/database/{}", names.kebab);
    let api = format!("{root}/server/api/teams/[id]/{}", names.api_segment);
    let components = format!("{root}/components/{}", names.kebab);

    ArtifactRole::for_kind(kind)
        .filter(|role| *role != ArtifactRole::Seed || options.seed)
        .map(|role| {
            let path = match role {
                ArtifactRole::Schema => format!("{database}/schema.ts"),
                ArtifactRole::Seed => format!("{database}/seed.ts"),
                ArtifactRole::Queries => format!("{database}/queries.ts"),
                ArtifactRole::Composable => {
                    format!("{root}/composables/{}.ts", names.composable)
                }
                ArtifactRole::HandlerGetAll => format!("{api}/index.get.ts"),
                ArtifactRole::HandlerGetByIds => format!("{api}/by-ids.get.ts"),
                ArtifactRole::HandlerCreate => format!("{api}/index.post.ts"),
                ArtifactRole::HandlerUpdate => format!("{api}/[{}].patch.ts", names.id_param),
                ArtifactRole::HandlerDelete => format!("{api}/[{}].delete.ts", names.id_param),
                ArtifactRole::List => format!("{components}/List.vue"),
                ArtifactRole::Form => format!("{components}/Form.vue"),
                ArtifactRole::Table => format!("{components}/Table.vue"),
                ArtifactRole::Types => format!("{root}/types/{}.ts", names.kebab),
            };
            ArtifactSlot { role, path }
        })
        .collect()
}

/// Rejects paths that could escape the project root.
pub fn ensure_relative_path(path: &str) -> ScaffoldResult<&str> {
    let unsafe_path = path.is_empty()
        || path.contains('\0')
        || path.contains('\\')
        || path.starts_with('/')
        || path.split('/').any(|segment| segment == "..")
        || (path.len() >= 2
            && path.as_bytes()[1] == b':'
            && path.as_bytes()[0].is_ascii_alphabetic());
    if unsafe_path {
        return Err(ScaffoldError::UnsafePath {
            path: path.to_string(),
        });
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use strum::IntoEnumIterator;

    #[test]
    fn inflection_table_works_both_ways() {
        for (singular, plural) in IRREGULAR {
            assert_eq!(pluralize(singular), *plural);
            assert_eq!(singularize(plural), *singular);
            assert_eq!(singularize(singular), *singular);
        }
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(singularize("categories"), "category");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(singularize("addresses"), "address");
        assert_eq!(singularize("houses"), "house");
        assert_eq!(pluralize("day"), "days");
        assert_eq!(pluralize("news"), "news");
    }

    #[test]
    fn resolves_products_in_shop() {
        let names = NameSet::resolve("shop", "products");
        assert_eq!(names.singular, "product");
        assert_eq!(names.plural, "products");
        assert_eq!(names.table, "shop_products");
        assert_eq!(names.ui_prefix, "ShopProducts");
        assert_eq!(names.type_name, "ShopProduct");
        assert_eq!(names.composable, "useShopProducts");
        assert_eq!(names.id_param, "productId");
    }

    #[test]
    fn singular_and_plural_inputs_agree() {
        assert_eq!(
            NameSet::resolve("blog", "blogPosts").table,
            NameSet::resolve("blog", "blog_post").table
        );
        let people = NameSet::resolve("crm", "person");
        assert_eq!(people.table, "crm_people");
        assert_eq!(people.ui_prefix, "CrmPeople");
        assert_eq!(people.type_name, "CrmPerson");
    }

    #[test]
    fn paths_follow_the_layer_layout() {
        let names = NameSet::resolve("shop", "products");
        let paths = |kind| {
            artifact_paths(&names, kind, &PathOptions { seed: true })
                .into_iter()
                .map(|slot| slot.path)
                .collect::<Vec<_>>()
        };
        assert_eq!(
            paths(TargetKind::StorageSchema),
            vec![
                "layers/shop/server/database/products/schema.ts",
                "layers/shop/server/database/products/seed.ts"
            ]
        );
        assert_eq!(
            paths(TargetKind::UiForm),
            vec!["layers/shop/components/products/Form.vue"]
        );
        assert!(
            paths(TargetKind::ServerHandler)
                .contains(&"layers/shop/server/api/teams/[id]/shop-products/[productId].patch.ts".to_string())
        );
        assert_eq!(
            artifact_paths(&names, TargetKind::StorageSchema, &PathOptions::default()).len(),
            1
        );
    }

    #[test]
    fn unsafe_paths_are_rejected() {
        for path in ["../etc/passwd", "/abs/file.ts", "a\\b.ts", "C:/x.ts", "layers/../../x", ""] {
            assert!(ensure_relative_path(path).is_err(), "{path}");
        }
        assert!(ensure_relative_path("layers/shop/server/api/teams/[id]/x.ts").is_ok());
    }

    proptest! {
        #[test]
        fn resolution_is_deterministic_and_consistent(
            layer in "[a-z]{1,8}",
            collection in "[a-z]{1,10}(_[a-z]{1,8})?",
        ) {
            let first = NameSet::resolve(&layer, &collection);
            let second = NameSet::resolve(&layer, &collection);
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.ui_prefix.to_case(Case::Snake), first.table.clone());
            for kind in TargetKind::iter() {
                for slot in artifact_paths(&first, kind, &PathOptions { seed: true }) {
                    prop_assert!(ensure_relative_path(&slot.path).is_ok());
                    let layer_prefix = format!("layers/{layer}/");
                    prop_assert!(slot.path.starts_with(&layer_prefix));
                }
            }
        }
    }
}
