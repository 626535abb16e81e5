use tera::{Context, Tera};

use super::ArtifactRole;
use super::ir::CollectionIr;
use super::templates::template_for;
use crate::error::{ScaffoldError, ScaffoldResult};
use strum::IntoEnumIterator;

/// Tera environment holding every artifact template, autoescaping off.
pub struct Renderer {
    tera: Tera,
}

impl Renderer {
    pub fn new() -> ScaffoldResult<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        let templates: Vec<(&str, &str)> = ArtifactRole::iter().map(template_for).collect();
        tera.add_raw_templates(templates)
            .map_err(|source| ScaffoldError::Render {
                template: "<registry>".to_string(),
                source,
            })?;
        Ok(Self { tera })
    }

    /// Renders one artifact. Output always ends with exactly one newline.
    pub fn render(&self, role: ArtifactRole, ir: &CollectionIr) -> ScaffoldResult<String> {
        let (name, _) = template_for(role);
        let render_err = |source| ScaffoldError::Render {
            template: name.to_string(),
            source,
        };
        let context = Context::from_serialize(ir).map_err(render_err)?;
        let rendered = self.tera.render(name, &context).map_err(render_err)?;
        let mut content = rendered.trim_end().to_string();
        content.push('\n');
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::EmitOptions;
    use crate::naming::NameSet;
    use crate::schema::{
        CollectionOptions, Dialect, KnownCollections, SchemaDocument, validate_collection,
    };

    fn spec(doc: &str, options: CollectionOptions) -> crate::schema::CollectionSpec {
        let doc: SchemaDocument = serde_json::from_str(doc).unwrap();
        let mut known = KnownCollections::new();
        known.add_collection("shop", "categories");
        validate_collection("shop", "products", &doc, &options, &known).unwrap()
    }

    fn products() -> crate::schema::CollectionSpec {
        spec(
            r#"{
                "title": {"type": "string", "meta": {"required": true, "maxLength": 120}},
                "price": {"type": "decimal", "meta": {"precision": 10, "scale": 2}}
            }"#,
            CollectionOptions::default(),
        )
    }

    fn render(spec: &crate::schema::CollectionSpec, options: &EmitOptions, role: ArtifactRole) -> String {
        let names = NameSet::resolve(&spec.layer, &spec.name);
        let ir = CollectionIr::build(spec, &names, options);
        Renderer::new().unwrap().render(role, &ir).unwrap()
    }

    #[test]
    fn storage_schema_renders_columns_in_order() {
        let out = render(&products(), &EmitOptions::default(), ArtifactRole::Schema);
        assert!(out.contains("import { sqliteTable, integer, real, text } from 'drizzle-orm/sqlite-core'"));
        assert!(out.contains("export const shopProducts = sqliteTable('shop_products', {"));
        assert!(out.contains("  id: text('id').primaryKey().$defaultFn(() => nanoid()),"));
        assert!(out.contains("  teamId: text('team_id').notNull(),"));
        assert!(out.contains("  title: text('title', { length: 120 }).notNull(),"));
        assert!(out.contains("  price: real('price'), // precision: 10, scale: 2"));
        let id = out.find("  id:").unwrap();
        let title = out.find("  title:").unwrap();
        let created = out.find("  createdAt:").unwrap();
        assert!(id < title && title < created);
        assert!(out.ends_with("})\n"));
    }

    #[test]
    fn postgres_decimal_carries_precision_options() {
        let options = EmitOptions {
            dialect: Dialect::Postgres,
            ..EmitOptions::default()
        };
        let out = render(&products(), &options, ArtifactRole::Schema);
        assert!(out.contains("price: numeric('price', { precision: 10, scale: 2 }),"));
        assert!(out.contains("from 'drizzle-orm/pg-core'"));
    }

    #[test]
    fn relation_stubs_stay_commented_out() {
        let spec = spec(
            r#"{"category": {"type": "reference", "refTarget": "categories"}}"#,
            CollectionOptions::default(),
        );
        let options = EmitOptions {
            auto_relations: true,
            ..EmitOptions::default()
        };
        let out = render(&spec, &options, ArtifactRole::Schema);
        assert!(out.contains("category: text('category'), // references shop_categories.id"));
        assert!(out.contains("// import { shopCategories } from '../categories/schema'"));
        assert!(out.contains(
            "//   category: one(shopCategories, { fields: [shopProducts.category], references: [shopCategories.id] }),"
        ));
        assert!(!out.lines().any(|l| l.starts_with("export const shopProductsRelations")));
    }

    #[test]
    fn data_access_scopes_mutations_by_team_and_owner() {
        let out = render(&products(), &EmitOptions::default(), ArtifactRole::Queries);
        assert!(out.contains("export class NotFoundOrUnauthorizedError extends Error"));
        assert!(out.contains("export async function getAllShopProducts(teamId: string)"));
        assert!(out.contains(
            ".where(and(eq(table.id, id), eq(table.teamId, teamId), eq(table.owner, owner)))"
        ));
        assert_eq!(out.matches("throw new NotFoundOrUnauthorizedError").count(), 2);
    }

    #[test]
    fn handlers_resolve_team_at_request_time() {
        let options = EmitOptions::default();
        for role in ArtifactRole::for_kind(crate::emit::TargetKind::ServerHandler) {
            let out = render(&products(), &options, role);
            assert!(out.contains("await resolveTeamAndCheckMembership(event)"), "{role}");
        }
        let patch = render(&products(), &options, ArtifactRole::HandlerUpdate);
        assert!(patch.contains("getRouterParam(event, 'productId')"));
    }

    #[test]
    fn form_groups_fields_and_wraps_translatable_ones() {
        let spec = spec(
            r#"{
                "name": {"type": "string", "meta": {"translatable": true}},
                "notes": {"type": "text", "meta": {"area": "sidebar"}},
                "rating": {"type": "integer", "meta": {"component": "StarRating"}}
            }"#,
            CollectionOptions::default(),
        );
        let out = render(&spec, &EmitOptions::default(), ArtifactRole::Form);
        assert!(out.contains(r#"<section class="crud-area crud-area-main">"#));
        assert!(out.contains(r#"<section class="crud-area crud-area-sidebar">"#));
        assert!(out.contains(r#"<TranslationsInput v-model="state.translations" field="name">"#));
        assert!(out.contains(r#"<StarRating v-model="state.rating" :step="1" />"#));
        assert!(out.contains(r#"<UTextarea v-model="state.notes" />"#));

        let plain = render(
            &spec,
            &EmitOptions {
                translations: false,
                ..EmitOptions::default()
            },
            ArtifactRole::Form,
        );
        assert!(!plain.contains("TranslationsInput"));
    }

    #[test]
    fn quoted_labels_keep_generated_code_well_formed() {
        let spec = spec(
            r#"{"title": {"type": "string", "meta": {"label": "Owner's \"title\""}}}"#,
            CollectionOptions::default(),
        );
        let composable = render(&spec, &EmitOptions::default(), ArtifactRole::Composable);
        assert!(composable.contains(r#"header: 'Owner\'s "title"' }"#));

        let form = render(&spec, &EmitOptions::default(), ArtifactRole::Form);
        assert!(form.contains(r#"label="Owner&#39;s &quot;title&quot;""#));
    }

    #[test]
    fn vue_output_has_no_mustache_interpolation() {
        for role in [ArtifactRole::List, ArtifactRole::Form, ArtifactRole::Table] {
            let out = render(&products(), &EmitOptions::default(), role);
            assert!(!out.contains("{{"), "{role}");
            assert!(out.starts_with("<!-- Generated by crudkit for shop/products. -->"));
        }
    }

    #[test]
    fn type_declaration_excludes_system_fields_from_new_shape() {
        let out = render(&products(), &EmitOptions::default(), ArtifactRole::Types);
        assert!(out.contains("export interface ShopProduct {"));
        assert!(out.contains("  price: number | null"));
        assert!(out.contains(
            "export type NewShopProduct = Omit<ShopProduct, 'id' | 'teamId' | 'owner' | 'createdAt' | 'updatedAt' | 'createdBy' | 'updatedBy'>"
        ));
    }

    #[test]
    fn seed_file_uses_the_configured_count() {
        let spec = spec(
            r#"{"title": {"type": "string"}}"#,
            serde_json::from_str(r#"{"seed": {"enabled": true, "count": 25}, "sortable": true}"#)
                .unwrap(),
        );
        let out = render(&spec, &EmitOptions::default(), ArtifactRole::Seed);
        assert!(out.contains("export const SHOP_PRODUCTS_SEED_COUNT = 25"));
        assert!(out.contains("      title: `Title ${n}`,"));
        assert!(out.contains("      order: i,"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let spec = products();
        let options = EmitOptions::default();
        for role in ArtifactRole::iter() {
            assert_eq!(render(&spec, &options, role), render(&spec, &options, role));
        }
    }
}
