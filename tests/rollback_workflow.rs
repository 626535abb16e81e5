mod support;

use crudkit::EXIT_RETAINED;
use support::{POSTS_SCHEMA, PRODUCTS_SCHEMA, TestProject, json};

fn generate(project: &TestProject, layer: &str, collection: &str, schema: &str) {
    let path = project.write(&format!("schemas/{collection}.yaml"), schema);
    project.run_ok(&[
        "generate",
        layer,
        collection,
        "--schema",
        path.to_str().expect("utf-8 path"),
    ]);
}

#[test]
fn generate_then_rollback_restores_the_tree() {
    let project = TestProject::new();
    project.write("schemas/products.yaml", PRODUCTS_SCHEMA);
    let before = project.snapshot();
    let dirs_before = project.directories();

    generate(&project, "shop", "products", PRODUCTS_SCHEMA);
    assert!(!project.generated_files().is_empty());

    let output = project.run_ok(&["rollback", "shop", "products"]);
    assert_eq!(output.exit_code, 0);
    assert!(output.report.contains("1 removed, 0 retained; 12 deleted"));

    assert_eq!(project.snapshot(), before);
    assert_eq!(project.directories(), dirs_before);
    assert!(!project.exists(".crudkit"));
}

#[test]
fn edited_file_is_protected_and_entry_retained() {
    let project = TestProject::new();
    generate(&project, "shop", "products", PRODUCTS_SCHEMA);
    project.write("layers/shop/components/products/Form.vue", "<template>mine</template>\n");

    let output = project.run_ok(&["--format", "json", "rollback", "shop", "products"]);
    assert_eq!(output.exit_code, EXIT_RETAINED);
    let report = json(&output);
    assert_eq!(report["entries"][0]["state"], "retained");
    assert_eq!(report["issues"][0]["code"], "modified_since_generation");

    assert_eq!(
        project.read("layers/shop/components/products/Form.vue"),
        "<template>mine</template>\n"
    );
    assert_eq!(project.generated_files(), vec!["layers/shop/components/products/Form.vue"]);

    let listed = json(&project.run_ok(&["--format", "json", "list"]));
    assert_eq!(listed["entries"][0]["collection"], "products");

    let forced = project.run_ok(&["rollback", "shop", "products", "--force"]);
    assert_eq!(forced.exit_code, 0);
    assert!(project.generated_files().is_empty());
    assert!(!project.exists(".crudkit/manifest.json"));
}

#[test]
fn keep_files_drops_tracking_only() {
    let project = TestProject::new();
    generate(&project, "shop", "products", PRODUCTS_SCHEMA);
    let generated = project.generated_files();

    let output = project.run_ok(&["rollback", "shop", "products", "--keep-files"]);
    assert_eq!(output.exit_code, 0);
    assert_eq!(project.generated_files(), generated);
    assert!(!project.exists(".crudkit/manifest.json"));
}

#[test]
fn dry_run_rollback_changes_nothing() {
    let project = TestProject::new();
    generate(&project, "shop", "products", PRODUCTS_SCHEMA);
    let before = project.snapshot();

    let output = project.run_ok(&["--format", "json", "rollback", "shop", "products", "--dry-run"]);
    let report = json(&output);
    assert_eq!(report["dryRun"], true);
    assert_eq!(report["entries"][0]["state"], "removed");
    assert_eq!(project.snapshot(), before);
}

#[test]
fn bulk_layer_dry_run_covers_every_collection_of_the_layer() {
    let project = TestProject::new();
    generate(&project, "shop", "products", PRODUCTS_SCHEMA);
    generate(&project, "shop", "orders", POSTS_SCHEMA);
    generate(&project, "shop", "customers", POSTS_SCHEMA);
    generate(&project, "blog", "posts", POSTS_SCHEMA);
    let before = project.snapshot();

    let output = project.run_ok(&[
        "--format",
        "json",
        "rollback-bulk",
        "--layer",
        "shop",
        "--dry-run",
    ]);
    let report = json(&output);
    let entries = report["entries"].as_array().expect("entries");
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|e| e["layer"] == "shop"));
    assert_eq!(project.snapshot(), before);

    project.run_ok(&["rollback-bulk", "--layer", "shop"]);
    let remaining = project.generated_files();
    assert!(!remaining.is_empty());
    assert!(remaining.iter().all(|f| f.starts_with("layers/blog/")));
}

#[test]
fn bulk_by_config_reports_untracked_targets_and_continues() {
    let project = TestProject::new();
    generate(&project, "blog", "posts", POSTS_SCHEMA);
    let config = project.write(
        "crudkit.config.yaml",
        "targets:\n  - layer: blog\n    collections: [posts, authors]\n",
    );

    let output = project.run_ok(&[
        "--format",
        "json",
        "rollback-bulk",
        "--config",
        config.to_str().expect("utf-8 path"),
    ]);
    assert_eq!(output.exit_code, 0);
    let report = json(&output);
    assert_eq!(report["entries"].as_array().expect("entries").len(), 1);
    assert_eq!(report["issues"][0]["code"], "manifest_mismatch");
    assert!(project.generated_files().is_empty());
}

#[test]
fn rolling_back_an_unknown_collection_fails() {
    let project = TestProject::new();
    let err = project.run(&["rollback", "shop", "ghosts"]).unwrap_err();
    let engine = err
        .downcast_ref::<crudkit::ScaffoldError>()
        .expect("engine error");
    assert_eq!(engine.code(), "manifest_mismatch");
}

#[test]
fn missing_files_count_as_handled() {
    let project = TestProject::new();
    generate(&project, "shop", "products", PRODUCTS_SCHEMA);
    std::fs::remove_file(project.path("layers/shop/types/products.ts")).expect("remove");

    let output = project.run_ok(&["rollback", "shop", "products"]);
    assert_eq!(output.exit_code, 0);
    assert!(output.report.contains("1 missing"));
    assert!(project.generated_files().is_empty());
}

fn outcomes(report: &serde_json::Value) -> Vec<(String, String)> {
    report["entries"]
        .as_array()
        .expect("entries")
        .iter()
        .flat_map(|e| e["artifacts"].as_array().expect("artifacts").iter())
        .map(|a| {
            (
                a["path"].as_str().expect("path").to_string(),
                a["outcome"].as_str().expect("outcome").to_string(),
            )
        })
        .collect()
}

#[test]
fn dry_run_rollback_predicts_the_real_outcomes() {
    let project = TestProject::new();
    generate(&project, "shop", "products", PRODUCTS_SCHEMA);
    project.write("layers/shop/components/products/Form.vue", "<template>mine</template>\n");
    std::fs::remove_file(project.path("layers/shop/types/products.ts")).expect("remove");

    let planned = project.run_ok(&["--format", "json", "rollback", "shop", "products", "--dry-run"]);
    let applied = project.run_ok(&["--format", "json", "rollback", "shop", "products"]);
    assert_eq!(planned.exit_code, applied.exit_code);

    let (planned, applied) = (json(&planned), json(&applied));
    assert_eq!(outcomes(&planned), outcomes(&applied));
    assert_eq!(planned["entries"][0]["state"], applied["entries"][0]["state"]);
    let outcomes = outcomes(&applied);
    assert!(outcomes.iter().any(|(_, o)| o == "modified"));
    assert!(outcomes.iter().any(|(_, o)| o == "missing"));
}

#[test]
fn keep_files_still_protects_edits_until_forced() {
    let project = TestProject::new();
    generate(&project, "shop", "products", PRODUCTS_SCHEMA);
    project.write("layers/shop/components/products/Form.vue", "<template>mine</template>\n");
    let generated = project.generated_files();

    let output = project.run_ok(&[
        "--format",
        "json",
        "rollback",
        "shop",
        "products",
        "--keep-files",
    ]);
    assert_eq!(output.exit_code, EXIT_RETAINED);
    assert_eq!(json(&output)["entries"][0]["state"], "retained");

    let listed = json(&project.run_ok(&["--format", "json", "list"]));
    let tracked = listed["entries"][0]["artifacts"].as_array().expect("artifacts");
    assert_eq!(tracked.len(), 1);

    let forced = project.run_ok(&["rollback", "shop", "products", "--keep-files", "--force"]);
    assert_eq!(forced.exit_code, 0);
    assert_eq!(project.generated_files(), generated);
    assert!(!project.exists(".crudkit/manifest.json"));
}

#[test]
fn bulk_by_config_honours_the_config_flags() {
    let project = TestProject::new();
    generate(&project, "blog", "posts", POSTS_SCHEMA);
    let config = project.write(
        "crudkit.config.yaml",
        "flags:\n  dryRun: true\n  keepFiles: true\ntargets:\n  - layer: blog\n    collections: [posts]\n",
    );
    let before = project.snapshot();

    let output = project.run_ok(&[
        "--format",
        "json",
        "rollback-bulk",
        "--config",
        config.to_str().expect("utf-8 path"),
    ]);
    let report = json(&output);
    assert_eq!(report["dryRun"], true);
    assert!(outcomes(&report).iter().all(|(_, o)| o == "kept"));
    assert_eq!(project.snapshot(), before);
}
