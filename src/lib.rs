pub mod config;
pub mod emit;
pub mod error;
pub mod fingerprint;
pub mod generate;
pub mod init;
pub mod logging;
pub mod manifest;
pub mod naming;
pub mod report;
pub mod rollback;
pub mod schema;
pub mod select;
pub mod writer;

pub use config::{CliArgs, Command, Flags, PartialFlags};
pub use error::{ScaffoldError, ScaffoldResult, ValidationIssue};
pub use generate::{GenerateOptions, GenerationReport, generate, plan};
pub use logging::{LoggingConfig, init_logging};
pub use manifest::ManifestStore;
pub use rollback::{
    BulkTarget, RollbackOptions, RollbackReport, rollback_bulk, rollback_interactive,
    rollback_single,
};

use anyhow::Result;
use std::path::Path;

use config::{
    GenerateArgs, GenerateConfigArgs, GenerateSource, ListArgs, RollbackBulkArgs, resolve_dialect,
};
use manifest::ManifestFilter;
use report::{ListReport, ReportFormat, TextReport, render};
use schema::{
    CollectionOptions, CollectionSpec, HierarchyDef, ProjectConfigDef, SeedDef,
    load_project_config, load_schema_document, validate_collection, validate_project,
};
use select::TerminalSelector;

/// Exit status when a rollback left at least one entry in place.
pub const EXIT_RETAINED: i32 = 2;

/// Rendered report plus the process exit status it implies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub report: String,
    pub exit_code: i32,
}

/// Runs one command and renders its report.
pub fn execute(args: &CliArgs) -> Result<CommandOutput> {
    let root = args.project.as_path();
    match &args.command {
        Command::Generate(GenerateArgs {
            source: Some(GenerateSource::Config(cmd)),
            ..
        }) => {
            let _span = logging::operation_span("generate_config").entered();
            let report = run_generate_config(root, cmd)?;
            finish(&report, args.format, 0)
        }
        Command::Generate(cmd) => {
            let _span = logging::operation_span("generate").entered();
            let report = run_generate(root, cmd)?;
            finish(&report, args.format, 0)
        }
        Command::Rollback(cmd) => {
            let _span = logging::operation_span("rollback").entered();
            let options = rollback_flags(&cmd.flags.to_partial(cmd.force));
            let mut store = ManifestStore::open(root)?;
            let report = rollback_single(&mut store, &cmd.layer, &cmd.collection, &options)?;
            finish_rollback(&report, args.format)
        }
        Command::RollbackBulk(cmd) => {
            let _span = logging::operation_span("rollback_bulk").entered();
            let report = run_rollback_bulk(root, cmd)?;
            finish_rollback(&report, args.format)
        }
        Command::RollbackInteractive(cmd) => {
            let _span = logging::operation_span("rollback_interactive").entered();
            let options = rollback_flags(&cmd.flags.to_partial(false));
            let mut store = ManifestStore::open(root)?;
            let report = rollback_interactive(&mut store, &mut TerminalSelector, &options)?;
            finish_rollback(&report, args.format)
        }
        Command::List(ListArgs { layer }) => {
            let _span = logging::operation_span("list").entered();
            let store = ManifestStore::open(root)?;
            let filter = match layer {
                Some(layer) => ManifestFilter::Layer(layer),
                None => ManifestFilter::All,
            };
            let report = ListReport::from_entries(&store.list(filter));
            finish(&report, args.format, 0)
        }
        Command::Init(cmd) => {
            let _span = logging::operation_span("init").entered();
            let report = init::init(
                root,
                &init::InitOptions {
                    output: cmd.output.clone(),
                    json_schema: cmd.json_schema,
                    force: cmd.force,
                },
            )?;
            finish(&report, args.format, 0)
        }
    }
}

fn finish<T: serde::Serialize + TextReport>(
    report: &T,
    format: ReportFormat,
    exit_code: i32,
) -> Result<CommandOutput> {
    Ok(CommandOutput {
        report: render(report, format)?,
        exit_code,
    })
}

fn finish_rollback(report: &RollbackReport, format: ReportFormat) -> Result<CommandOutput> {
    let exit_code = if report.retained() > 0 {
        EXIT_RETAINED
    } else {
        0
    };
    finish(report, format, exit_code)
}

fn rollback_flags(cli: &PartialFlags) -> RollbackOptions {
    Flags::resolve(cli, &PartialFlags::default()).rollback_options()
}

fn run_generate(root: &Path, cmd: &GenerateArgs) -> Result<GenerationReport> {
    let (Some(layer), Some(collection), Some(schema_path)) =
        (&cmd.layer, &cmd.collection, &cmd.schema)
    else {
        anyhow::bail!("generate needs <LAYER> <COLLECTION> --schema <FILE>");
    };
    let mut store = ManifestStore::open(root)?;
    let file = match &cmd.config {
        Some(path) => schema::loader::parse_document::<ProjectConfigDef>(path)?,
        None => ProjectConfigDef::default(),
    };

    let mut known = store.known_collections();
    for external in file.externals.iter().chain(cmd.externals.iter()) {
        known.add_external(external);
    }
    for target in &file.targets {
        for name in &target.collections {
            known.add_collection(&target.layer, name);
        }
    }
    for declared in &file.collections {
        known.add_collection(layer, &declared.name);
    }

    let options = CollectionOptions {
        hierarchy: cmd.hierarchy.then(|| HierarchyDef {
            enabled: true,
            parent_field: cmd.parent_field.clone(),
        }),
        sortable: cmd.sortable,
        seed: cmd.seed.map(|count| SeedDef {
            enabled: true,
            count: Some(count),
        }),
    };
    let doc = load_schema_document(schema_path)?;
    let spec = validate_collection(layer, collection, &doc, &options, &known)?;

    let flags = Flags::resolve(&cmd.flags.to_partial(), &file.flags);
    let dialect = resolve_dialect(cmd.dialect, file.dialect);
    run_specs(&mut store, &[spec], &flags.generate_options(dialect))
}

fn run_generate_config(root: &Path, cmd: &GenerateConfigArgs) -> Result<GenerationReport> {
    let mut store = ManifestStore::open(root)?;
    let def = load_project_config(&cmd.config)?;
    let dialect = resolve_dialect(cmd.dialect, def.dialect);
    let project = validate_project(&def, &store.known_collections())?;
    let flags = Flags::resolve(&cmd.flags.to_partial(), &project.flags);
    run_specs(&mut store, &project.collections, &flags.generate_options(dialect))
}

fn run_specs(
    store: &mut ManifestStore,
    specs: &[CollectionSpec],
    options: &GenerateOptions,
) -> Result<GenerationReport> {
    tracing::info!(
        collections = specs.len(),
        dialect = %options.emit.dialect,
        dry_run = options.dry_run,
        force = options.force,
        "generating"
    );
    Ok(generate(store, specs, options)?)
}

fn run_rollback_bulk(root: &Path, cmd: &RollbackBulkArgs) -> Result<RollbackReport> {
    let cli = cmd.flags.to_partial(cmd.force);
    let (target, options) = match (&cmd.layer, &cmd.config) {
        (Some(layer), _) => (BulkTarget::Layer(layer.clone()), rollback_flags(&cli)),
        (None, Some(path)) => {
            let file = schema::loader::parse_document::<ProjectConfigDef>(path)?;
            let options = Flags::resolve(&cli, &file.flags).rollback_options();
            (BulkTarget::Config(path.clone()), options)
        }
        (None, None) => anyhow::bail!("rollback-bulk needs --layer or --config"),
    };
    let mut store = ManifestStore::open(root)?;
    Ok(rollback_bulk(&mut store, &target, &options)?)
}
