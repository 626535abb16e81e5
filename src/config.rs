use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::path::PathBuf;

use crate::emit::{EmitOptions, TargetKind};
use crate::generate::GenerateOptions;
use crate::report::ReportFormat;
use crate::rollback::RollbackOptions;
use crate::schema::Dialect;
use strum::IntoEnumIterator;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "crudkit",
    about = "Generate CRUD slices from field schemas and roll them back",
    version
)]
pub struct CliArgs {
    #[arg(
        long,
        env = "CRUDKIT_PROJECT",
        value_name = "DIR",
        default_value = ".",
        global = true,
        help = "Project root that holds layers/ and the manifest"
    )]
    pub project: PathBuf,

    #[arg(
        long,
        value_enum,
        default_value_t = ReportFormat::Text,
        global = true,
        help = "Report format"
    )]
    pub format: ReportFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Generate one collection from a schema document, or `generate config <FILE>`
    Generate(GenerateArgs),
    /// Roll back one generated collection
    Rollback(RollbackArgs),
    /// Roll back a whole layer or every collection of a project config
    RollbackBulk(RollbackBulkArgs),
    /// Pick generated collections to roll back from a list
    RollbackInteractive(RollbackInteractiveArgs),
    /// Show what the manifest tracks
    List(ListArgs),
    /// Write an example schema document (or its JSON Schema)
    Init(InitArgs),
}

/// Switches shared by both generate commands.
#[derive(Args, Debug, Clone, Default)]
pub struct GenerationFlagArgs {
    #[arg(long, help = "Overwrite files that differ from what would be generated")]
    pub force: bool,
    #[arg(long, help = "Skip the storage schema")]
    pub no_db: bool,
    #[arg(long, help = "Ignore translatable fields")]
    pub no_translations: bool,
    #[arg(long, help = "Show the plan without writing anything")]
    pub dry_run: bool,
    #[arg(long, help = "Emit commented relation stubs for reference fields")]
    pub auto_relations: bool,
    #[arg(long, help = "Leave out createdAt/updatedAt/createdBy/updatedBy")]
    pub no_metadata: bool,
    #[arg(long = "skip", value_enum, value_name = "KIND", help = "Target kinds to leave out")]
    pub skip_targets: Vec<TargetKind>,
}

impl GenerationFlagArgs {
    /// Flags the user actually passed; absent switches stay `None` so the
    /// config file can fill them.
    pub fn to_partial(&self) -> PartialFlags {
        PartialFlags {
            force: self.force.then_some(true),
            no_translations: self.no_translations.then_some(true),
            no_db: self.no_db.then_some(true),
            dry_run: self.dry_run.then_some(true),
            auto_relations: self.auto_relations.then_some(true),
            use_metadata: self.no_metadata.then_some(false),
            keep_files: None,
            skip_targets: (!self.skip_targets.is_empty()).then(|| self.skip_targets.clone()),
        }
    }
}

/// `generate <layer> <collection> --schema <FILE>` or `generate config <FILE>`.
///
/// `config` is taken as the subcommand, so it cannot name a layer.
#[derive(Args, Debug, Clone)]
#[command(args_conflicts_with_subcommands = true, subcommand_negates_reqs = true)]
pub struct GenerateArgs {
    #[command(subcommand)]
    pub source: Option<GenerateSource>,
    #[arg(required = true)]
    pub layer: Option<String>,
    #[arg(required = true)]
    pub collection: Option<String>,
    #[arg(
        long,
        value_name = "FILE",
        required = true,
        help = "Schema document (.json, .yaml or .toml)"
    )]
    pub schema: Option<PathBuf>,
    #[arg(
        long,
        value_name = "FILE",
        help = "Project config supplying flags, dialect and externals"
    )]
    pub config: Option<PathBuf>,
    #[arg(long, value_enum)]
    pub dialect: Option<Dialect>,
    #[arg(long = "external", value_name = "NAME", help = "Collection owned outside this project")]
    pub externals: Vec<String>,
    #[arg(long, help = "Add parent/path/depth columns")]
    pub hierarchy: bool,
    #[arg(long, value_name = "FIELD", requires = "hierarchy")]
    pub parent_field: Option<String>,
    #[arg(long, help = "Add an order column")]
    pub sortable: bool,
    #[arg(
        long,
        value_name = "COUNT",
        num_args = 0..=1,
        default_missing_value = "10",
        help = "Emit a seed file with COUNT rows"
    )]
    pub seed: Option<i64>,
    #[command(flatten)]
    pub flags: GenerationFlagArgs,
}

#[derive(Subcommand, Debug, Clone)]
pub enum GenerateSource {
    /// Generate every collection listed in a project config
    Config(GenerateConfigArgs),
}

#[derive(Args, Debug, Clone)]
pub struct GenerateConfigArgs {
    /// Project config (.json, .yaml or .toml)
    pub config: PathBuf,
    #[arg(long, value_enum)]
    pub dialect: Option<Dialect>,
    #[command(flatten)]
    pub flags: GenerationFlagArgs,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RollbackFlagArgs {
    #[arg(long, help = "Report what would happen without touching anything")]
    pub dry_run: bool,
    #[arg(long, help = "Stop tracking files but leave them on disk")]
    pub keep_files: bool,
}

impl RollbackFlagArgs {
    pub fn to_partial(&self, force: bool) -> PartialFlags {
        PartialFlags {
            force: force.then_some(true),
            dry_run: self.dry_run.then_some(true),
            keep_files: self.keep_files.then_some(true),
            ..PartialFlags::default()
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct RollbackArgs {
    pub layer: String,
    pub collection: String,
    #[command(flatten)]
    pub flags: RollbackFlagArgs,
    #[arg(long, help = "Delete files even if they were edited since generation")]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RollbackBulkArgs {
    #[arg(
        long,
        value_name = "NAME",
        required_unless_present = "config",
        conflicts_with = "config"
    )]
    pub layer: Option<String>,
    #[arg(long, value_name = "FILE", help = "Roll back every target listed in a project config")]
    pub config: Option<PathBuf>,
    #[command(flatten)]
    pub flags: RollbackFlagArgs,
    #[arg(long, help = "Delete files even if they were edited since generation")]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RollbackInteractiveArgs {
    #[command(flatten)]
    pub flags: RollbackFlagArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    #[arg(long, value_name = "NAME")]
    pub layer: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct InitArgs {
    #[arg(long, value_name = "FILE", help = "Where to write, relative to the project")]
    pub output: Option<PathBuf>,
    #[arg(long, help = "Write the JSON Schema of the schema document format instead")]
    pub json_schema: bool,
    #[arg(long, help = "Replace an existing file")]
    pub force: bool,
}

/// Run flags as they appear in a config file or on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialFlags {
    pub force: Option<bool>,
    pub no_translations: Option<bool>,
    pub no_db: Option<bool>,
    pub dry_run: Option<bool>,
    pub auto_relations: Option<bool>,
    pub use_metadata: Option<bool>,
    pub keep_files: Option<bool>,
    pub skip_targets: Option<Vec<TargetKind>>,
}

/// Effective run flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Flags {
    pub force: bool,
    pub no_translations: bool,
    pub no_db: bool,
    pub dry_run: bool,
    pub auto_relations: bool,
    pub use_metadata: bool,
    pub keep_files: bool,
    pub skip_targets: Vec<TargetKind>,
}

impl Default for Flags {
    fn default() -> Self {
        Self {
            force: false,
            no_translations: false,
            no_db: false,
            dry_run: false,
            auto_relations: false,
            use_metadata: true,
            keep_files: false,
            skip_targets: Vec::new(),
        }
    }
}

impl Flags {
    /// Command line beats config file beats defaults. Every time a command
    /// line value replaces a different file value, it is logged.
    pub fn resolve(cli: &PartialFlags, file: &PartialFlags) -> Self {
        let defaults = Flags::default();
        Self {
            force: pick("force", &cli.force, &file.force).unwrap_or(defaults.force),
            no_translations: pick("noTranslations", &cli.no_translations, &file.no_translations)
                .unwrap_or(defaults.no_translations),
            no_db: pick("noDb", &cli.no_db, &file.no_db).unwrap_or(defaults.no_db),
            dry_run: pick("dryRun", &cli.dry_run, &file.dry_run).unwrap_or(defaults.dry_run),
            auto_relations: pick("autoRelations", &cli.auto_relations, &file.auto_relations)
                .unwrap_or(defaults.auto_relations),
            use_metadata: pick("useMetadata", &cli.use_metadata, &file.use_metadata)
                .unwrap_or(defaults.use_metadata),
            keep_files: pick("keepFiles", &cli.keep_files, &file.keep_files)
                .unwrap_or(defaults.keep_files),
            skip_targets: pick("skipTargets", &cli.skip_targets, &file.skip_targets)
                .unwrap_or(defaults.skip_targets),
        }
    }

    /// Enabled target kinds in canonical order.
    pub fn targets(&self) -> Vec<TargetKind> {
        TargetKind::iter()
            .filter(|kind| !(self.no_db && *kind == TargetKind::StorageSchema))
            .filter(|kind| !self.skip_targets.contains(kind))
            .collect()
    }

    pub fn generate_options(&self, dialect: Dialect) -> GenerateOptions {
        GenerateOptions {
            emit: EmitOptions {
                dialect,
                translations: !self.no_translations,
                auto_relations: self.auto_relations,
                use_metadata: self.use_metadata,
                targets: self.targets(),
            },
            force: self.force,
            dry_run: self.dry_run,
        }
    }

    pub fn rollback_options(&self) -> RollbackOptions {
        RollbackOptions {
            dry_run: self.dry_run,
            keep_files: self.keep_files,
            force: self.force,
        }
    }
}

fn pick<T: Clone + PartialEq + Debug>(name: &str, cli: &Option<T>, file: &Option<T>) -> Option<T> {
    match (cli, file) {
        (Some(cli_value), Some(file_value)) if cli_value != file_value => {
            tracing::info!(
                flag = name,
                cli = ?cli_value,
                file = ?file_value,
                "command line overrides config file"
            );
            Some(cli_value.clone())
        }
        (Some(cli_value), _) => Some(cli_value.clone()),
        (None, file_value) => file_value.clone(),
    }
}

/// Dialect precedence: command line, then config file, then the default.
pub fn resolve_dialect(cli: Option<Dialect>, file: Option<Dialect>) -> Dialect {
    pick("dialect", &cli, &file).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn command_line_overrides_file_and_file_overrides_defaults() {
        let cli = PartialFlags {
            force: Some(true),
            use_metadata: Some(false),
            ..PartialFlags::default()
        };
        let file = PartialFlags {
            force: Some(false),
            auto_relations: Some(true),
            skip_targets: Some(vec![TargetKind::UiTable]),
            ..PartialFlags::default()
        };
        let flags = Flags::resolve(&cli, &file);
        assert!(flags.force);
        assert!(!flags.use_metadata);
        assert!(flags.auto_relations);
        assert!(!flags.dry_run);
        assert_eq!(flags.skip_targets, vec![TargetKind::UiTable]);
    }

    #[test]
    fn absent_switches_do_not_mask_file_values() {
        let args = CliArgs::try_parse_from([
            "crudkit",
            "generate",
            "config",
            "crudkit.config.yaml",
            "--dry-run",
        ])
        .unwrap();
        let Command::Generate(GenerateArgs {
            source: Some(GenerateSource::Config(generate)),
            ..
        }) = args.command
        else {
            panic!("expected generate config");
        };
        let cli = generate.flags.to_partial();
        assert_eq!(cli.dry_run, Some(true));
        assert_eq!(cli.auto_relations, None);

        let file = PartialFlags {
            auto_relations: Some(true),
            ..PartialFlags::default()
        };
        let flags = Flags::resolve(&cli, &file);
        assert!(flags.dry_run && flags.auto_relations);
    }

    #[test]
    fn no_db_and_skip_remove_target_kinds() {
        let flags = Flags {
            no_db: true,
            skip_targets: vec![TargetKind::UiList],
            ..Flags::default()
        };
        let targets = flags.targets();
        assert!(!targets.contains(&TargetKind::StorageSchema));
        assert!(!targets.contains(&TargetKind::UiList));
        assert_eq!(targets.len(), 5);
    }

    #[test]
    fn parses_generate_with_options() {
        let args = CliArgs::try_parse_from([
            "crudkit",
            "--project",
            "/tmp/app",
            "generate",
            "shop",
            "products",
            "--schema",
            "products.yaml",
            "--seed",
            "--skip",
            "ui-table",
            "--dialect",
            "postgres",
        ])
        .unwrap();
        assert_eq!(args.project, PathBuf::from("/tmp/app"));
        let Command::Generate(generate) = args.command else {
            panic!("expected generate");
        };
        assert!(generate.source.is_none());
        assert_eq!(generate.layer.as_deref(), Some("shop"));
        assert_eq!(generate.seed, Some(10));
        assert_eq!(generate.dialect, Some(Dialect::Postgres));
        assert_eq!(generate.flags.skip_targets, vec![TargetKind::UiTable]);
    }

    #[test]
    fn single_collection_generate_still_needs_its_arguments() {
        assert!(CliArgs::try_parse_from(["crudkit", "generate", "shop", "products"]).is_err());
        assert!(CliArgs::try_parse_from(["crudkit", "generate", "shop"]).is_err());
        assert!(CliArgs::try_parse_from(["crudkit", "generate", "config"]).is_err());
        let args =
            CliArgs::try_parse_from(["crudkit", "generate", "config", "crudkit.config.yaml"])
                .unwrap();
        let Command::Generate(generate) = args.command else {
            panic!("expected generate");
        };
        assert_matches::assert_matches!(
            generate.source,
            Some(GenerateSource::Config(GenerateConfigArgs { ref config, .. }))
                if config == &PathBuf::from("crudkit.config.yaml")
        );
        assert!(generate.layer.is_none());
    }

    #[test]
    fn rollback_bulk_needs_exactly_one_target() {
        assert!(CliArgs::try_parse_from(["crudkit", "rollback-bulk"]).is_err());
        assert!(
            CliArgs::try_parse_from([
                "crudkit", "rollback-bulk", "--layer", "shop", "--config", "c.yaml"
            ])
            .is_err()
        );
        assert!(CliArgs::try_parse_from(["crudkit", "rollback-bulk", "--layer", "shop"]).is_ok());
    }

    #[test]
    fn dialect_falls_back_to_sqlite() {
        assert_eq!(resolve_dialect(None, None), Dialect::Sqlite);
        assert_eq!(resolve_dialect(None, Some(Dialect::Mysql)), Dialect::Mysql);
        assert_eq!(
            resolve_dialect(Some(Dialect::Postgres), Some(Dialect::Mysql)),
            Dialect::Postgres
        );
    }
}
