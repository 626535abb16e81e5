use clap::Parser;
use crudkit::report::{ReportFormat, render_error};
use crudkit::{CliArgs, LoggingConfig, execute, init_logging};

fn main() -> anyhow::Result<()> {
    let logging_config = LoggingConfig::from_env();
    let guard = init_logging(logging_config)?;

    let cli = CliArgs::parse();
    let exit_code = match execute(&cli) {
        Ok(output) => {
            print!("{}", output.report);
            output.exit_code
        }
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            let rendered = render_error(&err, cli.format);
            match cli.format {
                ReportFormat::Json => println!("{rendered}"),
                ReportFormat::Text => eprint!("{rendered}"),
            }
            1
        }
    };

    // Flush buffered log lines before exiting.
    drop(guard);
    std::process::exit(exit_code);
}
