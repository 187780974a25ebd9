mod config;
mod logging;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use skygen_client::http::wire::encode_event;
use skygen_client::{ClientError, HttpTableService, InMemoryTableService, TableService};
use skygen_generate::{Orchestrator, RandomSource, RunError, RunOptions, resolve_seed};
use skygen_script::{ScriptError, load_script, script_json_schema};
use thiserror::Error;

use config::{FileConfig, FlagValues, RunSettings, load_config};
use logging::init_logging;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("unable to read config {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config file: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("script error: {0}")]
    Script(#[from] ScriptError),
    #[error("client error: {0}")]
    Client(#[from] ClientError),
    #[error("{} failed: {0}", .0.stage())]
    Run(#[from] RunError),
    #[error("logging error: {0}")]
    Logging(String),
    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Parser, Debug)]
#[command(
    name = "skygen",
    version,
    about = "Stream synthetic event data into an event store",
    args_conflicts_with_subcommands = true,
    subcommand_negates_reqs = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    #[command(flatten)]
    run: RunArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load and validate a script without contacting the server.
    Validate(ValidateArgs),
    /// Print the JSON Schema of the script format.
    Schema,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Script file to generate from.
    #[arg(value_name = "SCRIPT", required = true)]
    script: Option<PathBuf>,
    /// Event store host.
    #[arg(short = 'H', long)]
    host: Option<String>,
    /// Event store port.
    #[arg(short, long)]
    port: Option<u16>,
    /// Target table name.
    #[arg(short, long)]
    table: Option<String>,
    /// Delete and recreate the table if it exists.
    #[arg(long, default_value_t = false)]
    overwrite: bool,
    /// Number of objects to generate.
    #[arg(short, long)]
    iterations: Option<u64>,
    /// Random seed; 0 or absent picks one from the clock.
    #[arg(long)]
    seed: Option<u64>,
    /// Print debug logs to stderr.
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
    /// Request timeout in seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Append NDJSON logs to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// TOML file providing defaults for the flags above.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Generate against an in-memory store and print events as NDJSON.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct ValidateArgs {
    /// Script file to validate.
    script: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let outcome = match cli.command {
        Some(Command::Validate(args)) => run_validate(args),
        Some(Command::Schema) => print_schema(),
        None => run_generate(cli.run).await,
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run_generate(args: RunArgs) -> Result<(), CliError> {
    let RunArgs {
        script,
        host,
        port,
        table,
        overwrite,
        iterations,
        seed,
        verbose,
        timeout_secs,
        log_file,
        config,
        dry_run,
    } = args;

    let script_path =
        script.ok_or_else(|| CliError::InvalidConfig("script filename required".to_string()))?;
    let file_config = match config {
        Some(path) => load_config(&path)?,
        None => FileConfig::default(),
    };
    let settings = RunSettings::resolve(
        FlagValues {
            host,
            port,
            table,
            overwrite,
            iterations,
            seed,
            verbose,
            timeout_secs,
            log_file,
        },
        file_config,
    )?;
    init_logging(settings.verbose, settings.log_file.as_deref())?;

    let seed = resolve_seed(settings.seed);
    println!("Generating using seed... {seed}");

    let validated = load_script(&script_path)?;
    for warning in &validated.warnings {
        tracing::warn!(event = "script_warning", code = %warning.code, path = %warning.path, "{}", warning.message);
    }
    let script = validated.script;

    let mut options = RunOptions::new(settings.table.clone(), settings.iterations);
    options.overwrite = settings.overwrite;
    let mut rng = RandomSource::new(seed);

    if dry_run {
        let service = InMemoryTableService::new();
        Orchestrator::new(&service, &script, options)
            .run(&mut rng)
            .await?;
        let mut stdout = io::stdout().lock();
        for event in service.events(&settings.table) {
            stdout.write_all(&encode_event(&event)?)?;
        }
        return Ok(());
    }

    let service = HttpTableService::new(&settings.client_options())?;
    tracing::debug!(backend = service.backend(), target = %service.target(), "event store client ready");
    let report = Orchestrator::new(&service, &script, options)
        .run(&mut rng)
        .await?;
    tracing::info!(
        event = "summary",
        objects = report.objects,
        events = report.events,
        added_properties = report.sync.added.len(),
        duration_ms = report.duration_ms
    );
    Ok(())
}

fn run_validate(args: ValidateArgs) -> Result<(), CliError> {
    init_logging(false, None)?;
    let validated = load_script(&args.script)?;
    for warning in &validated.warnings {
        println!("warning {warning}");
    }
    println!("{}: ok", args.script.display());
    Ok(())
}

fn print_schema() -> Result<(), CliError> {
    let schema = script_json_schema();
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn short_flags_match_the_documented_names() {
        let cli = Cli::try_parse_from([
            "skygen",
            "-H",
            "events.local",
            "-p",
            "9000",
            "-t",
            "logins",
            "-i",
            "3",
            "--seed",
            "42",
            "-v",
            "login.script.json",
        ])
        .unwrap();

        assert!(cli.command.is_none());
        assert_eq!(cli.run.host.as_deref(), Some("events.local"));
        assert_eq!(cli.run.port, Some(9000));
        assert_eq!(cli.run.table.as_deref(), Some("logins"));
        assert_eq!(cli.run.iterations, Some(3));
        assert_eq!(cli.run.seed, Some(42));
        assert!(cli.run.verbose);
        assert_eq!(cli.run.script, Some(PathBuf::from("login.script.json")));
    }

    #[test]
    fn script_is_required_for_runs() {
        assert!(Cli::try_parse_from(["skygen", "-t", "logins"]).is_err());
    }

    #[test]
    fn subcommands_do_not_need_a_script() {
        let cli = Cli::try_parse_from(["skygen", "schema"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Schema)));

        let cli = Cli::try_parse_from(["skygen", "validate", "login.script.json"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Validate(_))));
    }
}
