//! otelprep - Entry point
//!
//! Resolves the configuration, sets up logging and patches the collector
//! documents. Exits with status 1 on any error.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use tracing::{error, info, warn};

use otelprep::{RunOptions, Runner};
use otelprep_config::{sources::PRECEDENCE, tool_log_level, Environment, Profile};
use otelprep_core::Document;
use otelprep_telemetry::{init_logging, LogConfig, LogLevel};

/// Command-line arguments.
struct Args {
    options: RunOptions,
    /// Optional `.env` file loaded under the process environment.
    env_file: Option<PathBuf>,
    /// Resolve and print a summary without touching any document.
    check: bool,
    /// Human-readable log lines instead of JSON.
    pretty: bool,
}

impl Args {
    fn parse() -> anyhow::Result<Self> {
        let mut args = std::env::args().skip(1);
        let mut options = RunOptions::default();
        let mut env_file = None;
        let mut check = false;
        let mut pretty = false;

        while let Some(arg) = args.next() {
            let mut value = || {
                args.next()
                    .with_context(|| format!("{arg} requires a value"))
            };
            match arg.as_str() {
                "--config" | "-c" => options.config_path = PathBuf::from(value()?),
                "--profile" | "-p" => {
                    options.profile = value()?.parse::<Profile>()?;
                }
                "--otel-config" => options.collector_path = PathBuf::from(value()?),
                "--aux-config" => options.auxiliary_path = PathBuf::from(value()?),
                "--fragments" => options.fragments_path = PathBuf::from(value()?),
                "--handoff" => options.handoff_path = PathBuf::from(value()?),
                "--env-file" => env_file = Some(PathBuf::from(value()?)),
                "--check" => check = true,
                "--pretty" => pretty = true,
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("otelprep {}", otelprep::VERSION);
                    std::process::exit(0);
                }
                other => {
                    anyhow::bail!("Unknown argument: {other}\nUse --help for usage information");
                }
            }
        }

        Ok(Self {
            options,
            env_file,
            check,
            pretty,
        })
    }
}

fn print_help() {
    let profiles: Vec<_> = Profile::ALL.iter().map(Profile::name).collect();
    let variables: String = PRECEDENCE
        .iter()
        .filter_map(|field| field.env.map(|var| format!("    {var:<26}{}\n", field.name())))
        .collect();

    println!(
        r"otelprep - OpenTelemetry collector preparation

USAGE:
    otelprep [OPTIONS]

OPTIONS:
    -c, --config <PATH>        Configuration file (YAML, JSON or TOML)
                               [default: {config}]
    -p, --profile <NAME>       Deployment profile: {profiles}
                               [default: postgres-multi]
        --otel-config <PATH>   Collector document [default: {collector}]
        --aux-config <PATH>    CloudWatch exporter document [default: {aux}]
        --fragments <PATH>     Namespace fragments [default: {fragments}]
        --handoff <PATH>       .env file for the log shipper and exporter
                               [default: {handoff}]
        --env-file <PATH>      Load variables from a .env file first
        --check                Validate and print a redacted summary only
        --pretty               Human-readable log output
    -h, --help                 Print help information
    -v, --version              Print version information

ENVIRONMENT VARIABLES:
    A set, non-empty variable overrides the file field next to it.

{variables}
NOTES:
    Documents are rewritten in place without locking. Run one otelprep
    process per set of target documents.
",
        config = otelprep::DEFAULT_CONFIG_PATH,
        collector = otelprep::DEFAULT_COLLECTOR_PATH,
        aux = otelprep::DEFAULT_AUXILIARY_PATH,
        fragments = otelprep::DEFAULT_FRAGMENTS_PATH,
        handoff = otelprep::DEFAULT_HANDOFF_PATH,
        profiles = profiles.join(", "),
    );
}

fn main() -> ExitCode {
    let args = match Args::parse() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e:#}");
            return ExitCode::FAILURE;
        }
    };

    let env = match &args.env_file {
        Some(path) => match Environment::from_process_with_dotenv(path) {
            Ok(env) => env,
            Err(e) => {
                eprintln!("Failed to load {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => Environment::from_process(),
    };

    let runner = Runner::new(args.options, env);
    let input = runner.load_config();

    // The level comes from the configuration, so it is read before logging
    // starts and before the rest of the file is validated.
    let level = tool_log_level(input.as_ref().unwrap_or(&Document::Null), runner.env());
    let log_config = if args.pretty {
        LogConfig::development().with_level(LogLevel::from_user(&level))
    } else {
        LogConfig::default().with_level(LogLevel::from_user(&level))
    };
    if let Err(e) = init_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match run(&runner, input, args.check) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "otelprep failed");
            ExitCode::FAILURE
        }
    }
}

fn run(runner: &Runner, input: otelprep::RunResult<Document>, check: bool) -> anyhow::Result<()> {
    let options = runner.options();
    info!(
        version = otelprep::VERSION,
        profile = %options.profile,
        config = %options.config_path.display(),
        "Starting otelprep"
    );

    let input = input.context("Failed to load configuration")?;
    let config = runner
        .resolve(&input)
        .context("Failed to resolve configuration")?;

    if check {
        let summary = serde_json::to_string_pretty(&config.summary())
            .context("Failed to render configuration summary")?;
        println!("{summary}");
        return Ok(());
    }

    let report = runner
        .apply(&config)
        .with_context(|| format!("Failed to patch {}", options.collector_path.display()))?;

    if report.dropped_instances > 0 {
        warn!(
            dropped = report.dropped_instances,
            "Some instances were left out; see earlier warnings"
        );
    }
    info!(
        receivers = report.receivers,
        auxiliary = ?report.auxiliary,
        handoff_vars = report.handoff_vars,
        "Collector documents ready"
    );
    Ok(())
}
