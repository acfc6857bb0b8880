//! swagcheck CLI - run the x-test examples of a Swagger description against a live server

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use swagcheck_core::{
    Config, Outcome, Plan, ScenarioResult, SuiteReport, VerdictStatus, to_http_file,
};
use swagcheck_runner::{HttpDispatcher, SuiteRunner};

#[derive(Parser)]
#[command(name = "swagcheck")]
#[command(about = "Run the x-test examples of a Swagger description against a live server")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, global = true, default_value = "terminal")]
    output: OutputFormat,

    /// Verbose output (debug logging; RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize scenarios and run them
    Run {
        #[command(flatten)]
        source: SourceArgs,

        /// Output directory for reproduction files
        #[arg(short, long, default_value = ".swagcheck")]
        output_dir: PathBuf,

        /// Only run operations whose "METHOD /uri" contains this text
        #[arg(long)]
        filter: Option<String>,

        /// Stop at the first scenario that does not pass
        #[arg(long)]
        stop_on_failure: bool,
    },

    /// Show synthesized scenarios without sending requests
    Plan {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Initialize config file
    Init,

    /// Export JSON Schema for the scenario output
    Schema,
}

/// Where the description comes from and what overrides apply
#[derive(Args)]
struct SourceArgs {
    /// Config file (default: .swagcheck.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// API description (overrides config)
    #[arg(short, long)]
    spec: Option<PathBuf>,

    /// Target host, e.g. localhost:8080 (overrides config and description)
    #[arg(long)]
    host: Option<String>,

    /// Base path (overrides config and description)
    #[arg(long)]
    base_path: Option<String>,

    /// Placeholder value as name=value; value is parsed as JSON, else taken as a string
    #[arg(long = "var", value_parser = parse_var)]
    vars: Vec<(String, Value)>,
}

impl SourceArgs {
    fn load(self) -> Result<Config> {
        let mut cfg = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::load_default()?,
        };
        if let Some(spec) = self.spec {
            cfg.spec = spec;
        }
        if let Some(host) = self.host {
            cfg.host = Some(host);
        }
        if let Some(base_path) = self.base_path {
            cfg.base_path = Some(base_path);
        }
        cfg.variables.extend(self.vars);
        Ok(cfg)
    }
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq)]
enum OutputFormat {
    Terminal,
    Json,
    Silent,
}

fn parse_var(raw: &str) -> Result<(String, Value), String> {
    let Some((name, value)) = raw.split_once('=') else {
        return Err(format!("expected name=value, got '{raw}'"));
    };
    let name = name.trim().trim_start_matches('$');
    if name.is_empty() {
        return Err(format!("missing variable name in '{raw}'"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((name.to_string(), value))
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(3)
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Run {
            source,
            output_dir,
            filter,
            stop_on_failure,
        } => {
            let cfg = source.load()?;
            let runner = SuiteRunner::from_config(&cfg)
                .with_filter(filter)
                .with_stop_on_failure(stop_on_failure || cfg.stop_on_failure);

            if cli.output != OutputFormat::Silent {
                eprintln!("Config:");
                eprintln!("  spec:    {}", cfg.spec.display());
                if let Some(host) = &cfg.host {
                    eprintln!("  host:    {host}");
                }
                if !cfg.variables.is_empty() {
                    eprintln!("  vars:    {} configured", cfg.variables.len());
                }
                eprintln!();
            }

            let set = runner.synthesize()?;
            if set.is_empty() {
                bail!(
                    "no x-test scenarios found in {}",
                    runner.spec_path().display()
                );
            }

            let start = Instant::now();
            let dispatcher = HttpDispatcher::new(Duration::from_secs(cfg.timeout_secs))?;
            let report = runner.run_with(&set, &dispatcher);
            let duration_secs = start.elapsed().as_secs_f64();
            let verdict = report.verdict();

            match cli.output {
                OutputFormat::Terminal => {
                    print_results(&report);
                    println!("\n{}: {}", verdict.status, verdict.reason);
                    println!(
                        "  Scenarios: {} total, {} passed, {} failed, {} errors ({duration_secs:.2}s)",
                        report.total(),
                        report.passed(),
                        report.failed(),
                        report.errored()
                    );
                    if report.stopped_early {
                        println!("  Stopped at first failure");
                    }
                    println!("  Exit code: {}", verdict.exit_code);

                    if verdict.status == VerdictStatus::Fail {
                        match write_reproductions(&report, &output_dir) {
                            Ok(Some(path)) => println!("Reproductions: {}", path.display()),
                            Ok(None) => {}
                            Err(e) => eprintln!("Warning: failed to write .http file: {e:#}"),
                        }
                    }
                }
                OutputFormat::Json => {
                    let json_output = serde_json::json!({
                        "verdict": {
                            "status": verdict.status.to_string(),
                            "exit_code": verdict.exit_code,
                            "reason": verdict.reason,
                        },
                        "stats": {
                            "total": report.total(),
                            "passed": report.passed(),
                            "failed": report.failed(),
                            "errored": report.errored(),
                            "duration_secs": duration_secs,
                        },
                        "stopped_early": report.stopped_early,
                        "results": report.results,
                    });
                    println!("{}", serde_json::to_string_pretty(&json_output)?);
                }
                OutputFormat::Silent => {}
            }

            Ok(verdict.exit_code)
        }

        Commands::Plan { source } => {
            let cfg = source.load()?;
            let runner = SuiteRunner::from_config(&cfg);
            let set = runner.synthesize()?;
            let plan = Plan::build(&set, runner.spec_path());

            match cli.output {
                OutputFormat::Terminal => println!("{}", plan.to_terminal()),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
                OutputFormat::Silent => {}
            }
            Ok(i32::from(plan.has_errors()))
        }

        Commands::Init => {
            let config_path = ".swagcheck.toml";
            if Path::new(config_path).exists() {
                eprintln!("{config_path} already exists");
                return Ok(1);
            }

            std::fs::write(config_path, Config::example())?;
            println!("Created {config_path}");
            println!("\nEdit the file to configure:");
            println!("  - spec: path to your Swagger description");
            println!("  - host: server to test");
            println!("  - variables: values for $placeholders in x-test examples");
            Ok(0)
        }

        Commands::Schema => {
            let schema = swagcheck_core::generate_schema()?;
            println!("{schema}");
            Ok(0)
        }
    }
}

fn print_results(report: &SuiteReport) {
    for result in &report.results {
        println!("{:<5} {}", result.outcome().to_string(), result.label());
        print_detail(result);
    }
}

fn print_detail(result: &ScenarioResult) {
    match result.outcome() {
        Outcome::Passed => {}
        Outcome::Failed => {
            for m in &result.mismatches {
                println!("        {m}");
            }
        }
        Outcome::Errored => {
            if let Some(err) = &result.error {
                println!("        {err}");
            }
        }
    }
}

/// Write `reproductions.http` for every scenario that did not pass.
fn write_reproductions(report: &SuiteReport, output_dir: &Path) -> Result<Option<PathBuf>> {
    let failures: Vec<&ScenarioResult> = report.failures().collect();
    if failures.is_empty() {
        return Ok(None);
    }
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("cannot create {}", output_dir.display()))?;
    let path = output_dir.join("reproductions.http");
    std::fs::write(&path, to_http_file(&failures))
        .with_context(|| format!("cannot write {}", path.display()))?;
    Ok(Some(path))
}
