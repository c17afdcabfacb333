//! minibench - prompt benchmark harness CLI
//!
//! ## Commands
//!
//! - `run`: run a suite through a runner and an evaluator, print a verdict
//!   and persist a time capsule under `--out`
//! - `list`: show the registered suites, runners or evaluators

mod verdict;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use tracing::{info, Level};

use minibench_codefix::{standard_evaluators, CodefixConfig, HostKind};
use minibench_core::obs::SuiteSpan;
use minibench_core::{
    select_scenarios, utc_stamp, RunSuiteOptions, RunnerRegistry, StandardSuiteLoader,
    SuiteLoader, SuiteOrchestrator, TimeCapsule, BUILTIN_SUITE_IDS,
};

#[derive(Parser)]
#[command(name = "minibench")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run prompt benchmark suites against pluggable runners", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a suite and print a quick verdict
    Run(RunArgs),

    /// List registered components
    List {
        #[arg(value_enum)]
        what: ListTarget,
    },
}

#[derive(clap::Args, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunArgs {
    /// Builtin suite id or path to a suite JSON file
    #[arg(short, long, env = "MINIBENCH_SUITE", default_value = "toy")]
    suite: String,

    /// Scenario filters: exact id, substring, or /regex/
    #[arg(long = "scenario", env = "MINIBENCH_SCENARIOS", num_args = 1.., value_delimiter = ',')]
    scenarios: Vec<String>,

    /// Runner name (see `minibench list runners`)
    #[arg(short, long, env = "MINIBENCH_RUNNER", default_value = "stub")]
    runner: String,

    /// Evaluator name (see `minibench list evaluators`)
    #[arg(short, long, env = "MINIBENCH_EVALUATOR", default_value = "exact")]
    evaluator: String,

    /// Directory that receives time capsules
    #[arg(long, env = "MINIBENCH_OUT", default_value = "runs")]
    out: PathBuf,

    /// Timeout hint forwarded to the runner
    #[arg(long, env = "MINIBENCH_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// Function host used by codefix evaluators
    #[arg(long, env = "MINIBENCH_CODEFIX_HOST", default_value = "embedded")]
    codefix_host: HostKind,

    /// `node` executable for the node codefix host
    #[arg(long, env = "MINIBENCH_NODE_BIN", default_value = "node")]
    node_bin: PathBuf,

    /// Skip writing the time capsule
    #[arg(long, env = "MINIBENCH_NO_CAPSULE")]
    no_capsule: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ListTarget {
    Suites,
    Runners,
    Evaluators,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    minibench_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Run(args) => cmd_run(&args).await,
        Commands::List { what } => cmd_list(what),
    }
}

async fn cmd_run(args: &RunArgs) -> Result<()> {
    let runner = RunnerRegistry::standard().resolve(&args.runner)?;

    let mut codefix = CodefixConfig::default()
        .with_host(args.codefix_host)
        .with_node_bin(args.node_bin.clone());
    if let Some(timeout_ms) = args.timeout_ms {
        codefix = codefix.with_timeout_ms(timeout_ms);
    }
    let evaluator = standard_evaluators(&codefix).resolve(&args.evaluator)?;

    let suite = StandardSuiteLoader::new().load_suite(&args.suite).await?;
    // Fail on an empty selection before anything touches the disk.
    select_scenarios(&suite.scenarios, &args.scenarios)?;

    let capsule = if args.no_capsule {
        None
    } else {
        let capsule = TimeCapsule::create(&args.out, &suite.name, &utc_stamp(Utc::now()))?;
        let config = json!({
            "runner": runner.name(),
            "evaluator": evaluator.name(),
            "codefix": codefix,
            "timeoutMs": args.timeout_ms,
        });
        let args_json = serde_json::to_value(args).context("serialize run arguments")?;
        capsule.write_inputs(&args_json, &suite, &config)?;
        Some(capsule)
    };

    let options = RunSuiteOptions::new(args.suite.clone(), runner.clone(), evaluator.clone())
        .with_filters(args.scenarios.clone())
        .with_timeout_ms(args.timeout_ms);
    let result = SuiteOrchestrator::run_loaded(&suite, &options).await?;

    print!("{}", verdict::render(&result));

    if let Some(capsule) = capsule {
        let run_id = result
            .metadata
            .as_ref()
            .and_then(|m| m.get("runId"))
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        let _span = SuiteSpan::enter(run_id, result.suite_id.as_str());
        let manifest =
            capsule.write_outputs(&args.suite, &suite, &result, runner.name(), evaluator.name())?;
        info!(
            event = "capsule.written",
            capsule_id = %manifest.id,
            dir = %capsule.dir().display(),
            "time capsule written"
        );
        println!("Artifacts: {}", capsule.dir().display());
    }

    Ok(())
}

fn cmd_list(what: ListTarget) -> Result<()> {
    let names: Vec<String> = match what {
        ListTarget::Suites => BUILTIN_SUITE_IDS.iter().map(|s| s.to_string()).collect(),
        ListTarget::Runners => RunnerRegistry::standard().names(),
        ListTarget::Evaluators => standard_evaluators(&CodefixConfig::default()).names(),
    };
    for name in names {
        println!("{}", name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_defaults() {
        let cli = Cli::try_parse_from(["minibench", "run"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.suite, "toy");
        assert_eq!(args.runner, "stub");
        assert_eq!(args.evaluator, "exact");
        assert_eq!(args.out, PathBuf::from("runs"));
        assert_eq!(args.codefix_host, HostKind::Embedded);
        assert!(args.scenarios.is_empty());
        assert!(!args.no_capsule);
    }

    #[test]
    fn scenario_filters_accept_lists() {
        let cli = Cli::try_parse_from([
            "minibench",
            "run",
            "-s",
            "codefix-toy",
            "--scenario",
            "constrained,/^codefix-/",
            "--codefix-host",
            "node",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.scenarios, vec!["constrained", "/^codefix-/"]);
        assert_eq!(args.codefix_host, HostKind::Node);
    }

    #[test]
    fn unknown_codefix_host_is_rejected() {
        assert!(Cli::try_parse_from(["minibench", "run", "--codefix-host", "deno"]).is_err());
    }
}
