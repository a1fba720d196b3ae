mod cli;
mod terminal;

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use glyco_core::{Config, FactSchema};
use glyco_rules::{RuleLoader, RuleSource, RuleStore, RuleWatcher};
use serde_json::Value;
use tracing::{debug, info};

use crate::cli::{CliArgs, Command, EvaluateArgs, OutputFormat, RulesArgs};
use crate::terminal::Terminal;

fn main() -> Result<ExitCode> {
    // .env first: clap reads GLYCO_FORMAT from the environment.
    glyco_core::config::load_dotenv();
    // --help, --version and usage errors exit here, before any logging.
    let args = CliArgs::parse();
    let config = Config::from_env();

    // Logs go to stderr so JSON output on stdout stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.filter)),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    config.log_summary();

    let terminal = Terminal::new();

    match args.command {
        Command::Validate(rules) => validate(&config, &rules, &terminal),
        Command::Evaluate(eval) => evaluate(&config, &eval, &terminal),
        Command::Rules(rules) => list_rules(&config, &rules, &terminal),
    }
}

/// Rules directory and loader, with CLI flags taking precedence over config.
fn rule_loader(config: &Config, args: &RulesArgs) -> (PathBuf, RuleLoader) {
    let dir = args.rules.clone().unwrap_or_else(|| config.rules.dir.clone());
    let loader = RuleLoader::new(FactSchema::diabetes()).strict_ids(args.strict_ids || config.rules.strict_ids);
    (dir, loader)
}

fn validate(config: &Config, args: &RulesArgs, terminal: &Terminal) -> Result<ExitCode> {
    let (dir, loader) = rule_loader(config, args);
    let report = loader.validate(&RuleSource::Dir(dir));
    terminal.print_report(&report)?;
    Ok(if report.is_valid() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn list_rules(config: &Config, args: &RulesArgs, terminal: &Terminal) -> Result<ExitCode> {
    let (dir, loader) = rule_loader(config, args);
    match loader.load(&RuleSource::Dir(dir)) {
        Ok(rules) => {
            terminal.print_rules(&rules)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            terminal.print_load_error(&e)?;
            Ok(ExitCode::FAILURE)
        }
    }
}

fn evaluate(config: &Config, args: &EvaluateArgs, terminal: &Terminal) -> Result<ExitCode> {
    let (dir, loader) = rule_loader(config, &args.rules);
    let rules = match loader.load(&RuleSource::Dir(dir.clone())) {
        Ok(rules) => rules,
        Err(e) => {
            terminal.print_load_error(&e)?;
            return Ok(ExitCode::FAILURE);
        }
    };
    let store = Arc::new(RuleStore::new(rules));

    let _watcher = if args.watch || config.rules.watch {
        let debounce = Duration::from_millis(config.rules.reload_debounce_ms);
        let watcher = RuleWatcher::spawn(Arc::clone(&store), loader.clone(), &dir, debounce)
            .with_context(|| format!("failed to watch {}", dir.display()))?;
        Some(watcher)
    } else {
        None
    };

    let (source, reader): (&str, Box<dyn Read>) = if args.patient == "-" {
        ("stdin", Box::new(io::stdin().lock()))
    } else {
        let file = File::open(&args.patient).with_context(|| format!("failed to open {}", args.patient))?;
        (args.patient.as_str(), Box::new(file))
    };

    let schema = loader.schema();
    let mut seen = 0usize;
    let mut failed = 0usize;
    let records = serde_json::Deserializer::from_reader(BufReader::new(reader)).into_iter::<Value>();
    for (i, record) in records.enumerate() {
        let label = format!("{source} #{}", i + 1);
        let record = record.with_context(|| format!("{label}: malformed JSON"))?;
        seen += 1;

        let Value::Object(raw) = record else {
            terminal.print_error(&format!("{label}: expected a JSON object"))?;
            failed += 1;
            continue;
        };
        let fact = match schema.normalize(&raw) {
            Ok(fact) => fact,
            Err(e) => {
                terminal.print_validation_error(&label, &e)?;
                failed += 1;
                continue;
            }
        };
        debug!(record = %label, fields = fact.len(), "normalized patient record");

        let eval = match store.evaluate(&fact) {
            Ok(eval) => eval,
            Err(e) => {
                terminal.print_error(&format!("{label}: {e}"))?;
                failed += 1;
                continue;
            }
        };
        match args.format {
            OutputFormat::Text => terminal.print_evaluation(&label, &eval)?,
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&eval)?),
        }
    }

    if seen == 0 {
        bail!("no patient record found in {source}");
    }
    info!(records = seen, failed, "evaluation finished");
    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
