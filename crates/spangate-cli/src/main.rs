use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use spangate_core::{spans_from_json, SpanRecord};
use spangate_lookup::{BpmnFileIndex, FsFileCheck};
use spangate_validate::{DodValidator, RuleTable, SpanValidator};

#[derive(Parser)]
#[command(name = "spangate", version)]
#[command(about = "Span validation and health scoring for exported traces")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Score a span collection for structural and semantic health
    Validate {
        /// JSON array of exported span records
        #[arg(long)]
        spans: PathBuf,

        /// Optional rule table YAML (defaults to the built-in table)
        #[arg(long)]
        rules: Option<PathBuf>,

        /// Write the report here instead of stdout
        #[arg(short = 'o', long)]
        out: Option<PathBuf>,

        /// Exit non-zero when the health score falls below this
        #[arg(long, default_value_t = 0.8)]
        fail_below: f64,

        /// Refuse input containing blank-named spans instead of scoring
        /// them as invalid
        #[arg(long)]
        strict: bool,
    },

    /// Strict Definition of Done validation with lie detection
    Dod {
        /// JSON array of exported span records
        #[arg(long)]
        spans: PathBuf,

        /// Optional rule table YAML (defaults to the built-in table)
        #[arg(long)]
        rules: Option<PathBuf>,

        /// Write the report here instead of stdout
        #[arg(short = 'o', long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let gate_passed = match cli.cmd {
        Command::Validate {
            spans,
            rules,
            out,
            fail_below,
            strict,
        } => {
            let spans = load_spans(&spans)?;
            if strict {
                for span in &spans {
                    span.check_named()
                        .with_context(|| format!("span id {}", span.span_id))?;
                }
            }
            let validator = SpanValidator::with_rules(load_rules(rules.as_deref())?);
            let report = validator.validate(&spans);
            info!(
                health = report.health_score,
                valid = report.valid_spans,
                total = report.total_spans,
                "validation complete"
            );
            emit(&report, out.as_deref())?;
            report.health_score >= fail_below
        }
        Command::Dod { spans, rules, out } => {
            let spans = load_spans(&spans)?;
            let validator = DodValidator::with_rules(
                load_rules(rules.as_deref())?,
                Box::new(FsFileCheck),
                Box::new(BpmnFileIndex::new()),
            );
            let report = validator.validate(&spans);
            info!(
                trust = report.trust_score,
                lies = report.lies_detected.len(),
                is_done = report.is_done,
                "definition-of-done validation complete"
            );
            emit(&report, out.as_deref())?;
            report.is_done
        }
    };

    if !gate_passed {
        std::process::exit(1);
    }
    Ok(())
}

fn load_spans(path: &Path) -> Result<Vec<SpanRecord>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("read spans: {}", path.display()))?;
    spans_from_json(&json).with_context(|| format!("parse spans: {}", path.display()))
}

fn load_rules(path: Option<&Path>) -> Result<RuleTable> {
    match path {
        Some(p) => RuleTable::load_from(p),
        None => Ok(RuleTable::default()),
    }
}

fn emit<T: serde::Serialize>(report: &T, out: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    match out {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
