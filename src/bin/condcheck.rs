//! condcheck
//!
//! Compile a condition expression and optionally evaluate it against a
//! request described in JSON.

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use tomoyo_cond::condition::RequestSpec;
use tomoyo_cond::{ConditionEngine, EngineConfig};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "condcheck")]
#[command(about = "Compile and evaluate MAC rule conditions")]
struct Args {
    /// Condition expression, e.g. "task.uid=0 path1.type=file"
    expression: String,

    /// JSON request to evaluate against
    #[arg(short = 'r', long)]
    request: Option<PathBuf>,

    /// TOML engine configuration (number groups, quota)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,
}

#[derive(Serialize)]
struct Report {
    condition: String,
    clauses: u16,
    numbers: u16,
    size: usize,
    fingerprint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    matched: Option<bool>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let engine = ConditionEngine::new(&config)?;

    let cond = engine
        .compile(&args.expression)
        .with_context(|| format!("compiling {:?}", args.expression))?;
    info!("Compiled {:?}", args.expression);

    let matched = match &args.request {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading request {}", path.display()))?;
            let spec: RequestSpec = serde_json::from_str(&text)
                .with_context(|| format!("parsing request {}", path.display()))?;
            let mut request = spec.into_request();
            Some(engine.evaluate(Some(&cond), &mut request))
        }
        None => None,
    };

    let report = Report {
        condition: cond.to_string(),
        clauses: cond.clause_count(),
        numbers: cond.number_count(),
        size: cond.size(),
        fingerprint: format!("{:016x}", cond.fingerprint()),
        matched,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    if matched == Some(false) {
        std::process::exit(1);
    }
    Ok(())
}
