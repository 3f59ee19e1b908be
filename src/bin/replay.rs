//! Retrospective replay CLI
//!
//! Replays one historical case phase-by-phase against a memory built from
//! the other cases in the corpus, and prints the per-phase evaluation logs
//! as JSON.
//!
//! ```bash
//! cargo run --bin replay -- --corpus cases.json --case-id kobe-1995
//! ```
//!
//! The corpus file is a JSON object mapping case ids to raw case documents:
//! `{ "kobe-1995": { "identity": {...}, ... }, "tohoku-2011": {...} }`

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use seren::ingest::CaseStudyIngestor;
use seren::types::ExperienceUnit;
use seren::RetrospectiveReplayEvaluator;

#[derive(Parser, Debug)]
#[command(name = "replay")]
#[command(about = "Replay a historical case against the rest of the corpus")]
#[command(version)]
struct CliArgs {
    /// Path to the corpus file (JSON object of case id -> raw case document)
    #[arg(long)]
    corpus: PathBuf,

    /// Case id to replay; the memory is built from every other case
    #[arg(long)]
    case_id: String,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    let raw = std::fs::read_to_string(&args.corpus)
        .with_context(|| format!("failed to read {}", args.corpus.display()))?;
    let corpus: BTreeMap<String, serde_json::Value> =
        serde_json::from_str(&raw).context("corpus is not a JSON object of cases")?;

    let Some(replayed) = corpus.get(&args.case_id) else {
        bail!("case '{}' not found in corpus", args.case_id);
    };

    // Memory from every case except the replayed one: replaying a case the
    // system has already memorized would not evaluate anything.
    let ingestor = CaseStudyIngestor::new();
    let memory: Vec<ExperienceUnit> = corpus
        .iter()
        .filter(|(id, _)| **id != args.case_id)
        .flat_map(|(id, case)| ingestor.experience_units(case, id))
        .collect();

    info!(
        case_id = %args.case_id,
        memory_units = memory.len(),
        "Replaying case against historical memory"
    );

    let logs = RetrospectiveReplayEvaluator::new().replay_case(replayed, &memory);

    let rendered = if args.pretty {
        serde_json::to_string_pretty(&logs)?
    } else {
        serde_json::to_string(&logs)?
    };
    println!("{rendered}");

    Ok(())
}
