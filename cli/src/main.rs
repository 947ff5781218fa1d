//! CLI entrypoint for llm-council
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use clap::Parser;
use council_application::{AuditSink, DecideInput, EvaluationBackend, GenerationBackend, RunCouncilUseCase};
use council_domain::{StageEvent, Verdict};
use council_infrastructure::{
    ConfigLoader, FileConfig, JsonlAuditSink, MockEvaluation, MockGeneration, OpenAiCompatBackend,
};
use council_presentation::{Cli, Command, ConsoleFormatter, OutputFormat, ProgressReporter};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let file_config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).map_err(|e| anyhow::anyhow!("{e}"))?
    };

    if let Some(Command::Stats { recent }) = cli.command {
        return show_stats(&file_config, recent);
    }

    let query = match cli.query {
        Some(q) => q,
        None => bail!("A query is required. See --help for usage."),
    };

    let mut council_config = file_config.to_council_config();
    if cli.no_refine {
        council_config.skip_synthesis = true;
    }

    info!("starting llm-council");

    // === Dependency Injection ===
    let (generation, evaluation): (Arc<dyn GenerationBackend>, Arc<dyn EvaluationBackend>) =
        if cli.mock {
            (Arc::new(MockGeneration), Arc::new(MockEvaluation))
        } else {
            let backend = Arc::new(
                OpenAiCompatBackend::from_config(&file_config.backend)
                    .context("failed to build the LLM backend")?,
            );
            (backend.clone(), backend)
        };

    let cancel = CancellationToken::new();
    let mut pipeline = RunCouncilUseCase::new(council_config, generation, evaluation)?
        .with_cancellation(cancel.clone());

    if file_config.audit.enabled {
        match JsonlAuditSink::new(&file_config.audit.path) {
            Ok(sink) => {
                pipeline = pipeline.with_audit_sink(Arc::new(sink) as Arc<dyn AuditSink>);
            }
            Err(e) => warn!(path = %file_config.audit.path, "audit trail disabled: {e}"),
        }
    }

    let show_progress = !cli.quiet && !cli.stream && matches!(cli.output, OutputFormat::Full | OutputFormat::Answer);
    if show_progress {
        pipeline = pipeline.with_progress(Arc::new(ProgressReporter::new()));
    }

    // Ctrl-C cancels the in-flight run
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_cancel.cancel();
        }
    });

    let mut input = DecideInput::new(query);
    if let Some(limit) = cli.word_limit {
        input = input.with_word_limit(limit);
    }

    let verdict = if cli.stream {
        run_staged(&pipeline, input, cli.quiet).await?
    } else {
        pipeline.decide(input).await?
    };

    let output = match cli.output {
        OutputFormat::Json => ConsoleFormatter::format_json(&verdict),
        OutputFormat::Full => ConsoleFormatter::format_verdict(&verdict, true),
        OutputFormat::Answer => ConsoleFormatter::format_verdict(&verdict, false),
    };
    println!("{}", output);

    if verdict.is_blocked() {
        std::process::exit(2);
    }
    Ok(())
}

/// Consume the staged event stream, printing generation progress as the
/// drafts fill in, and return the terminal verdict.
async fn run_staged(
    pipeline: &RunCouncilUseCase,
    input: DecideInput,
    quiet: bool,
) -> Result<Verdict> {
    let mut rx = pipeline.decide_staged(input);

    while let Some(event) = rx.recv().await {
        match event {
            StageEvent::Start => {
                if !quiet {
                    eprintln!("council convened, generating drafts...");
                }
            }
            StageEvent::Agents(responses) => {
                if !quiet {
                    eprint!("\r{}", ConsoleFormatter::format_stage_status(&responses));
                }
            }
            StageEvent::Judges { evaluations, .. } => {
                if !quiet {
                    eprintln!("\ndrafts complete, {} evaluations in", evaluations.len());
                }
            }
            StageEvent::Blocked(blocked) => {
                return Ok(Verdict::Blocked(blocked));
            }
            StageEvent::Final(decision) => {
                if !quiet {
                    eprintln!();
                }
                return Ok(Verdict::Decided(decision));
            }
        }
    }

    // The worker only hangs up without a terminal event when cancelled
    bail!("run cancelled before a verdict was reached")
}

/// Print audit-trail statistics and the most recent decisions
fn show_stats(file_config: &FileConfig, recent: usize) -> Result<()> {
    let sink = JsonlAuditSink::new(&file_config.audit.path)
        .with_context(|| format!("cannot open audit trail at {}", file_config.audit.path))?;

    let stats = sink.stats();
    println!("Audit trail: {}", file_config.audit.path);
    println!("  Total runs:  {}", stats.total);
    println!("  Decided:     {}", stats.decided);
    println!("  Blocked:     {}", stats.blocked);
    if let Some(avg) = stats.average_confidence {
        println!("  Avg confidence: {:.0}%", avg * 100.0);
    }
    if !stats.by_risk.is_empty() {
        println!("  By risk level:");
        for (level, count) in &stats.by_risk {
            println!("    {level}: {count}");
        }
    }

    let records = sink.recent(recent);
    if !records.is_empty() {
        println!("\nRecent decisions:");
        for record in records {
            println!(
                "  {} [{}] query {} safety_passed={}",
                record.log_timestamp.format("%Y-%m-%d %H:%M:%S"),
                record.decision_id,
                record.query_hash,
                record.safety_passed,
            );
        }
    }

    Ok(())
}
