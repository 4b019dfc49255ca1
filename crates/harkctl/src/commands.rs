//! Command handlers for harkctl
//!
//! Error policy: catalogue and classifier construction failures are fatal
//! before any utterance is touched; per-utterance problems degrade inside
//! the arbiter. Audit write failures are surfaced immediately - a verdict
//! that cannot be persisted is an operator problem, never a silent drop.

use anyhow::{bail, Context, Result};
use hark_common::{
    confirm, run_system_call, Arbiter, ArbiterPolicy, AudioRef, AuditLog, Catalogue, HarkConfig,
    HttpClassifier, Utterance,
};
use owo_colors::OwoColorize;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// One record of the original transcription batch format.
#[derive(Debug, Deserialize)]
struct BatchEntry {
    #[serde(default)]
    filename: String,
    transcription: String,
}

fn build_arbiter(config: &HarkConfig) -> Result<Arbiter> {
    let catalogue =
        Catalogue::load(&config.catalogue.path).context("loading command catalogue")?;
    let classifier =
        HttpClassifier::new(config.classifier.clone()).context("initializing classifier backend")?;
    let policy = ArbiterPolicy {
        strategy: config.matcher.strategy,
        lexical_threshold: config.matcher.threshold,
        semantic_threshold: config.classifier.threshold,
    };
    Ok(Arbiter::new(catalogue, Box::new(classifier), policy))
}

/// Resolve one utterance end to end.
pub fn resolve(
    config: &HarkConfig,
    text: Option<String>,
    file: Option<std::path::PathBuf>,
    source: Option<String>,
    dry_run: bool,
) -> Result<()> {
    let text = match (text, file) {
        (Some(text), _) => text,
        (None, Some(path)) => fs::read_to_string(&path)
            .with_context(|| format!("reading transcript {}", path.display()))?
            .trim()
            .to_string(),
        (None, None) => bail!("provide --text or --file"),
    };

    let arbiter = build_arbiter(config)?;
    let audit_log = AuditLog::open(&config.audit.path).context("opening audit store")?;

    let utterance = Utterance::new(text, AudioRef(source.unwrap_or_default()));
    process_utterance(&arbiter, &audit_log, utterance, dry_run)
}

/// Resolve a transcription batch sequentially: one utterance is fully
/// resolved, confirmed and logged before the next is considered.
pub fn batch(config: &HarkConfig, file: &Path, dry_run: bool) -> Result<()> {
    let content = fs::read_to_string(file)
        .with_context(|| format!("reading transcriptions {}", file.display()))?;
    let entries: Vec<BatchEntry> =
        serde_json::from_str(&content).context("parsing transcriptions file")?;

    if entries.is_empty() {
        println!("No transcriptions to process.");
        return Ok(());
    }

    let arbiter = build_arbiter(config)?;
    let audit_log = AuditLog::open(&config.audit.path).context("opening audit store")?;

    let total = entries.len();
    for (i, entry) in entries.into_iter().enumerate() {
        println!("\n[{}/{}] {}", i + 1, total, entry.filename);
        let utterance = Utterance::new(entry.transcription, AudioRef(entry.filename));
        process_utterance(&arbiter, &audit_log, utterance, dry_run)?;
    }
    Ok(())
}

fn process_utterance(
    arbiter: &Arbiter,
    audit_log: &AuditLog,
    utterance: Utterance,
    dry_run: bool,
) -> Result<()> {
    let resolution = arbiter
        .resolve(utterance)
        .context("classifier backend failed")?;

    let verdict = confirm(resolution).context("reading operator confirmation")?;

    // Persist before executing: the trail must show the verdict even if the
    // command itself fails.
    audit_log
        .append(&verdict)
        .context("writing audit record")?;

    if !verdict.approved {
        return Ok(());
    }

    let Some(final_call) = verdict.resolution.final_call.as_deref() else {
        return Ok(());
    };

    if dry_run {
        println!("{} dry run: skipping `{}`", "→".yellow(), final_call);
        return Ok(());
    }

    let outcome = run_system_call(final_call).context("executing command")?;
    if outcome.success() {
        println!("{} `{}` finished in {} ms", "✓".green(), final_call, outcome.duration_ms);
        if !outcome.stdout.is_empty() {
            print!("{}", outcome.stdout);
        }
    } else {
        println!(
            "{} `{}` exited with code {}",
            "✗".red(),
            final_call,
            outcome.exit_code
        );
        if !outcome.stderr.is_empty() {
            eprint!("{}", outcome.stderr);
        }
    }
    Ok(())
}

/// List audit records, oldest first, for external accuracy review.
pub fn audit(config: &HarkConfig, limit: Option<usize>) -> Result<()> {
    let audit_log = AuditLog::open(&config.audit.path).context("opening audit store")?;
    let records: Vec<_> = audit_log.query_all().context("reading audit store")?.collect();

    if records.is_empty() {
        println!("Audit store is empty.");
        return Ok(());
    }

    let skip = limit.map_or(0, |l| records.len().saturating_sub(l));
    for record in &records[skip..] {
        let mark = if record.approved { "✓" } else { "✗" };
        println!(
            "{} {}  \"{}\"  lexical {:.2}  semantic {}  {}  → {}",
            mark,
            record.decided_at.to_rfc3339(),
            record.utterance,
            record.lexical_score,
            record
                .semantic_confidence
                .map_or("-".to_string(), |c| format!("{c:.2}")),
            record.rationale,
            record.final_call.as_deref().unwrap_or("(none)"),
        );
    }
    println!("\n{} records", records.len());
    Ok(())
}

/// Validate the catalogue and print its entries.
pub fn catalogue(config: &HarkConfig) -> Result<()> {
    let catalogue =
        Catalogue::load(&config.catalogue.path).context("loading command catalogue")?;

    println!(
        "{} valid entries in {}",
        catalogue.len(),
        config.catalogue.path.display()
    );
    for entry in catalogue.entries() {
        let trigger = if entry.trigger_phrase.is_empty() {
            "(semantic only)".to_string()
        } else {
            format!("\"{}\"", entry.trigger_phrase)
        };
        println!("  {}  {}  → {}", entry.intent.bold(), trigger, entry.system_call);
    }
    Ok(())
}
