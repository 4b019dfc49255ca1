//! Confirmation Gate - operator approval before any execution
//!
//! Displays the resolved command and blocks for an explicit yes/no. This is
//! the only place an `approved = true` verdict can be produced; absence of
//! an explicit approval is always denial, including on EOF.
//!
//! A resolution with no final call short-circuits to denial without
//! prompting - there is nothing to confirm.

use crate::resolution::{Resolution, Verdict};
use chrono::Utc;
use owo_colors::OwoColorize;
use std::io::{self, BufRead, Write};

/// Prompt the operator on stdin/stdout.
pub fn confirm(resolution: Resolution) -> io::Result<Verdict> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout();
    confirm_with(resolution, &mut input, &mut out)
}

/// Prompt on explicit streams. Split out so tests can drive the gate
/// without a terminal.
pub fn confirm_with<R: BufRead, W: Write>(
    resolution: Resolution,
    input: &mut R,
    out: &mut W,
) -> io::Result<Verdict> {
    let Some(final_call) = resolution.final_call.clone() else {
        writeln!(out, "{} no command found for: \"{}\"", "✗".red(), resolution.utterance.text)?;
        return Ok(deny(resolution));
    };

    writeln!(out)?;
    writeln!(out, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
    writeln!(out, "RESOLVED COMMAND")?;
    writeln!(out, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
    writeln!(out, "Heard:     {}", resolution.utterance.text)?;
    writeln!(out, "Command:   {}", final_call.bold())?;
    writeln!(out, "Decided by: {}", resolution.rationale.as_str())?;
    writeln!(out, "Lexical score: {:.2}", resolution.lexical.score)?;
    if let Some(semantic) = &resolution.semantic {
        writeln!(
            out,
            "Intent:    {} (confidence {:.2})",
            semantic.intent, semantic.confidence
        )?;
    }
    writeln!(out)?;
    write!(out, "Execute this command? (y/n): ")?;
    out.flush()?;

    let mut line = String::new();
    let bytes = input.read_line(&mut line)?;

    // EOF without an answer is a denial.
    let approved = bytes > 0
        && (line.trim().eq_ignore_ascii_case("y") || line.trim().eq_ignore_ascii_case("yes"));

    if approved {
        writeln!(out, "\n{} Confirmed.", "✓".green())?;
    } else {
        writeln!(out, "\n{} Cancelled. No command was executed.", "✗".red())?;
    }

    Ok(Verdict {
        resolution,
        approved,
        decided_at: Utc::now(),
    })
}

fn deny(resolution: Resolution) -> Verdict {
    Verdict {
        resolution,
        approved: false,
        decided_at: Utc::now(),
    }
}
