//! CLI utility helpers

use declgen::{Diagnostic, GenerationReport, Outcome, Result};
use serde::Serialize;

/// Print diagnostics to stderr, one per line
pub fn print_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        eprintln!("{}", diagnostic);
    }
}

/// Print a value as pretty JSON to stdout
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One-line summary of a run
pub fn summary(report: &GenerationReport) -> String {
    format!(
        "{} generated, {} incomplete, {} failed",
        report.count(Outcome::Generated),
        report.count(Outcome::Incomplete),
        report.count(Outcome::Failed)
    )
}

#[derive(Serialize)]
pub struct RunOutput<'a> {
    pub report: &'a GenerationReport,
    pub diagnostics: &'a [Diagnostic],
}
