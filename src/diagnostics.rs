//! Structured diagnostics bound to a source location
//!
//! Every component reports usage violations through a [`DiagnosticSink`]
//! handle passed down explicitly. The shared sink must accept appends from
//! several worker threads; each worker collects one declaration's messages in
//! a [`DiagnosticBuffer`] and flushes them in one go so that their relative
//! order survives parallel generation.

use crate::util::substitute_placeholders;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Where a diagnostic points to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Declaration file, if the declaration came from one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Declaration name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declaration: Option<String>,
    /// Field, method or parameter name inside the declaration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<String>,
    /// 1-based line
    #[serde(default)]
    pub line: usize,
    /// 1-based column
    #[serde(default)]
    pub column: usize,
}

impl SourceLocation {
    pub fn declaration(name: impl Into<String>) -> Self {
        Self {
            declaration: Some(name.into()),
            ..Self::default()
        }
    }

    /// Same position, narrowed to a member of the declaration
    pub fn with_member(&self, member: impl Into<String>) -> Self {
        Self {
            member: Some(member.into()),
            ..self.clone()
        }
    }

    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.line = line;
        self.column = column;
        self
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = self
            .file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<input>".into());
        write!(f, "{}", file)?;
        if self.line > 0 {
            write!(f, ":{}:{}", self.line, self.column)?;
        }
        match (&self.declaration, &self.member) {
            (Some(decl), Some(member)) => write!(f, " (declaration {}, member {})", decl, member),
            (Some(decl), None) => write!(f, " (declaration {})", decl),
            _ => Ok(()),
        }
    }
}

/// A diagnostic record
///
/// The message is a template whose `$` placeholders are substituted left to
/// right by `arguments` when rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub template: String,
    pub arguments: Vec<String>,
    pub location: SourceLocation,
}

impl Diagnostic {
    pub fn new(
        severity: Severity,
        template: impl Into<String>,
        location: SourceLocation,
        arguments: Vec<String>,
    ) -> Self {
        Self {
            severity,
            template: template.into(),
            arguments,
            location,
        }
    }

    pub fn error(
        template: impl Into<String>,
        location: SourceLocation,
        arguments: Vec<String>,
    ) -> Self {
        Self::new(Severity::Error, template, location, arguments)
    }

    pub fn warning(
        template: impl Into<String>,
        location: SourceLocation,
        arguments: Vec<String>,
    ) -> Self {
        Self::new(Severity::Warning, template, location, arguments)
    }

    pub fn info(
        template: impl Into<String>,
        location: SourceLocation,
        arguments: Vec<String>,
    ) -> Self {
        Self::new(Severity::Info, template, location, arguments)
    }

    /// Message with placeholders substituted
    pub fn message(&self) -> String {
        substitute_placeholders(&self.template, &self.arguments)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}\n  --> {}", self.severity, self.message(), self.location)
    }
}

/// Receives diagnostics
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);

    /// Append several diagnostics keeping their order
    fn report_all(&self, diagnostics: Vec<Diagnostic>) {
        for diagnostic in diagnostics {
            self.report(diagnostic);
        }
    }
}

/// Thread-safe diagnostics collector
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Mutex<Vec<Diagnostic>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything reported so far
    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries.lock().clone()
    }

    pub fn into_entries(self) -> Vec<Diagnostic> {
        self.entries.into_inner()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.entries.lock().iter().filter(|d| d.is_error()).count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Render every diagnostic, one block per entry
    pub fn to_report(&self) -> String {
        let entries = self.entries.lock();
        let mut out = String::new();
        for diagnostic in entries.iter() {
            out.push_str(&diagnostic.to_string());
            out.push('\n');
        }
        let errors = entries.iter().filter(|d| d.is_error()).count();
        out.push_str(&format!(
            "{} diagnostic(s), {} error(s)\n",
            entries.len(),
            errors
        ));
        out
    }
}

impl DiagnosticSink for Diagnostics {
    fn report(&self, diagnostic: Diagnostic) {
        self.entries.lock().push(diagnostic);
    }

    fn report_all(&self, diagnostics: Vec<Diagnostic>) {
        self.entries.lock().extend(diagnostics);
    }
}

/// Per-declaration diagnostics buffer
///
/// Not shared; flushed into a [`DiagnosticSink`] once the declaration is done.
#[derive(Debug, Default)]
pub struct DiagnosticBuffer {
    entries: Vec<Diagnostic>,
    failed: bool,
}

impl DiagnosticBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    /// Report a usage error: recorded, generation proceeds
    pub fn usage_error(
        &mut self,
        template: &str,
        location: SourceLocation,
        arguments: Vec<String>,
    ) {
        self.push(Diagnostic::error(template, location, arguments));
    }

    /// Report a declaration error: recorded and the declaration is marked failed
    pub fn declaration_error(
        &mut self,
        template: &str,
        location: SourceLocation,
        arguments: Vec<String>,
    ) {
        self.failed = true;
        self.push(Diagnostic::error(template, location, arguments));
    }

    pub fn info(&mut self, template: &str, location: SourceLocation, arguments: Vec<String>) {
        self.push(Diagnostic::info(template, location, arguments));
    }

    pub fn mark_failed(&mut self) {
        self.failed = true;
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Hand the buffered diagnostics to the sink in their original order
    pub fn flush_into(&mut self, sink: &dyn DiagnosticSink) {
        sink.report_all(std::mem::take(&mut self.entries));
    }
}
