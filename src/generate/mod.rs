//! Artifact generation
//!
//! The [`Pipeline`] drives a batch of declaration sources through modelling,
//! contract synthesis, the three artifact [`Generator`]s, formatting and
//! emission. Declarations are independent: a declaration error skips every
//! artifact of that declaration and the batch moves on. Only a broken
//! write-once invariant aborts the batch.
//!
//! Generated units refer to each other by their simple type names and reach
//! runtime support through the configured runtime path, so all units of a
//! batch are meant to be included into one module where the declared traits
//! are in scope.

mod builder;
mod converter;
pub mod graph;
mod subclass;

pub use builder::BuilderGenerator;
pub use converter::ConverterGenerator;
pub use graph::DependencyGraph;
pub use subclass::SubclassGenerator;

use crate::config::{Config, NamingConfig};
use crate::contract::{ContractTable, SynthesisContext};
use crate::declaration::{ArtifactKind, Declaration};
use crate::diagnostics::{DiagnosticBuffer, DiagnosticSink};
use crate::emit::{EmitError, GeneratedArtifact, OutputSink};
use crate::error::Result;
use crate::format::{finish_unit, with_header};
use crate::intercept::{InterceptContext, InterceptError};
use crate::model::{BatchContext, DeclarationModel, ModelError};
use crate::source::DeclarationSource;
use crate::util::escape_placeholders;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Emit(#[from] EmitError),

    #[error(transparent)]
    Intercept(#[from] InterceptError),
}

/// Everything a generator reads
#[derive(Debug, Clone, Copy)]
pub struct GenerationContext<'a> {
    pub model: &'a DeclarationModel,
    pub contracts: &'a ContractTable,
    pub naming: &'a NamingConfig,
    pub runtime_path: &'a str,
    pub max_cache_arity: usize,
}

impl GenerationContext<'_> {
    /// Type name of one of this declaration's artifacts
    pub fn output_name(&self, kind: ArtifactKind) -> String {
        self.naming.output_name(&self.model.name, kind)
    }

    /// Type name of another declaration's artifact
    pub fn name_of(&self, declaration: &str, kind: ArtifactKind) -> String {
        self.naming.output_name(declaration, kind)
    }

    pub fn intercept_context(&self) -> InterceptContext<'_> {
        InterceptContext {
            declaration: &self.model.name,
            runtime_path: self.runtime_path,
            max_cache_arity: self.max_cache_arity,
        }
    }

    /// `<runtime>::<item>`
    pub fn runtime(&self, item: &str) -> String {
        format!("{}::{}", self.runtime_path, item)
    }
}

/// Emits one artifact kind from a declaration model
///
/// Output must be a pure function of the context.
pub trait Generator: Sync {
    fn kind(&self) -> ArtifactKind;

    fn generate(&self, ctx: &GenerationContext<'_>) -> std::result::Result<String, GenerateError>;
}

pub fn generator_for(kind: ArtifactKind) -> &'static dyn Generator {
    match kind {
        ArtifactKind::Subclass => &SubclassGenerator,
        ArtifactKind::Builder => &BuilderGenerator,
        ArtifactKind::Converter => &ConverterGenerator,
    }
}

/// Final state of one declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Every artifact was written
    Generated,
    /// Generated, but at least one artifact could not be written
    Incomplete,
    /// A declaration error; nothing was written
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactRecord {
    pub kind: ArtifactKind,
    pub output_name: String,
    pub file_name: String,
    pub written: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeclarationOutcome {
    pub declaration: String,
    pub source_file: Option<PathBuf>,
    pub hash: String,
    pub outcome: Outcome,
    pub artifacts: Vec<ArtifactRecord>,
}

/// Result of a batch, in input order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    pub declarations: Vec<DeclarationOutcome>,
}

impl GenerationReport {
    pub fn outcome(&self, declaration: &str) -> Option<&DeclarationOutcome> {
        self.declarations.iter().find(|d| d.declaration == declaration)
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.declarations.iter().filter(|d| d.outcome == outcome).count()
    }

    pub fn is_success(&self) -> bool {
        self.declarations.iter().all(|d| d.outcome == Outcome::Generated)
    }

    /// Files handed to the sink
    pub fn written_files(&self) -> Vec<&str> {
        self.declarations
            .iter()
            .flat_map(|d| &d.artifacts)
            .filter(|a| a.written)
            .map(|a| a.file_name.as_str())
            .collect()
    }
}

/// One declaration to process
struct Job<'a> {
    source: &'a DeclarationSource,
    declaration: &'a Declaration,
    /// Another declaration of the batch already has this name
    duplicate: bool,
}

/// Shared state of a batch run
struct Batch<'a> {
    context: BatchContext,
    graph: DependencyGraph,
    sink: &'a dyn OutputSink,
    diagnostics: &'a dyn DiagnosticSink,
}

/// Batch generator
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Generate every declaration of every source
    ///
    /// Diagnostics go to `diagnostics`, one declaration at a time. The only
    /// error returned is a fatal emission error.
    #[tracing::instrument(skip_all, fields(sources = sources.len(), jobs = self.config.jobs))]
    pub fn run(
        &self,
        sources: &[DeclarationSource],
        sink: &dyn OutputSink,
        diagnostics: &dyn DiagnosticSink,
    ) -> Result<GenerationReport> {
        let mut seen = HashSet::new();
        let jobs: Vec<Job<'_>> = sources
            .iter()
            .flat_map(|source| source.declarations().iter().map(move |d| (source, d)))
            .map(|(source, declaration)| Job {
                source,
                declaration,
                duplicate: !seen.insert(declaration.name.clone()),
            })
            .collect();

        let context = BatchContext::new(
            jobs.iter().map(|j| j.declaration),
            self.config.model_options(),
        );
        let batch = Batch {
            graph: DependencyGraph::from_batch(&context),
            context,
            sink,
            diagnostics,
        };

        let workers = self.config.jobs.clamp(1, jobs.len().max(1));
        let results = if workers == 1 {
            let mut results = Vec::with_capacity(jobs.len());
            for job in &jobs {
                results.push(self.process(job, &batch)?);
            }
            results
        } else {
            self.run_parallel(&jobs, &batch, workers)?
        };

        let report = GenerationReport {
            declarations: results,
        };
        tracing::info!(
            generated = report.count(Outcome::Generated),
            incomplete = report.count(Outcome::Incomplete),
            failed = report.count(Outcome::Failed),
            "generation finished"
        );
        Ok(report)
    }

    fn run_parallel(
        &self,
        jobs: &[Job<'_>],
        batch: &Batch<'_>,
        workers: usize,
    ) -> std::result::Result<Vec<DeclarationOutcome>, EmitError> {
        let next = AtomicUsize::new(0);
        let abort = AtomicBool::new(false);
        let slots: Mutex<Vec<Option<std::result::Result<DeclarationOutcome, EmitError>>>> =
            Mutex::new((0..jobs.len()).map(|_| None).collect());

        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    if abort.load(Ordering::Relaxed) {
                        break;
                    }
                    let index = next.fetch_add(1, Ordering::Relaxed);
                    let Some(job) = jobs.get(index) else {
                        break;
                    };
                    let result = self.process(job, batch);
                    if result.is_err() {
                        abort.store(true, Ordering::Relaxed);
                    }
                    slots.lock()[index] = Some(result);
                });
            }
        });

        let mut results = Vec::with_capacity(jobs.len());
        for slot in slots.into_inner().into_iter().flatten() {
            results.push(slot?);
        }
        Ok(results)
    }

    /// Generate one declaration and flush its diagnostics
    fn process(
        &self,
        job: &Job<'_>,
        batch: &Batch<'_>,
    ) -> std::result::Result<DeclarationOutcome, EmitError> {
        let mut buffer = DiagnosticBuffer::new();
        let result = self.generate_declaration(job, batch, &mut buffer);
        buffer.flush_into(batch.diagnostics);
        result
    }

    #[tracing::instrument(level = "debug", skip_all, fields(declaration = %job.declaration.name))]
    fn generate_declaration(
        &self,
        job: &Job<'_>,
        batch: &Batch<'_>,
        buffer: &mut DiagnosticBuffer,
    ) -> std::result::Result<DeclarationOutcome, EmitError> {
        let decl = job.declaration;
        let mut outcome = DeclarationOutcome {
            declaration: decl.name.clone(),
            source_file: job.source.path.clone(),
            hash: decl.hash(),
            outcome: Outcome::Failed,
            artifacts: Vec::new(),
        };
        let location = job.source.locate(&decl.name);

        if job.duplicate {
            ModelError::DuplicateDeclaration(decl.name.clone()).report(buffer, location);
            return Ok(outcome);
        }

        let Some(model) = DeclarationModel::build(decl, job.source, &batch.context, buffer) else {
            tracing::debug!("declaration failed while modelling");
            return Ok(outcome);
        };

        if model.generates(ArtifactKind::Converter) {
            if let Some(cycle) = batch.graph.cycle_from(&model.name) {
                ModelError::ConverterCycle(cycle.join(" -> ")).report(buffer, location);
                return Ok(outcome);
            }
        }

        let synthesis = SynthesisContext {
            hierarchy: &batch.context,
            runtime_path: &self.config.runtime_path,
        };
        let Ok(contracts) = ContractTable::synthesize(&model, &synthesis, buffer) else {
            return Ok(outcome);
        };

        let ctx = GenerationContext {
            model: &model,
            contracts: &contracts,
            naming: &self.config.naming,
            runtime_path: &self.config.runtime_path,
            max_cache_arity: self.config.model_options().max_cache_arity,
        };

        let mut artifacts = Vec::with_capacity(model.artifacts.len());
        for kind in &model.artifacts {
            let kind = *kind;
            let text = match generator_for(kind).generate(&ctx) {
                Ok(text) => text,
                Err(GenerateError::Emit(e)) if e.is_fatal() => return Err(e),
                Err(e) => {
                    buffer.declaration_error(
                        "The $ could not be generated: $",
                        location.clone(),
                        vec![kind.to_string(), e.to_string()],
                    );
                    continue;
                }
            };
            let mut artifact = GeneratedArtifact::new(
                kind,
                &model.name,
                ctx.output_name(kind),
                self.config.naming.file_name(&model.name, kind),
            );
            artifact.populate(self.finish_text(&model, &artifact, text, buffer))?;
            artifacts.push(artifact);
        }
        if buffer.is_failed() {
            return Ok(outcome);
        }

        outcome.outcome = Outcome::Generated;
        for mut artifact in artifacts {
            let written = match artifact.write(batch.sink) {
                Ok(()) => {
                    tracing::debug!(file = %artifact.file_name, "artifact written");
                    true
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(file = %artifact.file_name, error = %e, "artifact not written");
                    buffer.usage_error(
                        "The $ could not be written: $",
                        location.clone(),
                        vec![artifact.output_name.clone(), escape_placeholders(&e.to_string())],
                    );
                    outcome.outcome = Outcome::Incomplete;
                    false
                }
            };
            outcome.artifacts.push(ArtifactRecord {
                kind: artifact.kind,
                output_name: artifact.output_name,
                file_name: artifact.file_name,
                written,
            });
        }
        Ok(outcome)
    }

    /// Format and add the provenance header
    fn finish_text(
        &self,
        model: &DeclarationModel,
        artifact: &GeneratedArtifact,
        text: String,
        buffer: &mut DiagnosticBuffer,
    ) -> String {
        let body = match finish_unit(&text, self.config.auto_format) {
            Ok(body) => body,
            Err(e) => {
                buffer.push(crate::diagnostics::Diagnostic::warning(
                    "The generated $ does not parse and is written unformatted: $",
                    model.location.clone(),
                    vec![artifact.output_name.clone(), escape_placeholders(&e.to_string())],
                ));
                text
            }
        };
        if !self.config.provenance {
            return body;
        }
        with_header(&provenance(model, artifact), &body)
    }
}

/// Header lines naming where a unit came from
pub fn provenance(model: &DeclarationModel, artifact: &GeneratedArtifact) -> Vec<String> {
    let source = model
        .source_file
        .as_ref()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "<inline>".to_string());
    vec![
        format!("Generated by declgen {}. Do not edit.", crate::VERSION),
        format!("source: {}", source),
        format!("declaration: {} ({})", model.name, artifact.kind),
        format!("sha256: {}", model.hash),
    ]
}

/// Generate one artifact of the first declaration in `yaml`; the text must parse
#[cfg(test)]
pub(crate) fn render(yaml: &str, kind: ArtifactKind) -> String {
    use crate::diagnostics::Diagnostic;

    let source = DeclarationSource::from_yaml(yaml, None).unwrap();
    let decls = source.declarations();
    let batch = BatchContext::new(decls, crate::model::ModelOptions::default());
    let mut buffer = DiagnosticBuffer::new();
    let model = DeclarationModel::build(&decls[0], &source, &batch, &mut buffer)
        .unwrap_or_else(|| panic!("{:?}", buffer.entries()));
    let synthesis = SynthesisContext {
        hierarchy: &batch,
        runtime_path: "::declgen::runtime",
    };
    let contracts = ContractTable::synthesize(&model, &synthesis, &mut buffer).unwrap();
    let errors: Vec<&Diagnostic> = buffer.entries().iter().filter(|d| d.is_error()).collect();
    assert!(errors.is_empty(), "{:?}", errors);
    let naming = NamingConfig::default();
    let ctx = GenerationContext {
        model: &model,
        contracts: &contracts,
        naming: &naming,
        runtime_path: "::declgen::runtime",
        max_cache_arity: 8,
    };
    let text = generator_for(kind).generate(&ctx).unwrap();
    if let Err(e) = crate::format::format_rust(&text) {
        panic!("{}\n{}", e, text);
    }
    text
}
