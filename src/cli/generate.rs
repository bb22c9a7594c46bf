//! Generate and check commands

use super::util::{print_diagnostics, print_json, summary, RunOutput};
use super::GenerateArgs;
use declgen::{
    ConfigOverrides, Diagnostics, Error, FileSink, GenerationMeta, GenerationReport, MemorySink,
    OutputSink, Pipeline, Project, Result,
};
use std::path::Path;

/// Generate every declaration under a path and record the run's metadata
pub fn cmd_generate(args: &GenerateArgs) -> Result<()> {
    let mut project = Project::discover(&args.input, args.config.as_deref())?;
    let overrides = ConfigOverrides {
        output_dir: args.output.clone(),
        jobs: args.jobs,
        auto_format: args.no_format.then_some(false),
        provenance: args.no_provenance.then_some(false),
        runtime_path: args.runtime_path.clone(),
    };
    project.config = project.config.clone().merge(&overrides)?;
    let output_dir = project.config.output_dir.clone();

    let sink = FileSink::new(&output_dir);
    let (report, diagnostics) = run(&project, &sink)?;

    let mut meta = GenerationMeta::load_from_dir(&output_dir)?.unwrap_or_default();
    meta.record(&report, &project.base_dir)?;
    meta.save_to_dir(&output_dir)?;

    finish(&report, &diagnostics, args.json)?;
    if !args.json {
        for file in report.written_files() {
            println!("  {}", output_dir.join(file).display());
        }
    }
    verdict(&report, &diagnostics)
}

/// Run generation into memory and report what would be written
pub fn cmd_check(input: &Path, config: Option<&Path>, json: bool) -> Result<()> {
    let project = Project::discover(input, config)?;
    let sink = MemorySink::new();
    let (report, diagnostics) = run(&project, &sink)?;
    finish(&report, &diagnostics, json)?;
    verdict(&report, &diagnostics)
}

fn run(project: &Project, sink: &dyn OutputSink) -> Result<(GenerationReport, Diagnostics)> {
    let sources = project.load_sources()?;
    tracing::debug!(files = sources.len(), "declaration files loaded");
    let diagnostics = Diagnostics::new();
    let report = Pipeline::new(project.config.clone()).run(&sources, sink, &diagnostics)?;
    Ok((report, diagnostics))
}

fn finish(report: &GenerationReport, diagnostics: &Diagnostics, json: bool) -> Result<()> {
    let entries = diagnostics.entries();
    if json {
        return print_json(&RunOutput {
            report,
            diagnostics: &entries,
        });
    }
    print_diagnostics(&entries);
    println!("{}", summary(report));
    Ok(())
}

fn verdict(report: &GenerationReport, diagnostics: &Diagnostics) -> Result<()> {
    if report.is_success() && !diagnostics.has_errors() {
        Ok(())
    } else {
        Err(Error::Other(format!(
            "{} error(s) reported",
            diagnostics.error_count()
        )))
    }
}
