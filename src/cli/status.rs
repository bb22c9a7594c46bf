//! Status command

use super::util::print_json;
use declgen::{find_stale_sources, GenerationMeta, Project, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct Status {
    output_dir: PathBuf,
    sources: usize,
    stale: Vec<PathBuf>,
    orphaned: Vec<PathBuf>,
}

/// Show which declaration files need regeneration
pub fn cmd_status(input: &Path, config: Option<&Path>, json: bool) -> Result<()> {
    let project = Project::discover(input, config)?;
    let output_dir = project.config.output_dir.clone();
    let stale = find_stale_sources(&project.sources, &project.base_dir, &output_dir)?;

    let current: Vec<String> = project
        .load_sources()?
        .iter()
        .flat_map(|s| s.declarations().iter().map(|d| d.name.clone()))
        .collect();
    let orphaned = GenerationMeta::load_from_dir(&output_dir)?
        .map(|meta| meta.orphaned_files(&output_dir, &current))
        .unwrap_or_default();

    let status = Status {
        output_dir,
        sources: project.sources.len(),
        stale,
        orphaned,
    };
    if json {
        return print_json(&status);
    }

    println!("Output: {}", status.output_dir.display());
    println!("Declaration files: {}", status.sources);
    if status.stale.is_empty() {
        println!("✓ All declaration files are up to date");
    } else {
        println!("Stale ({}):", status.stale.len());
        for path in &status.stale {
            println!("  {}", path.display());
        }
    }
    if !status.orphaned.is_empty() {
        println!("Orphaned ({}):", status.orphaned.len());
        for path in &status.orphaned {
            println!("  {}", path.display());
        }
    }
    Ok(())
}
