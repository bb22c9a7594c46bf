//! Project discovery
//!
//! Finds declaration files (`*.decl.yaml`) and the `declgen.yaml` that
//! configures them.

use crate::config::{Config, CONFIG_FILE};
use crate::error::{Error, Result};
use crate::source::DeclarationSource;
use std::path::{Path, PathBuf};

/// Suffix of declaration files picked up by directory discovery
pub const DECLARATION_SUFFIXES: [&str; 2] = [".decl.yaml", ".decl.yml"];

/// Inputs and configuration of one run
#[derive(Debug, Clone)]
pub struct Project {
    /// Directory paths in metadata are relative to
    pub base_dir: PathBuf,
    pub config: Config,
    /// Declaration files in a stable order
    pub sources: Vec<PathBuf>,
}

impl Project {
    /// Resolve the inputs of a run
    ///
    /// `input` is a declaration file or a directory searched recursively. The
    /// configuration is `config_path` when given, otherwise the nearest
    /// `declgen.yaml` at or above the input.
    pub fn discover(input: &Path, config_path: Option<&Path>) -> Result<Self> {
        if !input.exists() {
            return Err(Error::Other(format!("{} does not exist", input.display())));
        }
        let search_dir = if input.is_dir() {
            input.to_path_buf()
        } else {
            input.parent().map(Path::to_path_buf).unwrap_or_default()
        };

        let (config, base_dir) = match config_path {
            Some(path) => (
                Config::load(path)?,
                path.parent().map(Path::to_path_buf).unwrap_or_default(),
            ),
            None => match find_config(&search_dir) {
                Some(path) => (
                    Config::load(&path)?,
                    path.parent().map(Path::to_path_buf).unwrap_or_default(),
                ),
                None => {
                    let mut config = Config::default();
                    config.output_dir = search_dir.join(&config.output_dir);
                    (config, search_dir.clone())
                }
            },
        };

        let sources = if input.is_dir() {
            let mut sources = Vec::new();
            collect_declarations(input, &config.output_dir, &mut sources)?;
            sources.sort();
            sources
        } else {
            vec![input.to_path_buf()]
        };

        Ok(Self {
            base_dir,
            config,
            sources,
        })
    }

    /// Parse every declaration file
    pub fn load_sources(&self) -> Result<Vec<DeclarationSource>> {
        self.sources
            .iter()
            .map(|path| DeclarationSource::load(path))
            .collect()
    }
}

/// Nearest `declgen.yaml` at or above `start`
pub fn find_config(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE))
        .find(|candidate| candidate.is_file())
}

pub fn is_declaration_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| DECLARATION_SUFFIXES.iter().any(|s| name.ends_with(s)))
}

fn collect_declarations(dir: &Path, output_dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.'));
        if hidden || path == output_dir {
            continue;
        }
        if path.is_dir() {
            collect_declarations(&path, output_dir, out)?;
        } else if is_declaration_file(&path) {
            out.push(path);
        }
    }
    Ok(())
}
