//! Metadata tracking for staleness detection
//!
//! Stores hashes of declaration files in `.declgen_meta.yaml` inside the
//! output directory, together with the files each declaration produced.

use crate::error::{Error, Result};
use crate::generate::GenerationReport;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

pub const META_FILE: &str = ".declgen_meta.yaml";

/// Metadata file stored in the output directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GenerationMeta {
    /// Hash of each declaration file (relative path -> SHA256)
    pub source_hashes: BTreeMap<String, String>,

    /// Generated files per declaration, relative to the output directory
    #[serde(default)]
    pub generated_files: BTreeMap<String, Vec<String>>,

    /// When this metadata was written
    #[serde(with = "chrono::serde::ts_seconds")]
    #[schemars(with = "i64")]
    pub generated_at: DateTime<Utc>,

    /// declgen version that wrote this
    pub tool_version: String,
}

impl Default for GenerationMeta {
    fn default() -> Self {
        Self {
            source_hashes: BTreeMap::new(),
            generated_files: BTreeMap::new(),
            generated_at: Utc::now(),
            tool_version: crate::VERSION.to_string(),
        }
    }
}

impl GenerationMeta {
    /// Load metadata from an output directory
    pub fn load_from_dir(output_dir: &Path) -> Result<Option<Self>> {
        let meta_file = output_dir.join(META_FILE);
        if !meta_file.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&meta_file)?;
        let meta: GenerationMeta = serde_norway::from_str(&content)
            .map_err(|e| Error::Other(format!("Failed to parse {}: {}", META_FILE, e)))?;

        Ok(Some(meta))
    }

    /// Save metadata to an output directory
    pub fn save_to_dir(&self, output_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(output_dir)?;
        let mut content = String::from(
            "# AUTO-GENERATED - DO NOT EDIT\n\
             # Declaration file hashes, rewritten by 'declgen generate'\n\n",
        );
        content.push_str(&serde_norway::to_string(self)?);
        std::fs::write(output_dir.join(META_FILE), content)?;
        Ok(())
    }

    /// Whether a declaration file changed since it was last generated
    pub fn is_stale(&self, source: &Path, base_dir: &Path) -> bool {
        let Some(key) = relative_key(source, base_dir) else {
            return true;
        };
        let current = compute_file_hash(source).unwrap_or_default();
        self.source_hashes.get(&key).is_none_or(|stored| *stored != current)
    }

    /// Record the current hash of a declaration file
    pub fn update_hash(&mut self, source: &Path, base_dir: &Path) -> Result<()> {
        let key = relative_key(source, base_dir).ok_or_else(|| {
            Error::Other(format!(
                "{} is outside {}",
                source.display(),
                base_dir.display()
            ))
        })?;
        self.source_hashes.insert(key, compute_file_hash(source)?);
        Ok(())
    }

    /// Track a generated file for a declaration
    pub fn track_generated_file(&mut self, declaration: &str, file: &str) {
        let files = self.generated_files.entry(declaration.to_string()).or_default();
        if !files.iter().any(|f| f == file) {
            files.push(file.to_string());
        }
    }

    /// Take over hashes and written files from a finished run
    ///
    /// Declarations that failed keep their previous file list, and their
    /// source hashes are not refreshed so they stay stale.
    pub fn record(&mut self, report: &GenerationReport, base_dir: &Path) -> Result<()> {
        let mut failed_sources = BTreeSet::new();
        for outcome in &report.declarations {
            let written: Vec<&str> = outcome
                .artifacts
                .iter()
                .filter(|a| a.written)
                .map(|a| a.file_name.as_str())
                .collect();
            if written.len() == outcome.artifacts.len() && !written.is_empty() {
                self.generated_files.remove(&outcome.declaration);
            }
            for file in written {
                self.track_generated_file(&outcome.declaration, file);
            }
            if outcome.outcome != crate::generate::Outcome::Generated {
                if let Some(path) = &outcome.source_file {
                    failed_sources.insert(path.clone());
                }
            }
        }
        let sources: BTreeSet<&PathBuf> = report
            .declarations
            .iter()
            .filter_map(|d| d.source_file.as_ref())
            .collect();
        for source in sources {
            if !failed_sources.contains(source) {
                self.update_hash(source, base_dir)?;
            }
        }
        self.generated_at = Utc::now();
        self.tool_version = crate::VERSION.to_string();
        Ok(())
    }

    /// Tracked files of declarations that no longer exist
    pub fn orphaned_files(&self, output_dir: &Path, current: &[String]) -> Vec<PathBuf> {
        self.generated_files
            .iter()
            .filter(|(declaration, _)| !current.contains(declaration))
            .flat_map(|(_, files)| files)
            .map(|file| output_dir.join(file))
            .filter(|path| path.exists())
            .collect()
    }
}

fn relative_key(path: &Path, base_dir: &Path) -> Option<String> {
    path.strip_prefix(base_dir)
        .ok()
        .and_then(|p| p.to_str())
        .map(|s| s.replace('\\', "/"))
}

/// Compute SHA256 hash of a file
fn compute_file_hash(path: &Path) -> Result<String> {
    let content = std::fs::read(path)?;
    Ok(hex::encode(Sha256::digest(&content)))
}

/// Declaration files that changed since the last generation
///
/// Without metadata every file is stale.
pub fn find_stale_sources(
    sources: &[PathBuf],
    base_dir: &Path,
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let Some(meta) = GenerationMeta::load_from_dir(output_dir)? else {
        return Ok(sources.to_vec());
    };
    Ok(sources
        .iter()
        .filter(|path| meta.is_stale(path, base_dir))
        .cloned()
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::ArtifactKind;
    use crate::generate::{ArtifactRecord, DeclarationOutcome, Outcome};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_hash_computation() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.decl.yaml");
        fs::write(&file, "declarations: []").unwrap();

        let hash1 = compute_file_hash(&file).unwrap();
        assert_eq!(hash1, compute_file_hash(&file).unwrap());

        fs::write(&file, "declarations: [{name: A}]").unwrap();
        assert_ne!(hash1, compute_file_hash(&file).unwrap());
    }

    #[test]
    fn test_staleness_detection() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("generated");
        let source = temp.path().join("shapes.decl.yaml");
        fs::write(&source, "declarations: []").unwrap();
        let sources = vec![source.clone()];

        assert_eq!(find_stale_sources(&sources, temp.path(), &out).unwrap().len(), 1);

        let mut meta = GenerationMeta::default();
        meta.update_hash(&source, temp.path()).unwrap();
        meta.save_to_dir(&out).unwrap();
        assert!(find_stale_sources(&sources, temp.path(), &out).unwrap().is_empty());

        fs::write(&source, "declarations: [{name: A}]").unwrap();
        assert_eq!(find_stale_sources(&sources, temp.path(), &out).unwrap(), sources);
    }

    #[test]
    fn test_round_trip_and_orphans() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a.decl.yaml");
        fs::write(&source, "declarations: []").unwrap();
        fs::write(temp.path().join("old_subclass.rs"), "").unwrap();

        let report = GenerationReport {
            declarations: vec![DeclarationOutcome {
                declaration: "A".into(),
                source_file: Some(source.clone()),
                hash: String::new(),
                outcome: Outcome::Generated,
                artifacts: vec![ArtifactRecord {
                    kind: ArtifactKind::Subclass,
                    output_name: "ASubclass".into(),
                    file_name: "a_subclass.rs".into(),
                    written: true,
                }],
            }],
        };
        let mut meta = GenerationMeta::default();
        meta.track_generated_file("Old", "old_subclass.rs");
        meta.record(&report, temp.path()).unwrap();
        meta.save_to_dir(temp.path()).unwrap();

        let loaded = GenerationMeta::load_from_dir(temp.path()).unwrap().unwrap();
        assert_eq!(loaded.generated_files["A"], vec!["a_subclass.rs".to_string()]);
        assert!(!loaded.is_stale(&source, temp.path()));
        assert_eq!(
            loaded.orphaned_files(temp.path(), &["A".to_string()]),
            vec![temp.path().join("old_subclass.rs")]
        );
    }
}
