//! Loaded declaration sources and position lookup
//!
//! YAML deserialization drops positions, so diagnostics recover line and
//! column by scanning the original text for the entry that introduced a
//! declaration or member.

use crate::declaration::{Declaration, DeclarationFile};
use crate::diagnostics::SourceLocation;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// A parsed declaration file together with its text
#[derive(Debug, Clone)]
pub struct DeclarationSource {
    pub path: Option<PathBuf>,
    pub text: String,
    pub file: DeclarationFile,
    index: SourceIndex,
}

impl DeclarationSource {
    /// Parse declarations from YAML text
    pub fn from_yaml(text: impl Into<String>, path: Option<PathBuf>) -> Result<Self> {
        let text = text.into();
        let file = DeclarationFile::from_yaml(&text).map_err(|e| match &path {
            Some(p) => Error::DeclarationParse(format!("{}: {}", p.display(), e)),
            None => e,
        })?;
        let index = SourceIndex::new(&text);
        Ok(Self {
            path,
            text,
            file,
            index,
        })
    }

    /// Read and parse a declaration file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(Error::Io)?;
        Self::from_yaml(text, Some(path.to_path_buf()))
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.file.declarations
    }

    /// Location of a declaration
    pub fn locate(&self, declaration: &str) -> SourceLocation {
        let mut location = SourceLocation::declaration(declaration);
        location.file = self.path.clone();
        if let Some((line, column)) = self.index.declaration_position(declaration) {
            location = location.at(line, column);
        }
        location
    }

    /// Location of a member (accessor, field, method or parameter)
    pub fn locate_member(&self, declaration: &str, member: &str) -> SourceLocation {
        let mut location = self.locate(declaration).with_member(member);
        if let Some((line, column)) = self.index.member_position(declaration, member) {
            location = location.at(line, column);
        }
        location
    }
}

/// Line index over YAML text
#[derive(Debug, Clone, Default)]
pub struct SourceIndex {
    lines: Vec<String>,
}

/// Keys that introduce a named entry inside a declaration
const MEMBER_KEYS: [&str; 3] = ["accessor", "field", "name"];

impl SourceIndex {
    pub fn new(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    /// 1-based (line, column) of `name: <declaration>` at the shallowest indentation
    pub fn declaration_position(&self, declaration: &str) -> Option<(usize, usize)> {
        self.declaration_span(declaration)
            .map(|(start, _, column)| (start + 1, column))
    }

    /// 1-based (line, column) of the first entry naming `member` inside the declaration
    pub fn member_position(&self, declaration: &str, member: &str) -> Option<(usize, usize)> {
        let (start, end, _) = self.declaration_span(declaration)?;
        for (offset, line) in self.lines[start + 1..end].iter().enumerate() {
            for key in MEMBER_KEYS {
                if let Some(column) = entry_column(line, key, member) {
                    return Some((start + 1 + offset + 1, column));
                }
            }
        }
        None
    }

    /// (start index, end index exclusive, column) of a declaration's lines
    fn declaration_span(&self, declaration: &str) -> Option<(usize, usize, usize)> {
        let mut best: Option<(usize, usize)> = None;
        for (i, line) in self.lines.iter().enumerate() {
            if let Some(column) = entry_column(line, "name", declaration) {
                if best.map(|(_, c)| column < c).unwrap_or(true) {
                    best = Some((i, column));
                }
            }
        }
        let (start, column) = best?;
        let end = self.lines[start + 1..]
            .iter()
            .position(|line| is_sibling_entry(line, column))
            .map(|p| start + 1 + p)
            .unwrap_or(self.lines.len());
        Some((start, end, column))
    }
}

/// Column of `key` if the line is `[- ]key: value` with the given value
fn entry_column(line: &str, key: &str, value: &str) -> Option<usize> {
    let trimmed = line.trim_start();
    let mut column = line.len() - trimmed.len() + 1;
    let body = match trimmed.strip_prefix("- ") {
        Some(rest) => {
            let rest_trimmed = rest.trim_start();
            column += 2 + (rest.len() - rest_trimmed.len());
            rest_trimmed
        }
        None => trimmed,
    };
    let rest = body.strip_prefix(key)?.strip_prefix(':')?;
    let found = rest
        .split('#')
        .next()
        .unwrap_or("")
        .trim()
        .trim_matches(|c| c == '"' || c == '\'');
    (found == value).then_some(column)
}

/// Whether the line starts another declaration at the same column
fn is_sibling_entry(line: &str, column: usize) -> bool {
    let trimmed = line.trim_start();
    let indent = line.len() - trimmed.len();
    match trimmed.strip_prefix("- ") {
        Some(rest) => {
            let rest_trimmed = rest.trim_start();
            indent + 2 + (rest.len() - rest_trimmed.len()) + 1 == column
        }
        None => !trimmed.is_empty() && indent + 1 < column.saturating_sub(2),
    }
}
