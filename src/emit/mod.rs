//! Output emission
//!
//! [`CodeEmitter`] builds Rust source with explicit block structure and
//! rejects statements where they cannot appear. [`GeneratedArtifact`] holds
//! one generated unit and can be written exactly once into an
//! [`OutputSink`].

use crate::declaration::ArtifactKind;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("{what} is not allowed inside {block}")]
    Misplaced { what: &'static str, block: String },

    #[error("`else` must directly follow an `if` block")]
    DanglingElse,

    #[error("end of block without a matching begin")]
    UnexpectedEnd,

    #[error("{0} block(s) left open")]
    Unbalanced(usize),

    #[error("artifact {0} was already populated")]
    AlreadyPopulated(String),

    #[error("artifact {0} has no content")]
    NotPopulated(String),

    #[error("artifact {0} was already written")]
    AlreadyWritten(String),

    #[error("failed to write {name}: {source}")]
    Sink {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl EmitError {
    /// Generator bugs abort the batch; sink failures only fail one artifact
    pub fn is_fatal(&self) -> bool {
        !matches!(self, EmitError::Sink { .. })
    }
}

/// Structured block kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Module,
    Struct,
    Impl,
    Function,
    If,
    Else,
    Block,
}

impl BlockKind {
    fn accepts_statements(self) -> bool {
        matches!(
            self,
            BlockKind::Function | BlockKind::If | BlockKind::Else | BlockKind::Block
        )
    }

    fn accepts_items(self) -> bool {
        matches!(self, BlockKind::Module | BlockKind::Impl)
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BlockKind::Module => "a module",
            BlockKind::Struct => "a struct",
            BlockKind::Impl => "an impl block",
            BlockKind::Function => "a function",
            BlockKind::If => "an if block",
            BlockKind::Else => "an else block",
            BlockKind::Block => "a block",
        };
        f.write_str(name)
    }
}

/// Structured Rust source builder
///
/// The top level is an implicit module.
#[derive(Debug)]
pub struct CodeEmitter {
    imports: BTreeSet<String>,
    lines: Vec<String>,
    stack: Vec<BlockKind>,
    last_closed: Option<BlockKind>,
    indent: &'static str,
}

impl Default for CodeEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeEmitter {
    pub fn new() -> Self {
        Self {
            imports: BTreeSet::new(),
            lines: Vec::new(),
            stack: Vec::new(),
            last_closed: None,
            indent: "    ",
        }
    }

    fn current(&self) -> BlockKind {
        self.stack.last().copied().unwrap_or(BlockKind::Module)
    }

    fn push_line(&mut self, text: &str) {
        let indent = self.indent.repeat(self.stack.len());
        for line in text.lines() {
            if line.trim().is_empty() {
                self.lines.push(String::new());
            } else {
                self.lines.push(format!("{}{}", indent, line));
            }
        }
    }

    /// Record a `use`; duplicates collapse
    pub fn import(&mut self, path: &str) {
        self.imports.insert(path.trim().trim_end_matches(';').to_string());
    }

    /// Open a block; `opener` is the text before `{`
    pub fn begin(&mut self, kind: BlockKind, opener: &str) -> Result<(), EmitError> {
        let parent = self.current();
        let allowed = match kind {
            BlockKind::Module | BlockKind::Struct | BlockKind::Impl => parent == BlockKind::Module,
            BlockKind::Function => parent.accepts_items(),
            BlockKind::If | BlockKind::Block => parent.accepts_statements(),
            BlockKind::Else => parent.accepts_statements(),
        };
        if !allowed {
            return Err(EmitError::Misplaced {
                what: block_name(kind),
                block: parent.to_string(),
            });
        }
        if kind == BlockKind::Else {
            if self.last_closed != Some(BlockKind::If) {
                return Err(EmitError::DanglingElse);
            }
            if let Some(last) = self.lines.last_mut() {
                last.push_str(" else {");
            }
        } else {
            let opener = opener.trim();
            if opener.is_empty() {
                self.push_line("{");
            } else {
                self.push_line(&format!("{} {{", opener));
            }
        }
        self.stack.push(kind);
        self.last_closed = None;
        Ok(())
    }

    /// Close the innermost block
    pub fn end(&mut self) -> Result<(), EmitError> {
        let kind = self.stack.pop().ok_or(EmitError::UnexpectedEnd)?;
        self.push_line("}");
        self.last_closed = Some(kind);
        Ok(())
    }

    /// Statement inside a function or control block
    pub fn statement(&mut self, text: &str) -> Result<(), EmitError> {
        let block = self.current();
        if !block.accepts_statements() {
            return Err(EmitError::Misplaced {
                what: "a statement",
                block: block.to_string(),
            });
        }
        self.push_line(text);
        self.last_closed = None;
        Ok(())
    }

    /// `name: Type` field inside a struct
    pub fn field(&mut self, text: &str) -> Result<(), EmitError> {
        let block = self.current();
        if block != BlockKind::Struct {
            return Err(EmitError::Misplaced {
                what: "a field",
                block: block.to_string(),
            });
        }
        let text = text.trim_end_matches(',');
        self.push_line(&format!("{},", text));
        Ok(())
    }

    /// Attribute or comment preceding the next item
    pub fn attribute(&mut self, text: &str) -> Result<(), EmitError> {
        let block = self.current();
        if !(block.accepts_items() || block == BlockKind::Struct) {
            return Err(EmitError::Misplaced {
                what: "an attribute",
                block: block.to_string(),
            });
        }
        self.push_line(text);
        Ok(())
    }

    /// A complete item (type alias, constant, one-line fn)
    pub fn item(&mut self, text: &str) -> Result<(), EmitError> {
        let block = self.current();
        if !block.accepts_items() {
            return Err(EmitError::Misplaced {
                what: "an item",
                block: block.to_string(),
            });
        }
        self.push_line(text);
        self.last_closed = None;
        Ok(())
    }

    pub fn blank(&mut self) {
        if self.lines.last().is_some_and(|l| !l.is_empty()) {
            self.lines.push(String::new());
        }
    }

    /// Render the unit; every block must be closed
    pub fn finish(self) -> Result<String, EmitError> {
        if !self.stack.is_empty() {
            return Err(EmitError::Unbalanced(self.stack.len()));
        }
        let mut out = String::new();
        for import in &self.imports {
            out.push_str(&format!("use {};\n", import));
        }
        if !self.imports.is_empty() {
            out.push('\n');
        }
        let mut body = self.lines.join("\n");
        while body.ends_with('\n') {
            body.pop();
        }
        out.push_str(&body);
        out.push('\n');
        Ok(out)
    }
}

fn block_name(kind: BlockKind) -> &'static str {
    match kind {
        BlockKind::Module => "a module",
        BlockKind::Struct => "a struct",
        BlockKind::Impl => "an impl block",
        BlockKind::Function => "a function",
        BlockKind::If => "an if block",
        BlockKind::Else => "an else block",
        BlockKind::Block => "a block",
    }
}

/// Receives generated text
pub trait OutputSink: Send + Sync {
    fn write(&self, name: &str, contents: &str) -> std::io::Result<()>;
}

/// Writes each artifact as a file under a directory
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl OutputSink for FileSink {
    fn write(&self, name: &str, contents: &str) -> std::io::Result<()> {
        let path = self.dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)
    }
}

/// Keeps artifacts in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    files: Mutex<BTreeMap<String, String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.files.lock().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.files.lock().keys().cloned().collect()
    }

    pub fn into_files(self) -> BTreeMap<String, String> {
        self.files.into_inner()
    }
}

impl OutputSink for MemorySink {
    fn write(&self, name: &str, contents: &str) -> std::io::Result<()> {
        self.files.lock().insert(name.to_string(), contents.to_string());
        Ok(())
    }
}

/// Lifecycle of a generated artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactState {
    Empty,
    Populated,
    Written,
    /// The sink failed; the artifact is not retried
    Failed,
}

/// One generated unit tied to its declaration
#[derive(Debug)]
pub struct GeneratedArtifact {
    pub kind: ArtifactKind,
    pub declaration: String,
    /// Type name (`PointBuilder`)
    pub output_name: String,
    /// File name in the sink (`point_builder.rs`)
    pub file_name: String,
    state: ArtifactState,
    content: String,
}

impl GeneratedArtifact {
    pub fn new(
        kind: ArtifactKind,
        declaration: impl Into<String>,
        output_name: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            declaration: declaration.into(),
            output_name: output_name.into(),
            file_name: file_name.into(),
            state: ArtifactState::Empty,
            content: String::new(),
        }
    }

    pub fn state(&self) -> ArtifactState {
        self.state
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Fill the artifact; valid once
    pub fn populate(&mut self, content: String) -> Result<(), EmitError> {
        if self.state != ArtifactState::Empty {
            return Err(EmitError::AlreadyPopulated(self.output_name.clone()));
        }
        self.content = content;
        self.state = ArtifactState::Populated;
        Ok(())
    }

    /// Hand the content to the sink; valid once
    pub fn write(&mut self, sink: &dyn OutputSink) -> Result<(), EmitError> {
        match self.state {
            ArtifactState::Empty => Err(EmitError::NotPopulated(self.output_name.clone())),
            ArtifactState::Written | ArtifactState::Failed => {
                Err(EmitError::AlreadyWritten(self.output_name.clone()))
            }
            ArtifactState::Populated => match sink.write(&self.file_name, &self.content) {
                Ok(()) => {
                    self.state = ArtifactState::Written;
                    Ok(())
                }
                Err(source) => {
                    self.state = ArtifactState::Failed;
                    Err(EmitError::Sink {
                        name: self.file_name.clone(),
                        source,
                    })
                }
            },
        }
    }
}
