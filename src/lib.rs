// Production-quality lints
#![warn(
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
// Deny truly dangerous patterns
#![deny(clippy::mem_forget)]
// Allow common patterns in library code
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! # declgen — declaration-driven code generation
//!
//! Generates the boilerplate that surrounds a value type from a short
//! declaration of its abstract surface.
//!
//! ## Core Concept
//!
//! A **declaration** lists a type's accessors, stored fields and methods,
//! annotated with validators, defaults, derivations and interceptors. From
//! one declaration, declgen emits up to three units:
//!
//! - **Subclass**: a concrete struct implementing the declared trait, whose
//!   constructor applies defaults, checks contracts and computes derived
//!   fields
//! - **Builder**: step-wise construction that reports every missing
//!   required field at once
//! - **Converter**: a structural [`runtime::Value`] encoding whose decoding
//!   goes back through the builder and therefore through the contracts
//!
//! Validator tags become contracts: preconditions on fields and parameters,
//! postconditions on method results. Method bodies can be wrapped by
//! interceptors (`cached`, `logged`).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use declgen::{DeclarationSource, Diagnostics, MemorySink, Pipeline};
//!
//! let source = DeclarationSource::from_yaml(r#"
//! declarations:
//!   - name: Point
//!     members:
//!       - accessor: get_x
//!         type: i64
//!         validators: [even]
//!       - accessor: get_double_x
//!         type: i64
//!         derive: "2 * x"
//! "#, None)?;
//!
//! let sink = MemorySink::new();
//! let diagnostics = Diagnostics::new();
//! let report = Pipeline::default().run(&[source], &sink, &diagnostics)?;
//! assert!(report.is_success());
//! println!("{}", sink.get("point_subclass.rs").unwrap());
//! ```
//!
//! ## Using generated units
//!
//! Units of one batch refer to each other by simple type name and reach
//! runtime support through `::declgen::runtime`, so they are included
//! together into one module where the declared traits are in scope:
//!
//! ```rust,ignore
//! mod shapes {
//!     pub trait Point { fn get_x(&self) -> i64; fn get_double_x(&self) -> i64; }
//!     include!(concat!(env!("OUT_DIR"), "/point_subclass.rs"));
//!     include!(concat!(env!("OUT_DIR"), "/point_builder.rs"));
//!     include!(concat!(env!("OUT_DIR"), "/point_converter.rs"));
//! }
//! ```
//!
//! ## Diagnostics
//!
//! Problems in a declaration never abort a batch. They are reported as
//! [`Diagnostic`]s bound to a source location, every artifact of the
//! offending declaration is skipped and the remaining declarations are still
//! generated.

pub mod config;
pub mod contract;
pub mod declaration;
pub mod diagnostics;
pub mod emit;
pub mod error;
pub mod format;
pub mod generate;
pub mod intercept;
pub mod meta;
pub mod model;
pub mod project;
pub mod runtime;
pub mod source;
pub mod util;

// Core types
pub use declaration::{
    ArtifactKind, Declaration, DeclarationFile, MemberDecl, MethodDecl, ParameterDecl,
    ValidatorArgument, ValidatorSpec,
};
pub use error::{Error, Result};
pub use source::DeclarationSource;

// Diagnostics
pub use diagnostics::{
    Diagnostic, DiagnosticBuffer, DiagnosticSink, Diagnostics, Severity, SourceLocation,
};

// Modelling and contracts
pub use contract::{Contract, ContractTable, SynthesisContext};
pub use model::{BatchContext, DeclarationModel, FieldInfo, MethodInfo, ModelOptions};

// Generation and emission
pub use emit::{CodeEmitter, EmitError, FileSink, GeneratedArtifact, MemorySink, OutputSink};
pub use generate::{generator_for, GenerationReport, Generator, Outcome, Pipeline};

// Project management
pub use config::{Config, ConfigOverrides, NamingConfig, CONFIG_FILE};
pub use meta::{find_stale_sources, GenerationMeta, META_FILE};
pub use project::{find_config, Project};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
