//! Declaration model
//!
//! Reflects one declaration into [`FieldInfo`] and [`MethodInfo`] records.
//! The model is built once per declaration and is read-only afterwards;
//! generators, the contract synthesizer and interceptors only borrow it.
//!
//! Building reports every problem it finds into the declaration's
//! [`DiagnosticBuffer`] before giving up, so one run surfaces all conflicts.

mod field;
mod method;
pub mod types;

pub use field::{AccessStrategy, FieldInfo, FieldRole, NestedField, NestedShape};
pub use method::{MethodInfo, ParameterInfo};
pub use types::{
    assignability, Assignability, KeyConversion, TypeError, TypeHierarchy, TypeInfo, TypeShape,
};

use crate::declaration::{ArtifactKind, Declaration, ValidatorDescriptor, ValidatorSpec};
use crate::diagnostics::{DiagnosticBuffer, SourceLocation};
use crate::source::DeclarationSource;
use crate::util::escape_placeholders;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::PathBuf;
use thiserror::Error;

/// Declaration errors found while modelling
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("{0}")]
    Type(#[from] TypeError),

    #[error("`{0}` is not a valid declaration name")]
    InvalidName(String),

    #[error("The declaration {0} is declared more than once in this batch.")]
    DuplicateDeclaration(String),

    #[error("The field {0} cannot have both a default value and a derivation.")]
    DefaultAndDerive(String),

    #[error("The field {0} is declared more than once.")]
    DuplicateField(String),

    #[error("A member must name either an accessor or a field, not both.")]
    AmbiguousMember,

    #[error("A member must name an accessor or a field.")]
    UnnamedMember,

    #[error("Invalid validator: {0}")]
    InvalidValidator(String),

    #[error("The method {0} is rewritten but has no body.")]
    MissingBody(String),

    #[error("Unknown interceptor `{0}` (expected one of: cached, logged).")]
    UnknownInterceptor(String),

    #[error("The field {field} holds {declaration}, which does not generate a converter.")]
    NestedWithoutConverter { field: String, declaration: String },

    #[error(
        "The field {field} of type {ty} cannot be converted: {part} has no structural encoding."
    )]
    NoEncoding {
        field: String,
        ty: String,
        part: String,
    },

    #[error("`{0}` is not a valid identifier")]
    InvalidIdentifier(String),

    #[error("Converter cycle: {0}")]
    ConverterCycle(String),
}

impl ModelError {
    /// Record as a declaration error
    pub fn report(&self, buffer: &mut DiagnosticBuffer, location: SourceLocation) {
        buffer.declaration_error(&escape_placeholders(&self.to_string()), location, Vec::new());
    }
}

/// Knobs the model needs from configuration
#[derive(Debug, Clone)]
pub struct ModelOptions {
    pub max_cache_arity: usize,
    pub subclass_suffix: String,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            max_cache_arity: 8,
            subclass_suffix: "Subclass".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct BatchEntry {
    supertypes: Vec<String>,
    artifacts: BTreeSet<ArtifactKind>,
    member_types: Vec<String>,
}

/// What every declaration can know about the rest of its batch
#[derive(Debug, Clone)]
pub struct BatchContext {
    entries: BTreeMap<String, BatchEntry>,
    options: ModelOptions,
}

impl BatchContext {
    /// Index a batch; the first declaration of a name wins
    pub fn new<'a>(
        declarations: impl IntoIterator<Item = &'a Declaration>,
        options: ModelOptions,
    ) -> Self {
        let mut entries = BTreeMap::new();
        for decl in declarations {
            entries.entry(decl.name.clone()).or_insert_with(|| BatchEntry {
                supertypes: decl.supertypes.clone(),
                artifacts: effective_artifacts(decl).0,
                member_types: decl.members.iter().map(|m| m.typ.clone()).collect(),
            });
        }
        Self { entries, options }
    }

    pub fn options(&self) -> &ModelOptions {
        &self.options
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Artifacts a declaration produces, implied prerequisites included
    pub fn artifacts_of(&self, name: &str) -> Option<&BTreeSet<ArtifactKind>> {
        self.entries.get(name).map(|e| &e.artifacts)
    }

    /// Whether the type names the concrete type of a batch declaration
    pub fn is_declared_type(&self, ty: &TypeInfo) -> bool {
        *ty.shape() == TypeShape::Path
            && ty.arguments().is_empty()
            && ty
                .simple_name()
                .strip_suffix(self.options.subclass_suffix.as_str())
                .is_some_and(|name| !name.is_empty() && self.contains(name))
    }

    /// Nested declaration held by a field of the given type
    pub fn nested_declaration(&self, ty: &TypeInfo) -> Option<NestedField> {
        let (inner, shape) = if ty.is_nullable() {
            (ty.value_type(), NestedShape::Optional)
        } else if ty.simple_name() == "Vec" && ty.arguments().len() == 1 {
            (&ty.arguments()[0], NestedShape::List)
        } else {
            (ty, NestedShape::Plain)
        };
        if *inner.shape() != TypeShape::Path || !inner.arguments().is_empty() {
            return None;
        }
        let declaration = inner
            .simple_name()
            .strip_suffix(self.options.subclass_suffix.as_str())?;
        if declaration.is_empty() || !self.contains(declaration) {
            return None;
        }
        Some(NestedField {
            declaration: declaration.to_string(),
            shape,
        })
    }

    /// Declarations whose converters the given declaration's converter calls
    pub fn converter_dependencies(&self, name: &str) -> Vec<String> {
        let Some(entry) = self.entries.get(name) else {
            return Vec::new();
        };
        let mut deps = Vec::new();
        for text in &entry.member_types {
            let Ok(ty) = TypeInfo::parse(text) else {
                continue;
            };
            if let Some(nested) = self.nested_declaration(&ty) {
                if !deps.contains(&nested.declaration) {
                    deps.push(nested.declaration);
                }
            }
        }
        deps
    }
}

impl TypeHierarchy for BatchContext {
    fn supertypes_of(&self, name: &str) -> Option<Vec<String>> {
        self.entries.get(name).map(|e| e.supertypes.clone())
    }
}

/// Requested artifacts plus implied prerequisites
///
/// A declaration without directives gets every artifact.
pub fn effective_artifacts(decl: &Declaration) -> (BTreeSet<ArtifactKind>, Vec<ArtifactKind>) {
    let mut artifacts: BTreeSet<ArtifactKind> = if decl.generate.is_empty() {
        ArtifactKind::ALL.into_iter().collect()
    } else {
        decl.generate.iter().copied().collect()
    };
    let mut implied = Vec::new();
    for kind in ArtifactKind::ALL.into_iter().rev() {
        if !artifacts.contains(&kind) {
            continue;
        }
        let mut current = kind.prerequisite();
        while let Some(prerequisite) = current {
            if artifacts.insert(prerequisite) {
                implied.push(prerequisite);
            }
            current = prerequisite.prerequisite();
        }
    }
    (artifacts, implied)
}

/// The semantic model of one declaration
#[derive(Debug, Clone, PartialEq)]
pub struct DeclarationModel {
    pub name: String,
    /// The declared type itself
    pub ty: TypeInfo,
    /// Trait implemented by the concrete type
    pub trait_path: String,
    pub artifacts: BTreeSet<ArtifactKind>,
    /// In declaration order
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub location: SourceLocation,
    pub source_file: Option<PathBuf>,
    /// SHA-256 of the declaration
    pub hash: String,
    pub description: Option<String>,
}

impl DeclarationModel {
    /// Reflect a declaration
    ///
    /// Returns `None` when any declaration error was reported; the reasons are
    /// in `buffer`.
    #[tracing::instrument(level = "debug", skip_all, fields(declaration = %decl.name))]
    pub fn build(
        decl: &Declaration,
        source: &DeclarationSource,
        batch: &BatchContext,
        buffer: &mut DiagnosticBuffer,
    ) -> Option<Self> {
        let location = source.locate(&decl.name);

        if syn::parse_str::<syn::Ident>(&decl.name).is_err() {
            ModelError::InvalidName(decl.name.clone()).report(buffer, location.clone());
        }
        if let Err(e) = TypeInfo::parse(decl.trait_path()) {
            ModelError::Type(e).report(buffer, location.clone());
        }

        let (artifacts, implied) = effective_artifacts(decl);
        for kind in implied {
            buffer.info(
                "The $ is generated because another requested artifact needs it.",
                location.clone(),
                vec![kind.to_string()],
            );
        }

        let mut fields: Vec<FieldInfo> = Vec::with_capacity(decl.members.len());
        let mut seen = HashSet::new();
        for member in &decl.members {
            let member_location = match member.declared_name() {
                Some(name) => source.locate_member(&decl.name, name),
                None => location.clone(),
            };
            let Some(field) = field::build_field(member, member_location, batch, buffer) else {
                continue;
            };
            if !seen.insert(field.name.clone()) {
                ModelError::DuplicateField(field.name.clone())
                    .report(buffer, field.location.clone());
                continue;
            }
            fields.push(field);
        }

        let mut methods = Vec::with_capacity(decl.methods.len());
        for method in &decl.methods {
            if let Some(info) = method::build_method(
                method,
                &decl.name,
                source,
                batch.options().max_cache_arity,
                buffer,
            ) {
                methods.push(info);
            }
        }

        if artifacts.contains(&ArtifactKind::Converter) {
            let is_declared = |ty: &TypeInfo| batch.is_declared_type(ty);
            for field in &fields {
                let Some(nested) = &field.nested else {
                    if let Some(part) = field.ty.missing_leaf(&is_declared) {
                        ModelError::NoEncoding {
                            field: field.name.clone(),
                            ty: field.ty.to_string(),
                            part: part.to_string(),
                        }
                        .report(buffer, field.location.clone());
                    }
                    continue;
                };
                let has_converter = batch
                    .artifacts_of(&nested.declaration)
                    .is_some_and(|a| a.contains(&ArtifactKind::Converter));
                if !has_converter {
                    ModelError::NestedWithoutConverter {
                        field: field.name.clone(),
                        declaration: nested.declaration.clone(),
                    }
                    .report(buffer, field.location.clone());
                }
            }
        }

        if buffer.is_failed() {
            return None;
        }

        Some(Self {
            name: decl.name.clone(),
            ty: TypeInfo::named(decl.name.clone(), Vec::new()),
            trait_path: decl.trait_path().to_string(),
            artifacts,
            fields,
            methods,
            location,
            source_file: source.path.clone(),
            hash: decl.hash(),
            description: decl.description.clone(),
        })
    }

    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields supplied at construction, in declaration order
    pub fn input_fields(&self) -> impl Iterator<Item = &FieldInfo> {
        self.fields.iter().filter(|f| f.is_input())
    }

    pub fn derived_fields(&self) -> impl Iterator<Item = &FieldInfo> {
        self.fields.iter().filter(|f| f.is_derived())
    }

    pub fn rewritten_methods(&self) -> impl Iterator<Item = &MethodInfo> {
        self.methods.iter().filter(|m| m.is_rewritten())
    }

    pub fn generates(&self, kind: ArtifactKind) -> bool {
        self.artifacts.contains(&kind)
    }
}

/// Normalize validator specs; malformed ones are declaration errors
pub(crate) fn parse_validators(
    specs: &[ValidatorSpec],
    location: &SourceLocation,
    buffer: &mut DiagnosticBuffer,
) -> Option<Vec<ValidatorDescriptor>> {
    let mut out = Vec::with_capacity(specs.len());
    let mut ok = true;
    for spec in specs {
        match spec.descriptor() {
            Ok(descriptor) => out.push(descriptor),
            Err(e) => {
                ModelError::InvalidValidator(e).report(buffer, location.clone());
                ok = false;
            }
        }
    }
    ok.then_some(out)
}

/// Report an expression that does not parse; generation proceeds
/// Report `name` as a declaration error unless it is a plain Rust identifier
///
/// Names are spliced into other identifiers (`with_<field>`), so keywords
/// and raw identifiers are both rejected.
pub(crate) fn check_identifier(
    name: &str,
    location: &SourceLocation,
    buffer: &mut DiagnosticBuffer,
) -> bool {
    if !name.starts_with("r#") && syn::parse_str::<syn::Ident>(name).is_ok() {
        return true;
    }
    ModelError::InvalidIdentifier(name.to_string()).report(buffer, location.clone());
    false
}

pub(crate) fn check_expression(
    text: &str,
    what: &str,
    location: &SourceLocation,
    buffer: &mut DiagnosticBuffer,
) {
    if let Err(e) = syn::parse_str::<syn::Expr>(text) {
        buffer.usage_error(
            "The $ `$` is not a valid expression: $",
            location.clone(),
            vec![what.to_string(), text.to_string(), e.to_string()],
        );
    }
}

/// Report a method body that does not parse as a block; generation proceeds
pub(crate) fn check_body(text: &str, location: &SourceLocation, buffer: &mut DiagnosticBuffer) {
    if let Err(e) = syn::parse_str::<syn::Block>(&format!("{{ {} }}", text)) {
        buffer.usage_error(
            "The method body `$` is not valid: $",
            location.clone(),
            vec![text.to_string(), e.to_string()],
        );
    }
}
