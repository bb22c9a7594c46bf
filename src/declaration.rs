//! Declaration files: the input data model
//!
//! A declaration file lists declarations. Each declaration describes the
//! abstract surface of a type (its accessors, stored fields and methods) and
//! which companion artifacts to generate for it.
//!
//! ## Example
//!
//! ```yaml
//! declarations:
//!   - name: Point
//!     generate: [subclass, builder, converter]
//!     members:
//!       - accessor: get_x
//!         type: i64
//!         validators: [even]
//!       - accessor: get_double_x
//!         type: i64
//!         derive: "2 * x"
//!       - field: label
//!         type: String
//!         default: "String::from(\"origin\")"
//!     methods:
//!       - name: distance_to
//!         parameters:
//!           - name: other
//!             type: i64
//!         returns: i64
//!         interceptors: [cached]
//!         body: "(self.x - other).abs()"
//! ```

use crate::error::{Error, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// A declaration file
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[schemars(
    title = "declgen declarations",
    description = "Declarations to generate companion artifacts for"
)]
pub struct DeclarationFile {
    #[serde(default)]
    pub declarations: Vec<Declaration>,
}

impl DeclarationFile {
    /// Parse from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_norway::from_str(yaml).map_err(|e| Error::DeclarationParse(e.to_string()))
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> Result<String> {
        serde_norway::to_string(self).map_err(|e| Error::DeclarationParse(e.to_string()))
    }

    /// JSON schema of the file format
    pub fn json_schema() -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(DeclarationFile)).unwrap_or_default()
    }
}

/// One declaration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Declaration {
    /// Declaration name; artifact names derive from it
    pub name: String,

    /// Trait implemented by the generated concrete type (defaults to `name`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implements: Option<String>,

    /// Traits the declared type is known to implement
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supertypes: Vec<String>,

    /// Artifacts to generate
    #[serde(default)]
    pub generate: Vec<ArtifactKind>,

    /// Accessors and stored fields, in declaration order
    #[serde(default)]
    pub members: Vec<MemberDecl>,

    /// Methods whose bodies may be rewritten
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<MethodDecl>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Declaration {
    /// Trait path implemented by the concrete type
    pub fn trait_path(&self) -> &str {
        self.implements.as_deref().unwrap_or(&self.name)
    }

    /// SHA-256 of the declaration's canonical JSON form
    pub fn hash(&self) -> String {
        let canonical = serde_json::to_string(self).unwrap_or_default();
        hex::encode(Sha256::digest(canonical.as_bytes()))
    }
}

/// Generated artifact kinds
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Concrete type implementing the declared accessors
    #[serde(alias = "concrete_type")]
    Subclass,
    Builder,
    Converter,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [
        ArtifactKind::Subclass,
        ArtifactKind::Builder,
        ArtifactKind::Converter,
    ];

    /// The artifact this one cannot be generated without
    pub fn prerequisite(self) -> Option<ArtifactKind> {
        match self {
            ArtifactKind::Subclass => None,
            ArtifactKind::Builder => Some(ArtifactKind::Subclass),
            ArtifactKind::Converter => Some(ArtifactKind::Builder),
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Subclass => write!(f, "subclass"),
            ArtifactKind::Builder => write!(f, "builder"),
            ArtifactKind::Converter => write!(f, "converter"),
        }
    }
}

/// An accessor or stored field
///
/// Exactly one of `accessor` and `field` must be given.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MemberDecl {
    /// Abstract accessor name (`get_value`); the field is named after it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessor: Option<String>,

    /// Stored field name, read directly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    /// Rust type
    #[serde(rename = "type")]
    pub typ: String,

    /// Default value expression
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    /// Derivation expression over other fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derive: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validators: Vec<ValidatorSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl MemberDecl {
    /// Name as written (accessor or field)
    pub fn declared_name(&self) -> Option<&str> {
        self.accessor.as_deref().or(self.field.as_deref())
    }
}

/// A method whose body may be rewritten
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MethodDecl {
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterDecl>,

    /// Return type (unit when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<String>,

    /// Postconditions on the result
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validators: Vec<ValidatorSpec>,

    /// Interceptors, outermost first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interceptors: Vec<String>,

    /// Original method body (a Rust expression or block)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// A method parameter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ParameterDecl {
    pub name: String,

    #[serde(rename = "type")]
    pub typ: String,

    /// Preconditions on the parameter
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validators: Vec<ValidatorSpec>,
}

/// Validator as written: a bare tag or a single-entry map
///
/// ```yaml
/// validators:
///   - even
///   - greater_than: 3
///   - regex: "^[a-z]+$"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ValidatorSpec {
    Tag(String),
    Parameterized(BTreeMap<String, ValidatorArgument>),
}

impl ValidatorSpec {
    /// Normalize into a descriptor; a map must hold exactly one entry
    pub fn descriptor(&self) -> std::result::Result<ValidatorDescriptor, String> {
        match self {
            ValidatorSpec::Tag(tag) => Ok(ValidatorDescriptor::new(tag.trim(), None)),
            ValidatorSpec::Parameterized(map) => {
                let mut entries = map.iter();
                match (entries.next(), entries.next()) {
                    (Some((tag, arg)), None) => {
                        Ok(ValidatorDescriptor::new(tag.trim(), Some(arg.clone())))
                    }
                    _ => Err(format!(
                        "a validator map must have exactly one entry, found {}",
                        map.len()
                    )),
                }
            }
        }
    }
}

impl From<&str> for ValidatorSpec {
    fn from(tag: &str) -> Self {
        ValidatorSpec::Tag(tag.to_string())
    }
}

/// Validator argument value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ValidatorArgument {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl ValidatorArgument {
    /// Render as a Rust literal usable in a generated condition
    pub fn to_literal(&self) -> String {
        match self {
            ValidatorArgument::Bool(b) => b.to_string(),
            ValidatorArgument::Integer(i) => i.to_string(),
            ValidatorArgument::Float(f) => format!("{:?}", f),
            ValidatorArgument::Text(s) => crate::util::rust_string_literal(s),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ValidatorArgument::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ValidatorArgument::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ValidatorArgument::Integer(_) | ValidatorArgument::Float(_))
    }
}

impl fmt::Display for ValidatorArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidatorArgument::Bool(b) => write!(f, "{}", b),
            ValidatorArgument::Integer(i) => write!(f, "{}", i),
            ValidatorArgument::Float(x) => write!(f, "{:?}", x),
            ValidatorArgument::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A metadata tag plus its declared parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatorDescriptor {
    pub tag: String,
    pub argument: Option<ValidatorArgument>,
}

impl ValidatorDescriptor {
    pub fn new(tag: impl Into<String>, argument: Option<ValidatorArgument>) -> Self {
        Self {
            tag: tag.into(),
            argument,
        }
    }

    pub fn tag(tag: impl Into<String>) -> Self {
        Self::new(tag, None)
    }
}
