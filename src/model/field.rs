//! Field records
//!
//! Accessor members and stored-field members are unified into one
//! [`FieldInfo`]; generators read the access strategy instead of branching on
//! the member's original shape.

use super::types::TypeInfo;
use super::{check_expression, check_identifier, parse_validators, BatchContext, ModelError};
use crate::declaration::{MemberDecl, ValidatorDescriptor};
use crate::diagnostics::{DiagnosticBuffer, SourceLocation};
use crate::util::field_name_from_accessor;

/// How a field is read from the declared trait
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessStrategy {
    /// Stored field, read directly (`instance.label`)
    DirectField,
    /// Abstract accessor implemented as a stored-field read
    AccessorCall { accessor: String },
}

/// What a field's value comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldRole {
    /// Supplied by the caller
    Settable,
    /// Computed once at construction from other fields
    Derived(String),
    /// Supplied by the caller or taken from the default expression
    Defaulted(String),
}

/// How a nested declaration appears in a field type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestedShape {
    Plain,
    Optional,
    List,
}

/// A field whose value is the concrete type of another declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedField {
    pub declaration: String,
    pub shape: NestedShape,
}

/// One logical attribute of a declaration
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    pub name: String,
    pub ty: TypeInfo,
    pub access: AccessStrategy,
    pub role: FieldRole,
    pub validators: Vec<ValidatorDescriptor>,
    pub nested: Option<NestedField>,
    pub location: SourceLocation,
    pub description: Option<String>,
}

impl FieldInfo {
    pub fn is_derived(&self) -> bool {
        matches!(self.role, FieldRole::Derived(_))
    }

    pub fn is_defaulted(&self) -> bool {
        matches!(self.role, FieldRole::Defaulted(_))
    }

    /// Whether builders and constructors accept a value for the field
    pub fn is_input(&self) -> bool {
        !self.is_derived()
    }

    /// Whether a builder must be given a value before `build()`
    pub fn is_required(&self) -> bool {
        self.role == FieldRole::Settable && !self.ty.is_nullable()
    }

    pub fn default_expr(&self) -> Option<&str> {
        match &self.role {
            FieldRole::Defaulted(expr) => Some(expr),
            _ => None,
        }
    }

    pub fn derive_expr(&self) -> Option<&str> {
        match &self.role {
            FieldRole::Derived(expr) => Some(expr),
            _ => None,
        }
    }

    pub fn accessor(&self) -> Option<&str> {
        match &self.access {
            AccessStrategy::AccessorCall { accessor } => Some(accessor),
            AccessStrategy::DirectField => None,
        }
    }
}

/// Build a field from a member declaration
///
/// Every problem is reported; `None` means the member could not be modelled
/// and the declaration has been marked failed.
pub(crate) fn build_field(
    member: &MemberDecl,
    location: SourceLocation,
    batch: &BatchContext,
    buffer: &mut DiagnosticBuffer,
) -> Option<FieldInfo> {
    let (name, access) = match (&member.accessor, &member.field) {
        (Some(accessor), None) => (
            field_name_from_accessor(accessor).to_string(),
            AccessStrategy::AccessorCall {
                accessor: accessor.clone(),
            },
        ),
        (None, Some(field)) => (field.clone(), AccessStrategy::DirectField),
        (Some(_), Some(_)) => {
            ModelError::AmbiguousMember.report(buffer, location);
            return None;
        }
        (None, None) => {
            ModelError::UnnamedMember.report(buffer, location);
            return None;
        }
    };

    let mut ok = match &access {
        AccessStrategy::AccessorCall { accessor } if accessor != &name => {
            check_identifier(accessor, &location, buffer)
                && check_identifier(&name, &location, buffer)
        }
        _ => check_identifier(&name, &location, buffer),
    };
    let ty = match TypeInfo::parse(&member.typ) {
        Ok(ty) => Some(ty),
        Err(e) => {
            ModelError::Type(e).report(buffer, location.clone());
            ok = false;
            None
        }
    };

    let role = match (&member.default, &member.derive) {
        (Some(_), Some(_)) => {
            ModelError::DefaultAndDerive(name.clone()).report(buffer, location.clone());
            ok = false;
            FieldRole::Settable
        }
        (Some(default), None) => {
            check_expression(default, "default value", &location, buffer);
            FieldRole::Defaulted(default.trim().to_string())
        }
        (None, Some(derive)) => {
            check_expression(derive, "derivation", &location, buffer);
            FieldRole::Derived(derive.trim().to_string())
        }
        (None, None) => FieldRole::Settable,
    };

    let validators = parse_validators(&member.validators, &location, buffer);
    let ty = ty?;
    let validators = validators?;
    if !ok {
        return None;
    }

    let nested = batch.nested_declaration(&ty);
    Some(FieldInfo {
        name,
        ty,
        access,
        role,
        validators,
        nested,
        location,
        description: member.description.clone(),
    })
}
