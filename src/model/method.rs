//! Method records

use super::types::TypeInfo;
use super::{check_body, check_identifier, parse_validators, ModelError};
use crate::declaration::{MethodDecl, ValidatorDescriptor};
use crate::diagnostics::{DiagnosticBuffer, SourceLocation};
use crate::intercept::InterceptorKind;
use crate::source::DeclarationSource;

/// A method parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterInfo {
    pub name: String,
    pub ty: TypeInfo,
    /// Preconditions
    pub validators: Vec<ValidatorDescriptor>,
    pub location: SourceLocation,
}

/// A method of the declared trait
#[derive(Debug, Clone, PartialEq)]
pub struct MethodInfo {
    pub name: String,
    pub parameters: Vec<ParameterInfo>,
    pub returns: TypeInfo,
    /// Outermost first
    pub interceptors: Vec<InterceptorKind>,
    /// Postconditions on the result
    pub validators: Vec<ValidatorDescriptor>,
    pub body: Option<String>,
    pub location: SourceLocation,
}

impl MethodInfo {
    /// Whether the generated concrete type overrides the method
    pub fn is_rewritten(&self) -> bool {
        !self.interceptors.is_empty()
            || !self.validators.is_empty()
            || self.parameters.iter().any(|p| !p.validators.is_empty())
    }

    pub fn has_interceptor(&self, kind: InterceptorKind) -> bool {
        self.interceptors.contains(&kind)
    }

    pub fn is_cached(&self) -> bool {
        self.has_interceptor(InterceptorKind::Cached)
    }

    /// Name of the per-instance cache field
    pub fn cache_field(&self) -> String {
        format!("{}_cache", self.name)
    }

    /// `name: Type` list for the method signature
    pub fn parameter_list(&self) -> String {
        self.parameters
            .iter()
            .map(|p| format!("{}: {}", p.name, p.ty))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

pub(crate) fn build_method(
    method: &MethodDecl,
    declaration: &str,
    source: &DeclarationSource,
    max_cache_arity: usize,
    buffer: &mut DiagnosticBuffer,
) -> Option<MethodInfo> {
    let location = source.locate_member(declaration, &method.name);
    let mut ok = check_identifier(&method.name, &location, buffer);

    let mut parameters = Vec::with_capacity(method.parameters.len());
    for param in &method.parameters {
        let param_location = location.with_member(format!("{}({})", method.name, param.name));
        let ty = match TypeInfo::parse(&param.typ) {
            Ok(ty) => Some(ty),
            Err(e) => {
                ModelError::Type(e).report(buffer, param_location.clone());
                None
            }
        };
        let named = check_identifier(&param.name, &param_location, buffer);
        let validators = parse_validators(&param.validators, &param_location, buffer);
        match (ty, validators) {
            (Some(ty), Some(validators)) if named => parameters.push(ParameterInfo {
                name: param.name.clone(),
                ty,
                validators,
                location: param_location,
            }),
            _ => ok = false,
        }
    }

    let returns = match method.returns.as_deref().map(TypeInfo::parse) {
        None => TypeInfo::unit(),
        Some(Ok(ty)) => ty,
        Some(Err(e)) => {
            ModelError::Type(e).report(buffer, location.clone());
            ok = false;
            TypeInfo::unit()
        }
    };

    let mut interceptors = Vec::new();
    for tag in &method.interceptors {
        match tag.parse::<InterceptorKind>() {
            Ok(kind) if !interceptors.contains(&kind) => interceptors.push(kind),
            Ok(_) => {}
            Err(_) => {
                ModelError::UnknownInterceptor(tag.clone()).report(buffer, location.clone());
                ok = false;
            }
        }
    }

    let validators = parse_validators(&method.validators, &location, buffer);
    if validators.is_none() {
        ok = false;
    }

    let mut info = MethodInfo {
        name: method.name.clone(),
        parameters,
        returns,
        interceptors,
        validators: validators.unwrap_or_default(),
        body: method.body.as_ref().map(|b| b.trim().to_string()),
        location: location.clone(),
    };
    if !ok {
        return None;
    }

    if info.is_rewritten() {
        match &info.body {
            None => {
                ModelError::MissingBody(info.name.clone()).report(buffer, location.clone());
                return None;
            }
            Some(body) => check_body(body, &location, buffer),
        }
    }

    if info.is_cached() {
        let count = info.parameters.len();
        if count > max_cache_arity {
            buffer.declaration_error(
                "Cannot cache more than $ parameters (method: $).",
                location,
                vec![max_cache_arity.to_string(), info.name.clone()],
            );
            return None;
        }
        if info.returns.is_unit() {
            buffer.usage_error(
                "The method $ returns nothing; its result cannot be cached.",
                location.clone(),
                vec![info.name.clone()],
            );
            info.interceptors.retain(|k| *k != InterceptorKind::Cached);
        } else {
            for param in &info.parameters {
                let (key, _) = param.ty.owned_key();
                if !key.is_hashable() {
                    buffer.usage_error(
                        "The parameter $ of type $ cannot be part of a cache key (not hashable).",
                        param.location.clone(),
                        vec![param.name.clone(), param.ty.to_string()],
                    );
                }
            }
        }
    }

    Some(info)
}
