//! Method interceptors
//!
//! A rewritten method body is assembled in fixed phases:
//!
//! ```text
//! Start → ContractsPre → CacheLookup → OriginalBody → CacheStore → ContractsPost → End
//! ```
//!
//! Interceptors contribute statements at the lookup and store points and may
//! wrap the original body. With interceptors `[a, b]`, `a` is the outermost:
//! lookups run `a` then `b`, the body is wrapped by `b` then `a`, and stores
//! run `b` then `a`.

mod cached;
mod logged;

pub use cached::CachedInterceptor;
pub use logged::LoggedInterceptor;

use crate::contract::{ContractTable, RESULT_BINDING};
use crate::model::MethodInfo;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Known interceptors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InterceptorKind {
    Cached,
    Logged,
}

impl InterceptorKind {
    pub fn tag(self) -> &'static str {
        match self {
            InterceptorKind::Cached => "cached",
            InterceptorKind::Logged => "logged",
        }
    }

    pub fn interceptor(self) -> &'static dyn MethodInterceptor {
        match self {
            InterceptorKind::Cached => &CachedInterceptor,
            InterceptorKind::Logged => &LoggedInterceptor,
        }
    }
}

impl FromStr for InterceptorKind {
    type Err = InterceptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "cached" | "cache" => Ok(InterceptorKind::Cached),
            "logged" | "log" => Ok(InterceptorKind::Logged),
            other => Err(InterceptError::Unknown(other.to_string())),
        }
    }
}

impl fmt::Display for InterceptorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Insertion points of a rewritten body, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Start,
    ContractsPre,
    CacheLookup,
    OriginalBody,
    CacheStore,
    ContractsPost,
    End,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Start => "start",
            Phase::ContractsPre => "preconditions",
            Phase::CacheLookup => "cache lookup",
            Phase::OriginalBody => "original body",
            Phase::CacheStore => "cache store",
            Phase::ContractsPost => "postconditions",
            Phase::End => "end",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InterceptError {
    #[error("Unknown interceptor `{0}`")]
    Unknown(String),

    #[error("cannot add {requested} statements after {current}")]
    PhaseOrder { current: Phase, requested: Phase },

    #[error("the original body of {0} was never added")]
    MissingBody(String),

    #[error("Cannot cache more than {limit} parameters (method: {method}).")]
    TooManyParameters { method: String, limit: usize },

    #[error("The method {0} returns nothing; its result cannot be cached.")]
    UnitResult(String),
}

/// Collects the statements of one method body phase by phase
#[derive(Debug)]
pub struct BodyRewriter {
    method: String,
    phase: Phase,
    statements: Vec<String>,
}

impl BodyRewriter {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            phase: Phase::Start,
            statements: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Append a statement; phases only move forward
    pub fn push(
        &mut self,
        phase: Phase,
        statement: impl Into<String>,
    ) -> Result<(), InterceptError> {
        let out_of_order = phase < self.phase
            || matches!(phase, Phase::Start | Phase::End)
            || (phase == Phase::OriginalBody && self.phase == Phase::OriginalBody);
        if out_of_order {
            return Err(InterceptError::PhaseOrder {
                current: self.phase,
                requested: phase,
            });
        }
        self.phase = phase;
        self.statements.push(statement.into());
        Ok(())
    }

    /// Close the body with its tail expression
    pub fn finish(mut self, tail: &str) -> Result<Vec<String>, InterceptError> {
        if self.phase < Phase::OriginalBody {
            return Err(InterceptError::MissingBody(self.method));
        }
        self.phase = Phase::End;
        self.statements.push(tail.to_string());
        Ok(self.statements)
    }
}

/// Settings interceptors read
#[derive(Debug, Clone, Copy)]
pub struct InterceptContext<'a> {
    pub declaration: &'a str,
    pub runtime_path: &'a str,
    pub max_cache_arity: usize,
}

/// Per-instance state an interceptor adds to the concrete type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateField {
    pub name: String,
    pub ty: String,
}

/// A cross-cutting behavior spliced into a method body
pub trait MethodInterceptor: Sync {
    fn kind(&self) -> InterceptorKind;

    /// Fields the concrete type needs, initialised with `Default::default()`
    fn state_fields(
        &self,
        _method: &MethodInfo,
        _ctx: &InterceptContext<'_>,
    ) -> Result<Vec<StateField>, InterceptError> {
        Ok(Vec::new())
    }

    /// Statements run before the original body
    fn lookup(
        &self,
        method: &MethodInfo,
        ctx: &InterceptContext<'_>,
    ) -> Result<Vec<String>, InterceptError>;

    /// Wrap the body expression
    fn guard(&self, _method: &MethodInfo, inner: String) -> String {
        inner
    }

    /// Statements run after the original body, with the value bound to `result`
    fn store(&self, method: &MethodInfo, ctx: &InterceptContext<'_>) -> Vec<String>;
}

/// A method body rewritten with its contracts and interceptors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenMethod {
    pub signature: String,
    pub statements: Vec<String>,
    pub state_fields: Vec<StateField>,
}

/// Rewrite one method
pub fn rewrite(
    method: &MethodInfo,
    contracts: &ContractTable,
    ctx: &InterceptContext<'_>,
) -> Result<RewrittenMethod, InterceptError> {
    let interceptors: Vec<&dyn MethodInterceptor> = method
        .interceptors
        .iter()
        .map(|kind| kind.interceptor())
        .collect();
    let mut body = BodyRewriter::new(&method.name);

    for param in &method.parameters {
        for contract in contracts.for_parameter(&method.name, &param.name) {
            body.push(Phase::ContractsPre, contract.assertion())?;
        }
    }

    let mut state_fields = Vec::new();
    for interceptor in &interceptors {
        state_fields.extend(interceptor.state_fields(method, ctx)?);
        for statement in interceptor.lookup(method, ctx)? {
            body.push(Phase::CacheLookup, statement)?;
        }
    }

    let original = method
        .body
        .as_deref()
        .ok_or_else(|| InterceptError::MissingBody(method.name.clone()))?;
    let mut expr = format!("{{\n{}\n}}", original);
    for interceptor in interceptors.iter().rev() {
        expr = interceptor.guard(method, expr);
    }
    body.push(
        Phase::OriginalBody,
        format!("let {}: {} = {};", RESULT_BINDING, method.returns, expr),
    )?;

    for interceptor in interceptors.iter().rev() {
        for statement in interceptor.store(method, ctx) {
            body.push(Phase::CacheStore, statement)?;
        }
    }

    for contract in contracts.for_result(&method.name) {
        body.push(Phase::ContractsPost, contract.assertion())?;
    }

    let mut signature = format!("fn {}(&self", method.name);
    if !method.parameters.is_empty() {
        signature.push_str(", ");
        signature.push_str(&method.parameter_list());
    }
    signature.push(')');
    if !method.returns.is_unit() {
        signature.push_str(&format!(" -> {}", method.returns));
    }

    Ok(RewrittenMethod {
        signature,
        statements: body.finish(RESULT_BINDING)?,
        state_fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::Contract;
    use crate::diagnostics::SourceLocation;
    use crate::model::{ParameterInfo, TypeInfo};
    use pretty_assertions::assert_eq;

    fn method(interceptors: Vec<InterceptorKind>, params: &[(&str, &str)]) -> MethodInfo {
        MethodInfo {
            name: "area".into(),
            parameters: params
                .iter()
                .map(|(name, ty)| ParameterInfo {
                    name: name.to_string(),
                    ty: TypeInfo::parse(ty).unwrap(),
                    validators: vec![],
                    location: SourceLocation::default(),
                })
                .collect(),
            returns: TypeInfo::parse("u64").unwrap(),
            interceptors,
            validators: vec![],
            body: Some("self.w * scale".into()),
            location: SourceLocation::default(),
        }
    }

    fn ctx() -> InterceptContext<'static> {
        InterceptContext {
            declaration: "Rect",
            runtime_path: "::declgen::runtime",
            max_cache_arity: 8,
        }
    }

    #[test]
    fn phases_only_move_forward() {
        let mut body = BodyRewriter::new("m");
        body.push(Phase::ContractsPre, "a;").unwrap();
        body.push(Phase::OriginalBody, "let result = 1;").unwrap();
        let err = body.push(Phase::CacheLookup, "b;").unwrap_err();
        assert_eq!(
            err,
            InterceptError::PhaseOrder {
                current: Phase::OriginalBody,
                requested: Phase::CacheLookup
            }
        );
        assert!(body.push(Phase::OriginalBody, "again").is_err());
        assert!(body.push(Phase::End, "x").is_err());
    }

    #[test]
    fn body_is_required_before_finish() {
        let mut body = BodyRewriter::new("m");
        body.push(Phase::CacheLookup, "a;").unwrap();
        assert_eq!(body.finish("result"), Err(InterceptError::MissingBody("m".into())));
    }

    #[test]
    fn interceptors_nest_outermost_first() {
        let method = method(
            vec![InterceptorKind::Logged, InterceptorKind::Cached],
            &[("scale", "u64")],
        );
        let rewritten = rewrite(&method, &ContractTable::default(), &ctx()).unwrap();
        let s = &rewritten.statements;
        assert!(s[0].contains("\"enter\""));
        assert!(s[1].starts_with("let cache_key = scale;"));
        assert!(s[2].contains("self.area_cache.borrow().get(&cache_key).cloned()"));
        assert!(s[3].starts_with("let result: u64 = match cached_value"));
        assert!(s[4].contains("borrow_mut().entry(cache_key)"));
        assert!(s[5].contains("\"exit\""));
        assert_eq!(s[6], "result");
        assert_eq!(rewritten.signature, "fn area(&self, scale: u64) -> u64");
        assert_eq!(
            rewritten.state_fields,
            vec![StateField {
                name: "area_cache".into(),
                ty: "::std::cell::RefCell<::std::collections::HashMap<u64, u64>>".into()
            }]
        );
    }

    #[test]
    fn contracts_surround_the_body() {
        let method = method(vec![], &[("scale", "u64")]);
        let pre = Contract {
            subject: "scale".into(),
            condition: "scale > 0".into(),
            message: "The scale has to be positive but was $.".into(),
            arguments: vec!["scale".into()],
        };
        let table = ContractTable::default().with_parameter_contract("area", "scale", pre);
        let rewritten = rewrite(&method, &table, &ctx()).unwrap();
        assert!(rewritten.statements[0].starts_with("assert!(scale > 0"));
        assert!(rewritten.statements[1].starts_with("let result: u64 = {"));
        assert!(rewritten.state_fields.is_empty());
    }
}
