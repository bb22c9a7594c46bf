//! Memoizing interceptor
//!
//! The cache is a per-instance `RefCell<HashMap<K, R>>` with no eviction.
//! The key is `()` without parameters, the owned parameter type for one
//! parameter, and a tuple of owned types up to the configured arity.

use super::{InterceptContext, InterceptError, InterceptorKind, MethodInterceptor, StateField};
use crate::contract::RESULT_BINDING;
use crate::model::{MethodInfo, TypeInfo};

pub struct CachedInterceptor;

const KEY: &str = "cache_key";
const HIT: &str = "cached_value";

impl CachedInterceptor {
    /// Key type and the expression building it from the parameters
    pub fn key(method: &MethodInfo) -> (TypeInfo, String) {
        let mut parts: Vec<(TypeInfo, String)> = method
            .parameters
            .iter()
            .map(|p| {
                let (ty, conversion) = p.ty.owned_key();
                (ty, conversion.apply(&p.name))
            })
            .collect();
        match parts.len() {
            0 => (TypeInfo::unit(), "()".to_string()),
            1 => parts.remove(0),
            _ => {
                let exprs: Vec<String> = parts.iter().map(|(_, e)| e.clone()).collect();
                let types = parts.into_iter().map(|(t, _)| t).collect();
                (TypeInfo::tuple(types), format!("({})", exprs.join(", ")))
            }
        }
    }

    fn check(method: &MethodInfo, ctx: &InterceptContext<'_>) -> Result<(), InterceptError> {
        if method.parameters.len() > ctx.max_cache_arity {
            return Err(InterceptError::TooManyParameters {
                method: method.name.clone(),
                limit: ctx.max_cache_arity,
            });
        }
        if method.returns.is_unit() {
            return Err(InterceptError::UnitResult(method.name.clone()));
        }
        Ok(())
    }
}

impl MethodInterceptor for CachedInterceptor {
    fn kind(&self) -> InterceptorKind {
        InterceptorKind::Cached
    }

    fn state_fields(
        &self,
        method: &MethodInfo,
        ctx: &InterceptContext<'_>,
    ) -> Result<Vec<StateField>, InterceptError> {
        Self::check(method, ctx)?;
        let (key, _) = Self::key(method);
        Ok(vec![StateField {
            name: method.cache_field(),
            ty: format!(
                "::std::cell::RefCell<::std::collections::HashMap<{}, {}>>",
                key, method.returns
            ),
        }])
    }

    fn lookup(
        &self,
        method: &MethodInfo,
        ctx: &InterceptContext<'_>,
    ) -> Result<Vec<String>, InterceptError> {
        Self::check(method, ctx)?;
        let (_, key_expr) = Self::key(method);
        Ok(vec![
            format!("let {} = {};", KEY, key_expr),
            format!(
                "let {} = self.{}.borrow().get(&{}).cloned();",
                HIT,
                method.cache_field(),
                KEY
            ),
        ])
    }

    fn guard(&self, _method: &MethodInfo, inner: String) -> String {
        format!("match {} {{\n    Some(value) => value,\n    None => {},\n}}", HIT, inner)
    }

    fn store(&self, method: &MethodInfo, _ctx: &InterceptContext<'_>) -> Vec<String> {
        vec![format!(
            "self.{}.borrow_mut().entry({}).or_insert_with(|| {}.clone());",
            method.cache_field(),
            KEY,
            RESULT_BINDING
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::SourceLocation;
    use crate::model::ParameterInfo;
    use rstest::rstest;

    fn method(params: &[&str]) -> MethodInfo {
        MethodInfo {
            name: "f".into(),
            parameters: params
                .iter()
                .enumerate()
                .map(|(i, ty)| ParameterInfo {
                    name: format!("p{}", i),
                    ty: TypeInfo::parse(ty).unwrap(),
                    validators: vec![],
                    location: SourceLocation::default(),
                })
                .collect(),
            returns: TypeInfo::parse("String").unwrap(),
            interceptors: vec![InterceptorKind::Cached],
            validators: vec![],
            body: Some("String::new()".into()),
            location: SourceLocation::default(),
        }
    }

    #[rstest]
    #[case(&[], "()", "()")]
    #[case(&["&str"], "String", "p0.to_owned()")]
    #[case(&["u8", "&[i32]"], "(u8, Vec<i32>)", "(p0, p1.to_vec())")]
    #[case(&["String", "&u64", "bool"], "(String, u64, bool)", "(p0.clone(), *p1, p2)")]
    fn keys_follow_parameter_count(#[case] params: &[&str], #[case] ty: &str, #[case] expr: &str) {
        let (key, key_expr) = CachedInterceptor::key(&method(params));
        assert_eq!(key.to_string(), ty);
        assert_eq!(key_expr, expr);
    }

    #[test]
    fn arity_and_unit_results_are_rejected() {
        let ctx = InterceptContext {
            declaration: "D",
            runtime_path: "::declgen::runtime",
            max_cache_arity: 2,
        };
        let wide = method(&["u8", "u8", "u8"]);
        assert_eq!(
            CachedInterceptor.lookup(&wide, &ctx).unwrap_err().to_string(),
            "Cannot cache more than 2 parameters (method: f)."
        );

        let mut unit = method(&[]);
        unit.returns = TypeInfo::unit();
        assert_eq!(
            CachedInterceptor.state_fields(&unit, &ctx).unwrap_err(),
            InterceptError::UnitResult("f".into())
        );
    }
}
