//! Call logging interceptor
//!
//! Emits `tracing` debug events on entry and exit through the runtime
//! re-export, so generated code needs no direct `tracing` dependency.

use super::{InterceptContext, InterceptError, InterceptorKind, MethodInterceptor};
use crate::model::MethodInfo;

pub struct LoggedInterceptor;

impl LoggedInterceptor {
    fn event(method: &MethodInfo, ctx: &InterceptContext<'_>, message: &str) -> String {
        format!(
            "{}::tracing::debug!(declaration = \"{}\", method = \"{}\", \"{}\");",
            ctx.runtime_path, ctx.declaration, method.name, message
        )
    }
}

impl MethodInterceptor for LoggedInterceptor {
    fn kind(&self) -> InterceptorKind {
        InterceptorKind::Logged
    }

    fn lookup(
        &self,
        method: &MethodInfo,
        ctx: &InterceptContext<'_>,
    ) -> Result<Vec<String>, InterceptError> {
        Ok(vec![Self::event(method, ctx, "enter")])
    }

    fn store(&self, method: &MethodInfo, ctx: &InterceptContext<'_>) -> Vec<String> {
        vec![Self::event(method, ctx, "exit")]
    }
}
