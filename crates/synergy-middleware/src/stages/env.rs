//! Environment variable expansion for resource names.
//!
//! Replaces `${NAME}` references in the effective resource name with the
//! value of the variable. Unknown variables and unterminated references are
//! left as written. A new name is pushed only when something was expanded,
//! so the original stays beneath it.
//!
//! Because the dispatcher keys its resolution cache on the effective name,
//! running this stage before dispatch means the expanded name is what gets
//! cached.

use crate::context::PipelineContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use std::fmt;
use std::sync::Arc;
use synergy_core::{DispatchResult, Request, Response};

type Lookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Expands `${NAME}` references in the resource name.
#[derive(Clone)]
pub struct EnvExpandMiddleware {
    lookup: Lookup,
}

impl fmt::Debug for EnvExpandMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvExpandMiddleware").finish_non_exhaustive()
    }
}

impl Default for EnvExpandMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvExpandMiddleware {
    /// Expands from the process environment.
    #[must_use]
    pub fn new() -> Self {
        Self::with_lookup(|name| std::env::var(name).ok())
    }

    /// Expands using a custom variable source.
    #[must_use]
    pub fn with_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            lookup: Arc::new(lookup),
        }
    }

    /// Expands `input`, returning `None` when nothing changed.
    pub fn expand(&self, input: &str) -> Option<String> {
        let mut output = String::with_capacity(input.len());
        let mut rest = input;
        let mut changed = false;

        while let Some(start) = rest.find("${") {
            output.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                output.push_str(&rest[start..]);
                rest = "";
                break;
            };

            let name = &after[..end];
            match (self.lookup)(name) {
                Some(value) if !name.is_empty() => {
                    output.push_str(&value);
                    changed = true;
                }
                _ => output.push_str(&rest[start..start + 2 + end + 1]),
            }
            rest = &after[end + 1..];
        }
        output.push_str(rest);

        changed.then_some(output)
    }
}

impl Middleware for EnvExpandMiddleware {
    fn name(&self) -> &'static str {
        "env_expand"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut PipelineContext,
        mut request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, DispatchResult<Response>> {
        Box::pin(async move {
            if let Some(expanded) = self.expand(request.resource_name()) {
                tracing::debug!(
                    from = request.resource_name(),
                    to = %expanded,
                    "Resource name expanded"
                );
                request.push_resource_name(expanded);
            }
            next.run(ctx, request).await
        })
    }
}
