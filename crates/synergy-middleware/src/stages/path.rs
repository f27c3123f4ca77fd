//! Resolves relative resource names against a base path.

use crate::context::PipelineContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use std::path::{Path, PathBuf};
use synergy_core::{DispatchResult, Request, Response};

/// Pushes `root/name` for relative resource names.
///
/// Absolute paths and names carrying a scheme prefix (`sql://...`) are left
/// alone. A relative root is anchored to the working directory once, at
/// construction, so the pushed name is always absolute and a rooted
/// controller never joins it onto its own root a second time.
#[derive(Debug, Clone)]
pub struct PathResolveMiddleware {
    root: PathBuf,
}

impl PathResolveMiddleware {
    /// Creates the stage resolving against `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: anchored(root.into()),
        }
    }

    /// Returns the base path.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the resolved name, or `None` if `name` is left as is.
    pub fn resolve(&self, name: &str) -> Option<String> {
        if name.is_empty() || name.contains("://") || Path::new(name).is_absolute() {
            return None;
        }
        Some(self.root.join(name).to_string_lossy().into_owned())
    }
}

fn anchored(root: PathBuf) -> PathBuf {
    if root.is_absolute() {
        return root;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(root),
        Err(err) => {
            tracing::warn!(root = %root.display(), error = %err, "Keeping relative resource root");
            root
        }
    }
}

impl Middleware for PathResolveMiddleware {
    fn name(&self) -> &'static str {
        "path_resolve"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut PipelineContext,
        mut request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, DispatchResult<Response>> {
        Box::pin(async move {
            if let Some(resolved) = self.resolve(request.resource_name()) {
                request.push_resource_name(resolved);
            }
            next.run(ctx, request).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::FnEndpoint;
    use crate::pipeline::Pipeline;

    #[test]
    fn test_resolve() {
        let stage = PathResolveMiddleware::new("/srv/data");
        assert_eq!(stage.resolve("a.txt").as_deref(), Some("/srv/data/a.txt"));
        assert_eq!(stage.resolve("dir/b.txt").as_deref(), Some("/srv/data/dir/b.txt"));
        assert_eq!(stage.resolve("/etc/hosts"), None);
        assert_eq!(stage.resolve("sql://db/table"), None);
        assert_eq!(stage.resolve(""), None);
    }

    #[test]
    fn test_relative_root_resolves_to_absolute_names() {
        let stage = PathResolveMiddleware::new("data");
        let expected = std::env::current_dir().unwrap().join("data").join("a.txt");

        assert!(stage.root().is_absolute());
        assert_eq!(
            stage.resolve("a.txt").as_deref(),
            Some(expected.to_string_lossy().as_ref())
        );
    }

    #[tokio::test]
    async fn test_push_increases_depth_by_one() {
        let pipeline = Pipeline::builder()
            .add_stage(PathResolveMiddleware::new("/srv"))
            .build(FnEndpoint::new(|request: Request| async move {
                let depth = request.resource_names().depth();
                let original = request.resource_names().bottom().clone();
                Ok(Response::ok(format!("{depth}:{original}:{}", request.resource_name())))
            }));

        let response = pipeline.process(Request::read("file", "a.txt")).await.unwrap();
        assert_eq!(response.resource_name(), "2:a.txt:/srv/a.txt");

        let response = pipeline.process(Request::read("file", "/abs")).await.unwrap();
        assert_eq!(response.resource_name(), "1:/abs:/abs");
    }
}
