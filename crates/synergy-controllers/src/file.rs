//! File system controller.
//!
//! Serves the `file` schema from a directory tree. Resource names are paths
//! relative to the controller root; absolute names are accepted only when
//! they lie under the root. Names that would escape the root (through `..`
//! or an unrelated absolute path) are rejected with
//! [`DispatchError::InvalidRequestShape`].

use bytes::Bytes;
use std::io;
use std::path::{Component, Path, PathBuf};
use synergy_core::{
    BoxFuture, Controller, DispatchError, DispatchResult, Payload, Request, Response, Schema,
};
use tokio::fs;
use tracing::debug;

fn anchored(root: PathBuf) -> PathBuf {
    if root.is_absolute() {
        return root;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(root),
        Err(err) => {
            tracing::warn!(root = %root.display(), error = %err, "Keeping relative controller root");
            root
        }
    }
}

/// A controller reading and writing files below a root directory.
#[derive(Debug, Clone)]
pub struct FileController {
    name: String,
    root: PathBuf,
    root_display: String,
    schemas: Vec<Schema>,
    tags: Vec<String>,
}

impl FileController {
    /// Creates a controller rooted at `root`, serving the `file` schema.
    ///
    /// A relative root is anchored to the working directory at construction.
    #[must_use]
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        let root = anchored(root.into());
        Self {
            name: name.into(),
            root_display: root.to_string_lossy().into_owned(),
            root,
            schemas: vec![Schema::new("file")],
            tags: Vec::new(),
        }
    }

    /// Replaces the served schemas.
    #[must_use]
    pub fn with_schemas<I, S>(mut self, schemas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.schemas = schemas.into_iter().map(Schema::new).collect();
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a resource name to a path under the root.
    ///
    /// The mapping is lexical; symlinks are not followed.
    pub fn resolve(&self, resource: &str) -> DispatchResult<PathBuf> {
        let escape = || {
            DispatchError::invalid_request_shape(
                &self.name,
                resource,
                format!("a path under {}", self.root.display()),
                "path outside the root",
            )
        };

        let raw = Path::new(resource);
        let relative = if raw.is_absolute() {
            raw.strip_prefix(&self.root).map_err(|_| escape())?
        } else {
            raw
        };

        let mut resolved = self.root.clone();
        let mut depth = 0usize;
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    resolved.push(part);
                    depth += 1;
                }
                Component::CurDir => {}
                Component::ParentDir => {
                    if depth == 0 {
                        return Err(escape());
                    }
                    resolved.pop();
                    depth -= 1;
                }
                Component::RootDir | Component::Prefix(_) => return Err(escape()),
            }
        }

        if depth == 0 {
            return Err(DispatchError::invalid_request_shape(
                &self.name,
                resource,
                "a file name",
                "the root directory",
            ));
        }
        Ok(resolved)
    }

    async fn contents(&self, request: &Request) -> DispatchResult<Bytes> {
        match request.data().resolve().await? {
            Payload::Text(text) => Ok(Bytes::from(text)),
            Payload::Bytes(bytes) => Ok(bytes),
            Payload::Json(value) => serde_json::to_vec(&value).map(Bytes::from).map_err(|err| {
                self.io_error(request.resource_name(), "serializing JSON payload", err)
            }),
            other => Err(DispatchError::invalid_request_shape(
                &self.name,
                request.resource_name(),
                "text, bytes or json",
                other.kind(),
            )),
        }
    }

    fn io_error(
        &self,
        resource: &str,
        action: &str,
        err: impl std::error::Error + Send + Sync + 'static,
    ) -> DispatchError {
        DispatchError::controller_with_source(&self.name, resource, action, err)
    }

    async fn write(&self, path: &Path, resource: &str, contents: Bytes) -> DispatchResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|err| self.io_error(resource, "creating parent directories", err))?;
        }
        fs::write(path, &contents)
            .await
            .map_err(|err| self.io_error(resource, "writing file", err))?;
        debug!(
            controller = %self.name,
            path = %path.display(),
            bytes = contents.len(),
            "File written"
        );
        Ok(())
    }
}

fn is_missing(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::NotFound
}

impl Controller for FileController {
    fn name(&self) -> &str {
        &self.name
    }

    fn schemas(&self) -> &[Schema] {
        &self.schemas
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }

    fn resource_name_root(&self) -> Option<&str> {
        Some(&self.root_display)
    }

    fn create<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, DispatchResult<Response>> {
        Box::pin(async move {
            let resource = request.resource_name();
            let path = self.resolve(resource)?;
            let contents = self.contents(request).await?;
            self.write(&path, resource, contents).await?;
            Ok(Response::ok(resource))
        })
    }

    fn read<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, DispatchResult<Response>> {
        Box::pin(async move {
            let resource = request.resource_name();
            let path = self.resolve(resource)?;
            match fs::read(&path).await {
                Ok(contents) => Ok(Response::success(resource, Payload::Bytes(contents.into()))),
                Err(err) if is_missing(&err) => Ok(Response::not_found(resource)),
                Err(err) => Err(self.io_error(resource, "reading file", err)),
            }
        })
    }

    fn update<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, DispatchResult<Response>> {
        Box::pin(async move {
            let resource = request.resource_name();
            let path = self.resolve(resource)?;
            let exists = fs::try_exists(&path)
                .await
                .map_err(|err| self.io_error(resource, "checking file", err))?;
            if !exists {
                return Ok(Response::not_found(resource));
            }
            let contents = self.contents(request).await?;
            self.write(&path, resource, contents).await?;
            Ok(Response::ok(resource))
        })
    }

    fn delete<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, DispatchResult<Response>> {
        Box::pin(async move {
            let resource = request.resource_name();
            let path = self.resolve(resource)?;
            match fs::remove_file(&path).await {
                Ok(()) => {
                    debug!(controller = %self.name, path = %path.display(), "File deleted");
                    Ok(Response::ok(resource))
                }
                Err(err) if is_missing(&err) => Ok(Response::not_found(resource)),
                Err(err) => Err(self.io_error(resource, "deleting file", err)),
            }
        })
    }
}
