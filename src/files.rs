//! Static file serving from a sandboxed root directory.
//!
//! Every lookup is normalised lexically and checked for containment before
//! the filesystem is touched, then the resolved file is canonicalised and
//! checked again so symlinks cannot point outside the root.

use std::io;
use std::path::{Component, Path, PathBuf};

use anyhow::Context;

use crate::http::mime;
use crate::http::response::{Response, ResponseBuilder, StatusCode};

#[derive(Debug, thiserror::Error)]
pub enum StaticError {
    #[error("path escapes the static root: {0}")]
    Forbidden(String),
    #[error("no file at {0}")]
    NotFound(String),
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StaticError {
    pub fn status(&self) -> StatusCode {
        match self {
            StaticError::Forbidden(_) => StatusCode::FORBIDDEN,
            StaticError::NotFound(_) => StatusCode::NOT_FOUND,
            StaticError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A file loaded from the static root.
#[derive(Debug)]
pub struct StaticFile {
    pub path: PathBuf,
    pub content_type: &'static str,
    pub contents: Vec<u8>,
}

impl From<StaticFile> for Response {
    fn from(file: StaticFile) -> Self {
        ResponseBuilder::new(StatusCode::OK)
            .content_type(file.content_type)
            .body(file.contents)
            .build()
    }
}

#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
    index: String,
}

impl StaticFiles {
    /// Opens `root` as the static root, creating it if needed.
    pub fn new(root: impl AsRef<Path>, index: impl Into<String>) -> anyhow::Result<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root)
            .with_context(|| format!("creating static root {}", root.display()))?;
        let root = root
            .canonicalize()
            .with_context(|| format!("resolving static root {}", root.display()))?;

        Ok(Self {
            root,
            index: index.into(),
        })
    }

    /// The canonical absolute root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a decoded URL path to a filesystem path under the root without
    /// touching the filesystem.
    pub fn resolve_path(&self, url_path: &str) -> Result<PathBuf, StaticError> {
        let relative = if url_path == "/" {
            self.index.as_str()
        } else {
            url_path.trim_start_matches('/')
        };

        let candidate = normalize(&self.root.join(relative));
        if !candidate.starts_with(&self.root) {
            return Err(StaticError::Forbidden(url_path.to_string()));
        }
        Ok(candidate)
    }

    /// Resolves and reads the file for `url_path`.
    pub async fn load(&self, url_path: &str) -> Result<StaticFile, StaticError> {
        let path = self.resolve_path(url_path)?;

        let meta = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(_) => return Err(StaticError::NotFound(url_path.to_string())),
        };
        // A trailing slash names a directory; normalisation has dropped it
        let wants_dir = url_path.len() > 1 && url_path.ends_with('/');
        if !meta.is_file() || wants_dir {
            return Err(StaticError::NotFound(url_path.to_string()));
        }

        let real = tokio::fs::canonicalize(&path)
            .await
            .map_err(|_| StaticError::NotFound(url_path.to_string()))?;
        if !real.starts_with(&self.root) {
            return Err(StaticError::Forbidden(url_path.to_string()));
        }

        let contents = tokio::fs::read(&real).await.map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StaticError::NotFound(url_path.to_string()),
            _ => StaticError::Io {
                path: real.clone(),
                source: e,
            },
        })?;

        Ok(StaticFile {
            content_type: mime::from_path(&real),
            path: real,
            contents,
        })
    }

    /// Like [`load`](Self::load) but always produces a response.
    pub async fn serve(&self, url_path: &str) -> Response {
        match self.load(url_path).await {
            Ok(file) => file.into(),
            Err(e) => {
                match &e {
                    StaticError::Forbidden(_) => {
                        tracing::warn!(path = %url_path, "Blocked path traversal attempt")
                    }
                    StaticError::NotFound(_) => {}
                    StaticError::Io { .. } => {
                        tracing::error!(path = %url_path, error = %e, "Static file read failed")
                    }
                }
                Response::status_page(e.status())
            }
        }
    }
}

/// Resolves `.` and `..` segments lexically. `..` at the filesystem root
/// stays at the root.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(segment) => out.push(segment),
        }
    }
    out
}
