//! Web root containment.
//!
//! [`WebRoot`] turns a client-supplied URL path into a [`ResolvedPath`] that is
//! guaranteed to live under the configured root directory.
//!
//! # Resolution Steps
//!
//! 1. Percent-decode the URL path
//! 2. Append its components onto the canonical root (leading `/` never
//!    replaces the root, `..` may not climb above it)
//! 3. Canonicalize, resolving `.`, `..` and symlinks
//! 4. Check containment component-wise (`/srv/web-evil` is not under `/srv/web`)
//! 5. For directories, append [`DEFAULT_DOCUMENT`] and repeat 3-4

use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::error::PathError;

/// Document served when a request resolves to a directory.
pub const DEFAULT_DOCUMENT: &str = "index.html";

/// Canonical, sandboxed web root directory.
#[derive(Debug, Clone)]
pub struct WebRoot {
    root: PathBuf,
}

/// A canonical filesystem path that is a descendant of a [`WebRoot`].
///
/// Only [`WebRoot::resolve`] creates these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    path: PathBuf,
    request_path: String,
}

impl ResolvedPath {
    /// Absolute canonical path on disk.
    pub fn as_path(&self) -> &Path {
        &self.path
    }

    /// The request path this was resolved from.
    pub fn request_path(&self) -> &str {
        &self.request_path
    }
}

impl WebRoot {
    /// Canonicalize `root` once.
    ///
    /// Fails if the directory does not exist; callers treat this as fatal.
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = std::fs::canonicalize(root.as_ref())?;
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a directory", root.display()),
            ));
        }
        Ok(Self { root })
    }

    /// The canonical root directory.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Join a plain file name onto the root without touching the filesystem.
    ///
    /// Used for server-owned files such as the annotated image; returns `None`
    /// unless `name` is a single normal path component.
    pub fn child(&self, name: &str) -> Option<PathBuf> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) => Some(self.root.join(part)),
            _ => None,
        }
    }

    /// Resolve a raw (still percent-encoded) URL path.
    pub async fn resolve(&self, request_path: &str) -> Result<ResolvedPath, PathError> {
        let decoded = urlencoding::decode(request_path).map_err(|e| PathError::NotFound {
            path: request_path.to_string(),
            reason: format!("invalid percent-encoding: {}", e),
        })?;
        self.resolve_decoded(&decoded).await
    }

    /// Resolve an already decoded URL path.
    pub async fn resolve_decoded(&self, request_path: &str) -> Result<ResolvedPath, PathError> {
        if request_path.contains('\0') {
            return Err(PathError::NotFound {
                path: request_path.to_string(),
                reason: "path contains a NUL byte".to_string(),
            });
        }

        let joined = self.join(request_path)?;
        let mut path = self.canonicalize_within(&joined, request_path).await?;

        let is_dir = tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_dir())
            .map_err(|e| not_found(request_path, e))?;

        if is_dir {
            // index.html may itself be a symlink, so it gets the full check
            path = self
                .canonicalize_within(&path.join(DEFAULT_DOCUMENT), request_path)
                .await?;
        }

        debug!(request = request_path, resolved = %path.display(), "Resolved path");

        Ok(ResolvedPath {
            path,
            request_path: request_path.to_string(),
        })
    }

    /// Append the request's components onto the root.
    ///
    /// Root-dir components are dropped (`/a` and `//a` both mean `root/a`).
    /// A `..` that climbs above the root is rejected here, before any
    /// filesystem call, so escapes fail the same way whether or not the
    /// target exists. Other `..` are kept for canonicalization.
    fn join(&self, request_path: &str) -> Result<PathBuf, PathError> {
        let outside = || PathError::OutsideRoot {
            path: request_path.to_string(),
        };

        let mut joined = self.root.clone();
        let mut depth: usize = 0;
        for component in Path::new(request_path).components() {
            match component {
                Component::RootDir | Component::CurDir => {}
                Component::Prefix(_) => return Err(outside()),
                Component::ParentDir => {
                    depth = depth.checked_sub(1).ok_or_else(outside)?;
                    joined.push("..");
                }
                Component::Normal(part) => {
                    depth += 1;
                    joined.push(part);
                }
            }
        }
        Ok(joined)
    }

    async fn canonicalize_within(
        &self,
        candidate: &Path,
        request_path: &str,
    ) -> Result<PathBuf, PathError> {
        let canonical = tokio::fs::canonicalize(candidate)
            .await
            .map_err(|e| not_found(request_path, e))?;

        if !self.contains(&canonical) {
            return Err(PathError::OutsideRoot {
                path: request_path.to_string(),
            });
        }
        Ok(canonical)
    }

    /// Component-wise prefix check.
    pub fn contains(&self, canonical: &Path) -> bool {
        let mut root = self.root.components();
        let mut candidate = canonical.components();
        loop {
            match (root.next(), candidate.next()) {
                (None, _) => return true,
                (Some(_), None) => return false,
                (Some(a), Some(b)) if a != b => return false,
                _ => {}
            }
        }
    }
}

fn not_found(request_path: &str, err: io::Error) -> PathError {
    PathError::NotFound {
        path: request_path.to_string(),
        reason: err.to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================
