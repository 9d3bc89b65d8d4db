use std::fs;
use std::path::Path;
use std::sync::Arc;

use slatedb::object_store::ObjectStore;
use slatedb::Db;
use thiserror::Error;

use crate::settings::Backend;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("slatedb error: {0}")]
    Slate(#[from] slatedb::Error),
    #[error("invalid object store path: {0}")]
    InvalidPath(String),
}

/// A resolved object store plus the canonical path the database is opened at.
pub struct ResolvedStore {
    pub store: Arc<dyn ObjectStore>,
    pub canonical_path: String,
}

/// Map a configured backend to the object store slatedb should run on.
pub fn resolve_object_store(backend: &Backend, path: &str) -> Result<ResolvedStore, BackendError> {
    match backend {
        Backend::Fs => {
            let root = Path::new(path);
            if !root.exists() {
                fs::create_dir_all(root).map_err(|e| {
                    BackendError::InvalidPath(format!("failed to create fs root {path}: {e}"))
                })?;
            }
            // Canonicalize so relative paths don't round-trip through URL encoding
            let canonical = root.canonicalize().map_err(|e| {
                BackendError::InvalidPath(format!("failed to canonicalize {path}: {e}"))
            })?;
            let canonical_path = canonical.to_string_lossy().to_string();
            let fs = slatedb::object_store::local::LocalFileSystem::new_with_prefix(&canonical_path)
                .map_err(|e| BackendError::InvalidPath(e.to_string()))?;
            Ok(ResolvedStore {
                store: Arc::new(fs),
                canonical_path,
            })
        }
        Backend::Memory => Ok(ResolvedStore {
            store: Arc::new(slatedb::object_store::memory::InMemory::new()),
            canonical_path: path.to_string(),
        }),
        Backend::S3 | Backend::Url => {
            // Path is a URL understood by slatedb's resolver, e.g. s3://bucket/prefix
            let store = Db::resolve_object_store(path)?;
            Ok(ResolvedStore {
                store,
                canonical_path: path.to_string(),
            })
        }
    }
}
