//! Filesystem blob storage for artifact payloads too large to inline.
//!
//! Object keys are slash-separated; each segment is sanitized before it
//! touches the filesystem, so a hostile artifact key cannot escape the root.

use shared_types::StoreError;
use std::io::ErrorKind;
use std::path::PathBuf;

pub struct BlobStore {
    root: PathBuf,
}

/// Blob object key for an artifact payload, addressed by key and content.
pub fn object_key(key: &str, sha256: &str) -> String {
    format!("artifact/{key}/{sha256}")
}

fn sanitize_segment(segment: &str) -> String {
    let cleaned: String = segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "_".to_string()
    } else {
        cleaned
    }
}

impl BlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, object_key: &str) -> PathBuf {
        let mut path = self.root.clone();
        for segment in object_key.split('/').filter(|s| !s.is_empty()) {
            path.push(sanitize_segment(segment));
        }
        path
    }

    pub fn put(&self, object_key: &str, text: &str) -> Result<(), StoreError> {
        let path = self.path_for(object_key);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .map_err(|e| StoreError::blob(format!("create {}: {e}", dir.display())))?;
        }
        std::fs::write(&path, text)
            .map_err(|e| StoreError::blob(format!("write {}: {e}", path.display())))
    }

    /// `Ok(None)` when the object does not exist.
    pub fn get(&self, object_key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(object_key);
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::blob(format!("read {}: {e}", path.display()))),
        }
    }
}
