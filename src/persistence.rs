//! Saving and loading document trees.
//!
//! JSON is the interchange format (nested `title`/`start_index`/`end_index`/
//! `node_id`/`summary`/`nodes` objects); bincode is available for compact
//! caches. The format follows the file extension.

use crate::error::{OutlineError, Result};
use crate::tree::DocumentTree;
use std::fs;
use std::path::Path;

/// Save format for tree files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveFormat {
    Json,
    Bincode,
}

impl SaveFormat {
    /// `.bin`/`.bincode` are bincode, everything else is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("bin") | Some("bincode") => SaveFormat::Bincode,
            _ => SaveFormat::Json,
        }
    }
}

/// Write a tree, creating parent directories as needed.
pub fn save_tree(tree: &DocumentTree, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| OutlineError::io(parent, e))?;
        }
    }

    let data = match SaveFormat::from_path(path) {
        SaveFormat::Json => tree
            .to_json()
            .map_err(|e| OutlineError::Serialization(e.to_string()))?
            .into_bytes(),
        SaveFormat::Bincode => bincode::encode_to_vec(tree, bincode::config::standard())
            .map_err(|e| OutlineError::Serialization(e.to_string()))?,
    };

    fs::write(path, &data).map_err(|e| OutlineError::io(path, e))?;
    tracing::debug!(path = %path.display(), bytes = data.len(), "Saved tree");
    Ok(())
}

/// Read a tree written by [`save_tree`].
pub fn load_tree(path: &Path) -> Result<DocumentTree> {
    if !path.is_file() {
        return Err(OutlineError::IndexNotFound(path.to_path_buf()));
    }

    let data = fs::read(path).map_err(|e| OutlineError::io(path, e))?;

    match SaveFormat::from_path(path) {
        SaveFormat::Json => serde_json::from_slice(&data)
            .map_err(|e| OutlineError::Serialization(e.to_string())),
        SaveFormat::Bincode => {
            let (tree, _): (DocumentTree, usize) =
                bincode::decode_from_slice(&data, bincode::config::standard())
                    .map_err(|e| OutlineError::Serialization(e.to_string()))?;
            Ok(tree)
        }
    }
}

/// Get the size of a tree file in bytes.
pub fn tree_size(path: &Path) -> Result<u64> {
    let metadata = fs::metadata(path).map_err(|e| OutlineError::io(path, e))?;
    Ok(metadata.len())
}
