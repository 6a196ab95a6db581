//! Single-file cache of the fetched record tree.

use crate::core::RecordTree;
use crate::store::{StoreError, TreeSource};
use std::path::Path;

/// Return the cached tree, or fetch it once and write the cache.
///
/// An existing file that fails to decode is reported as
/// [`StoreError::CacheCorruption`] and never triggers a re-fetch.
pub fn load_or_fetch<S: TreeSource + ?Sized>(
    cache_path: &Path,
    source: &S,
) -> Result<RecordTree, StoreError> {
    if cache_path.is_file() {
        let bytes = std::fs::read(cache_path).map_err(|e| StoreError::Io {
            path: cache_path.to_path_buf(),
            source: e,
        })?;
        let tree: RecordTree =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::CacheCorruption {
                path: cache_path.to_path_buf(),
                reason: e.to_string(),
            })?;
        tracing::info!(path = %cache_path.display(), "loaded record tree from local cache");
        return Ok(tree);
    }

    tracing::info!(path = %cache_path.display(), "local copy of store not found, downloading");
    let tree = source.fetch_tree()?;
    write_cache(cache_path, &tree)?;
    Ok(tree)
}

/// Fetch the tree and replace the cache file with it.
///
/// The existing file is only overwritten after the fetch succeeds, so a
/// failed download leaves the previous copy in place.
pub fn refresh<S: TreeSource + ?Sized>(
    cache_path: &Path,
    source: &S,
) -> Result<RecordTree, StoreError> {
    tracing::info!(path = %cache_path.display(), "refreshing local copy of store");
    let tree = source.fetch_tree()?;
    write_cache(cache_path, &tree)?;
    Ok(tree)
}

fn write_cache(cache_path: &Path, tree: &RecordTree) -> Result<(), StoreError> {
    if let Some(parent) = cache_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
    }

    let bytes = serde_json::to_vec(tree).map_err(|e| StoreError::Io {
        path: cache_path.to_path_buf(),
        source: std::io::Error::other(e),
    })?;
    std::fs::write(cache_path, bytes).map_err(|e| StoreError::Io {
        path: cache_path.to_path_buf(),
        source: e,
    })
}

/// Delete the cache file. Returns whether a file was removed.
pub fn clear_cache(cache_path: &Path) -> Result<bool, StoreError> {
    if !cache_path.is_file() {
        return Ok(false);
    }
    std::fs::remove_file(cache_path).map_err(|e| StoreError::Io {
        path: cache_path.to_path_buf(),
        source: e,
    })?;
    tracing::info!(path = %cache_path.display(), "cleared cached record tree");
    Ok(true)
}
