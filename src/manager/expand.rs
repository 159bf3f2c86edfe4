//! Directory expansion: a container source becomes one job per leaf,
//! mirrored under the destination root.

use std::sync::Arc;

use crate::error::Error;
use crate::vfs::{FileAccess, FileHandle};

/// Expand a resolved `(source, destination)` into concrete per-leaf pairs.
///
/// The given destination is treated as a container root (a destination that
/// resolves to an existing leaf contributes its parent instead). A single
/// source maps to `root/<base name>`; a container source maps every
/// non-container leaf beneath it to the same path relative to the container,
/// under the root. Intermediate destination paths are created here, so the
/// copy loop can open its append writer directly.
pub(super) fn expand(
    access: &FileAccess,
    source: &Arc<dyn FileHandle>,
    destination: &Arc<dyn FileHandle>,
) -> Result<Vec<(Arc<dyn FileHandle>, Arc<dyn FileHandle>)>, Error> {
    let root = destination_root(destination)?;
    root.create_container()
        .map_err(|e| Error::resolution(root.uri(), e))?;

    if !source
        .is_container()
        .map_err(|e| Error::resolution(source.uri(), e))?
    {
        let leaf_destination = access.resolve(&format!("{}/{}", root.uri(), source.name()))?;
        return Ok(vec![(Arc::clone(source), leaf_destination)]);
    }

    let mut pairs = Vec::new();
    for leaf in collect_leaves(source)? {
        let Some(relative) = leaf.uri().strip_prefix(source.uri()) else {
            tracing::warn!(
                "leaf {} is not under container {}, skipping",
                leaf.uri(),
                source.uri()
            );
            continue;
        };
        let leaf_destination = access.resolve(&format!("{}{}", root.uri(), relative))?;
        if let Some(parent) = leaf_destination.parent() {
            parent
                .create_container()
                .map_err(|e| Error::resolution(parent.uri(), e))?;
        }
        pairs.push((leaf, leaf_destination));
    }
    Ok(pairs)
}

/// Every non-container leaf beneath `container`, depth first.
fn collect_leaves(container: &Arc<dyn FileHandle>) -> Result<Vec<Arc<dyn FileHandle>>, Error> {
    let mut leaves = Vec::new();
    let children = container
        .children()
        .map_err(|e| Error::resolution(container.uri(), e))?;
    for child in children {
        if child
            .is_container()
            .map_err(|e| Error::resolution(child.uri(), e))?
        {
            leaves.extend(collect_leaves(&child)?);
        } else {
            leaves.push(child);
        }
    }
    Ok(leaves)
}

fn destination_root(
    destination: &Arc<dyn FileHandle>,
) -> Result<Arc<dyn FileHandle>, Error> {
    let exists = destination
        .exists()
        .map_err(|e| Error::resolution(destination.uri(), e))?;
    if exists
        && !destination
            .is_container()
            .map_err(|e| Error::resolution(destination.uri(), e))?
    {
        if let Some(parent) = destination.parent() {
            return Ok(parent);
        }
    }
    Ok(Arc::clone(destination))
}
