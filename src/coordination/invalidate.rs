//! Downstream invalidation ("culling")
//!
//! When an upstream artifact is revised, everything generated from it may now
//! be stale. The operator decides whether to keep those artifacts or cull
//! them; this module finds and removes them.

use std::sync::Arc;

use log::info;

use crate::content::ContentStore;
use crate::domain::ArtifactKind;
use crate::error::Result;

/// Finds and removes artifacts downstream of a revised kind
pub struct Invalidator {
    store: Arc<dyn ContentStore>,
}

impl Invalidator {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Kinds strictly downstream of `kind` that currently exist, in pipeline order
    pub fn existing_downstream(&self, kind: ArtifactKind) -> Vec<ArtifactKind> {
        kind.downstream()
            .into_iter()
            .filter(|k| self.store.exists(*k))
            .collect()
    }

    /// Delete the kinds in `present` that are strictly downstream of `kind`.
    ///
    /// Never touches `kind` itself or anything upstream of it, whatever
    /// `present` contains. Returns the kinds actually deleted.
    pub fn cull(&self, kind: ArtifactKind, present: &[ArtifactKind]) -> Result<Vec<ArtifactKind>> {
        let mut culled = Vec::new();

        for target in present.iter().copied().filter(|k| k.is_downstream_of(kind)) {
            self.store.delete(target)?;
            info!("Culled {} (stale after {} iteration)", target, kind);
            culled.push(target);
        }

        Ok(culled)
    }
}
