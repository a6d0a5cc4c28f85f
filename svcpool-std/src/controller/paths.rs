//! Path registry: string path → implementation.

use std::collections::HashMap;
use svcpool_core::ImplementationId;

/// Thin map from registration paths to implementations.
///
/// Later registrations of a path replace earlier ones.
#[derive(Debug, Default)]
pub(crate) struct PathRegistry {
    paths: HashMap<String, ImplementationId>,
}

impl PathRegistry {
    pub(crate) fn insert(&mut self, path: impl Into<String>, implementation: ImplementationId) {
        self.paths.insert(path.into(), implementation);
    }

    pub(crate) fn get(&self, path: &str) -> Option<ImplementationId> {
        self.paths.get(path).copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.paths.len()
    }
}
