use std::collections::HashMap;

use super::operation::{Backend, CompositeOperation, HubError};

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Where an operation is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Forwarded to the owning backend.
    Backend(Backend),
    /// Run by the orchestration engine inside the hub.
    Local(CompositeOperation),
}

// ---------------------------------------------------------------------------
// OperationRegistry
// ---------------------------------------------------------------------------

/// Immutable operation-name routing table.
///
/// Built once at startup and shared by reference; there is no way to add or
/// remove entries after construction.
#[derive(Debug, Clone)]
pub struct OperationRegistry {
    table: HashMap<&'static str, Resolution>,
}

impl OperationRegistry {
    /// The routing table every backend deployment agrees on.
    #[must_use]
    pub fn standard() -> Self {
        let mut table = HashMap::new();
        for backend in Backend::ALL {
            for operation in backend.operations() {
                table.insert(*operation, Resolution::Backend(backend));
            }
        }
        for composite in CompositeOperation::ALL {
            table.insert(composite.name(), Resolution::Local(composite));
        }
        Self { table }
    }

    /// Looks up the handler of `operation`.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::UnsupportedOperation`] for names absent from the table.
    pub fn resolve(&self, operation: &str) -> Result<Resolution, HubError> {
        self.table
            .get(operation)
            .copied()
            .ok_or_else(|| HubError::UnsupportedOperation {
                operation: operation.to_string(),
            })
    }

    /// Operations forwarded to `backend`, sorted by name.
    #[must_use]
    pub fn operations_for(&self, backend: Backend) -> Vec<&'static str> {
        let mut ops: Vec<_> = self
            .table
            .iter()
            .filter(|(_, resolution)| **resolution == Resolution::Backend(backend))
            .map(|(name, _)| *name)
            .collect();
        ops.sort_unstable();
        ops
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
