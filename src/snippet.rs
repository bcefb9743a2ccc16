//! Snippet generator seam.
//!
//! Rendering documentation files is left to external generators. Anything that
//! implements [`Snippet`], including a plain closure, receives each documented
//! [`Operation`].

use crate::types::Operation;
use parking_lot::Mutex;
use std::sync::Arc;

/// Receives every documented operation.
pub trait Snippet: Send + Sync {
    /// Render `operation`; errors fail the exchange
    fn document(&self, operation: &Operation) -> anyhow::Result<()>;
}

impl<F> Snippet for F
where
    F: Fn(&Operation) -> anyhow::Result<()> + Send + Sync,
{
    fn document(&self, operation: &Operation) -> anyhow::Result<()> {
        self(operation)
    }
}

/// Snippet that keeps every operation it receives.
///
/// Clones share the same record.
///
/// ```
/// use restdocs_http::snippet::OperationRecorder;
///
/// let recorder = OperationRecorder::new();
/// assert!(recorder.last().is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct OperationRecorder {
    operations: Arc<Mutex<Vec<Operation>>>,
}

impl OperationRecorder {
    /// Empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies of every recorded operation, oldest first
    pub fn operations(&self) -> Vec<Operation> {
        self.operations.lock().clone()
    }

    /// Most recent operation
    pub fn last(&self) -> Option<Operation> {
        self.operations.lock().last().cloned()
    }

    /// Number of recorded operations
    pub fn len(&self) -> usize {
        self.operations.lock().len()
    }

    /// Whether nothing was recorded yet
    pub fn is_empty(&self) -> bool {
        self.operations.lock().is_empty()
    }
}

impl Snippet for OperationRecorder {
    fn document(&self, operation: &Operation) -> anyhow::Result<()> {
        self.operations.lock().push(operation.clone());
        Ok(())
    }
}
