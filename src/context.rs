//! Engine-wide state shared between a system façade and its worker.

use crate::collision::shapes::ShapeIdAllocator;
use crate::error::CollisionError;
use crate::task::TaskId;
use log::error;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Collects failures from the worker so callers can inspect them later.
#[derive(Debug, Default)]
pub struct ErrorReport {
    messages: Mutex<Vec<String>>,
}

impl ErrorReport {
    /// Logs the error and keeps its message.
    pub fn report(&self, err: &CollisionError) {
        error!("{err}");
        self.messages.lock().push(err.to_string());
    }

    /// Removes and returns every message reported so far.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.messages.lock())
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }
}

/// ID counters and the error report for one collision system instance.
#[derive(Debug)]
pub struct EngineContext {
    shape_ids: Arc<ShapeIdAllocator>,
    next_task_id: AtomicU32,
    errors: ErrorReport,
}

impl Default for EngineContext {
    fn default() -> Self {
        Self {
            shape_ids: Arc::new(ShapeIdAllocator::default()),
            next_task_id: AtomicU32::new(1),
            errors: ErrorReport::default(),
        }
    }
}

impl EngineContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shape_ids(&self) -> &Arc<ShapeIdAllocator> {
        &self.shape_ids
    }

    pub fn allocate_task_id(&self) -> TaskId {
        self.next_task_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn errors(&self) -> &ErrorReport {
        &self.errors
    }
}
