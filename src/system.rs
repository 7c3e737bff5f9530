//! Public façade over the collision worker.

use crate::collision::shapes::{Shape, ShapeId};
use crate::collision::AddFlags;
use crate::config::CollisionConfig;
use crate::context::EngineContext;
use crate::error::{CollisionError, Result};
use crate::geometry::Aabb;
use crate::task::{
    AddShapeCommand, Command, FileAction, FileCommand, FileOutcome, Query, QueryResult,
    RemoveAllShapesCommand, RemoveShapeCommand, TaskId,
};
use crate::thread::CollisionThread;
use log::info;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

/// Entry point for engine code: submits commands and queries to the collision worker and
/// hands back query results once they are ready.
///
/// ```no_run
/// use collision_system::{CollisionSystem, Shape, StatsQuery, DVec3};
///
/// let mut system = CollisionSystem::new();
/// system.initialize(None)?;
/// system.add_shape(Shape::sphere(DVec3::ZERO, 1.0), Default::default())?;
/// let query = system.make_query(StatsQuery)?;
/// system.flush_all_tasks();
/// let stats = system.obtain_query_result(query);
/// assert!(stats.is_some());
/// # Ok::<(), collision_system::CollisionError>(())
/// ```
pub struct CollisionSystem {
    context: Arc<EngineContext>,
    thread: CollisionThread,
}

impl Default for CollisionSystem {
    fn default() -> Self {
        Self::with_config(CollisionConfig::default())
    }
}

impl CollisionSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CollisionConfig) -> Self {
        let context = Arc::new(EngineContext::new());
        Self {
            thread: CollisionThread::new(config, Arc::clone(&context)),
            context,
        }
    }

    pub fn config(&self) -> &CollisionConfig {
        self.thread.config()
    }

    pub fn context(&self) -> &Arc<EngineContext> {
        &self.context
    }

    /// Starts the worker. `world_extents` overrides the configured extents.
    pub fn initialize(&mut self, world_extents: Option<Aabb>) -> Result<()> {
        if self.thread.is_running() {
            return Err(CollisionError::AlreadyRunning);
        }
        if let Some(world_extents) = world_extents {
            let mut config = self.thread.config().clone();
            config.world_extents = world_extents;
            self.thread = CollisionThread::new(config, Arc::clone(&self.context));
        }
        self.thread.startup()?;
        info!(
            "collision system initialized with world extents {:?}",
            self.config().world_extents
        );
        Ok(())
    }

    /// Stops the worker, dropping all shapes and any uncollected results.
    pub fn shutdown(&mut self) -> Result<()> {
        self.thread.shutdown()
    }

    pub fn is_running(&self) -> bool {
        self.thread.is_running()
    }

    /// Queues the shape for insertion and returns its ID, assigning one if it has none.
    pub fn add_shape(&self, mut shape: Shape, flags: AddFlags) -> Result<ShapeId> {
        if !self.is_running() {
            return Err(CollisionError::NotRunning);
        }
        if shape.id().is_null() {
            shape.set_id(self.context.shape_ids().allocate());
        }
        let id = shape.id();
        self.thread
            .send_command(Box::new(AddShapeCommand::new(shape, flags)))?;
        Ok(id)
    }

    pub fn remove_shape(&self, shape_id: ShapeId) -> Result<TaskId> {
        self.thread
            .send_command(Box::new(RemoveShapeCommand::new(shape_id)))
    }

    pub fn clear(&self) -> Result<TaskId> {
        self.thread.send_command(Box::new(RemoveAllShapesCommand))
    }

    pub fn issue_command<C: Command + 'static>(&self, command: C) -> Result<TaskId> {
        self.thread.send_command(Box::new(command))
    }

    pub fn make_query<Q: Query + 'static>(&self, query: Q) -> Result<TaskId> {
        self.thread.send_query(Box::new(query))
    }

    /// The query's result once it has executed, otherwise `None`. A result can be taken
    /// only once.
    pub fn obtain_query_result(&self, task_id: TaskId) -> Option<QueryResult> {
        self.thread.receive_result(task_id)
    }

    /// Blocks until every task submitted so far has executed.
    pub fn flush_all_tasks(&self) {
        self.thread.wait_for_all_tasks_to_complete();
    }

    /// Writes every shape to a new file at `path` and returns how many were written.
    pub fn dump_to_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        self.run_file_command(FileAction::Dump, path.as_ref())
    }

    /// Replaces every shape with those in the dump at `path`.
    pub fn restore_from_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        self.run_file_command(FileAction::Restore, path.as_ref())
    }

    /// Drains the errors reported by the worker so far.
    pub fn take_errors(&self) -> Vec<String> {
        self.context.errors().take()
    }

    fn run_file_command(&self, action: FileAction, path: &Path) -> Result<usize> {
        let outcome: FileOutcome = Arc::new(Mutex::new(None));
        let command = FileCommand::new(action, path).with_outcome(Arc::clone(&outcome));
        self.thread.send_command(Box::new(command))?;
        self.flush_all_tasks();

        let result = outcome.lock().take();
        result.unwrap_or(Err(CollisionError::NotRunning))
    }
}
