//! The collision worker: one dedicated thread that owns the tree, the pair cache and the
//! profile data, fed through a FIFO task queue.

use crate::collision::cache::{CollisionCache, ShapePairCollisionStatus};
use crate::collision::shapes::{Shape, ShapeId, ShapeKind};
use crate::collision::tree::BoundingBoxTree;
use crate::collision::{AddFlags, DrawFlags};
use crate::config::CollisionConfig;
use crate::context::EngineContext;
use crate::error::{CollisionError, Result};
use crate::geometry::DebugLine;
use crate::task::{Command, ExitThreadCommand, Query, QueryResult, Task, TaskId};
use crate::utils::binary::{read_u32, write_u32};
use crate::utils::logging::{warn_if_task_budget_exceeded, ScopedTimer};
use crate::utils::profiling::ProfileData;
use crate::utils::semaphore::Semaphore;
use glam::DVec3;
use log::{debug, info, warn};
use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

#[derive(Debug, Default)]
struct TaskQueue {
    tasks: VecDeque<Task>,
    /// Queued plus executing tasks.
    outstanding: usize,
}

#[derive(Debug, Default)]
struct Shared {
    queue: Mutex<TaskQueue>,
    tasks_available: Semaphore,
    all_done: Condvar,
    results: Mutex<HashMap<TaskId, QueryResult>>,
}

impl Shared {
    fn finish_task(&self) {
        let mut queue = self.queue.lock();
        queue.outstanding = queue.outstanding.saturating_sub(1);
        if queue.outstanding == 0 {
            self.all_done.notify_all();
        }
    }
}

/// State owned by the worker thread. Tasks receive it mutably while they execute.
pub struct Worker {
    tree: BoundingBoxTree,
    cache: CollisionCache,
    profile: ProfileData,
    context: Arc<EngineContext>,
    shared: Arc<Shared>,
    config: CollisionConfig,
    signaled_to_exit: bool,
}

impl Worker {
    fn new(config: CollisionConfig, context: Arc<EngineContext>, shared: Arc<Shared>) -> Self {
        let tree = BoundingBoxTree::new(config.world_extents, Arc::clone(context.shape_ids()))
            .with_min_node_volume(config.min_node_volume);
        Self {
            tree,
            cache: CollisionCache::new(),
            profile: ProfileData::default(),
            context,
            shared,
            config,
            signaled_to_exit: false,
        }
    }

    pub fn tree(&self) -> &BoundingBoxTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut BoundingBoxTree {
        &mut self.tree
    }

    pub fn cache(&self) -> &CollisionCache {
        &self.cache
    }

    pub fn profile(&self) -> &ProfileData {
        &self.profile
    }

    pub fn profile_mut(&mut self) -> &mut ProfileData {
        &mut self.profile
    }

    /// Stops the loop after the current task.
    pub fn signal_exit(&mut self) {
        self.signaled_to_exit = true;
    }

    pub fn add_shape(&mut self, shape: Shape, flags: AddFlags) -> Result<ShapeId> {
        self.tree.insert(shape, flags)
    }

    pub fn remove_shape(&mut self, shape_id: ShapeId) -> Result<Shape> {
        let shape = self.tree.remove(shape_id)?;
        self.cache.forget_shape(shape_id);
        Ok(shape)
    }

    pub fn clear_shapes(&mut self) {
        self.tree.clear();
        self.cache.clear();
    }

    pub fn find_shape(&self, shape_id: ShapeId) -> Option<&Shape> {
        self.tree.find_shape(shape_id)
    }

    pub fn store_result(&self, task_id: TaskId, result: QueryResult) {
        self.shared.results.lock().insert(task_id, result);
    }

    pub fn report_error(&self, err: &CollisionError) {
        self.context.errors().report(err);
    }

    pub fn calculate_collision(
        &mut self,
        shape_id: ShapeId,
        user_flags_mask: u64,
    ) -> Result<Vec<ShapePairCollisionStatus>> {
        let errors = self.context.errors();
        self.tree
            .calculate_collision(shape_id, user_flags_mask, &mut self.cache, |err| {
                errors.report(&err)
            })
    }

    /// Debug lines for the requested layers. Shape boxes use the inverse of each shape's
    /// color; tree nodes are white.
    pub fn debug_visualize(&self, draw_flags: DrawFlags) -> Vec<DebugLine> {
        let mut lines = Vec::new();
        for shape in self.tree.sorted_shapes() {
            if draw_flags.contains(DrawFlags::SHAPES) {
                shape.debug_render(&mut lines);
            }
            if draw_flags.contains(DrawFlags::SHAPE_BOXES) {
                shape
                    .bounding_box()
                    .debug_lines(DVec3::ONE - shape.debug_color(), &mut lines);
            }
        }
        if draw_flags.contains(DrawFlags::AABB_TREE) {
            self.tree.debug_render(DVec3::ONE, &mut lines);
        }
        lines
    }

    /// Writes the shape count, then each shape's type ID and blob in ID order.
    pub fn dump_shapes<W: Write + ?Sized>(&self, writer: &mut W) -> Result<usize> {
        let _timer = ScopedTimer::new("dump shapes");
        let shapes = self.tree.sorted_shapes();
        let count = u32::try_from(shapes.len())
            .map_err(|_| CollisionError::MalformedDump("too many shapes".to_owned()))?;
        write_u32(writer, count)?;
        for shape in &shapes {
            write_u32(writer, shape.kind().type_id())?;
            shape.dump(writer)?;
        }
        Ok(shapes.len())
    }

    /// Replaces every shape with those read from `reader`. Restored shapes get fresh IDs.
    ///
    /// The tree is left untouched when the dump cannot be parsed.
    pub fn restore_shapes<R: Read + ?Sized>(&mut self, reader: &mut R) -> Result<usize> {
        let _timer = ScopedTimer::new("restore shapes");
        let shapes = read_shapes(reader).map_err(|err| match err {
            CollisionError::Io(io) if io.kind() == io::ErrorKind::UnexpectedEof => {
                CollisionError::MalformedDump("unexpected end of dump".to_owned())
            }
            other => other,
        })?;

        self.clear_shapes();
        let mut restored = 0;
        for shape in shapes {
            match self.tree.insert(shape, AddFlags::empty()) {
                Ok(_) => restored += 1,
                Err(err) => self.report_error(&err),
            }
        }
        Ok(restored)
    }

    pub fn dump_to_file(&self, path: &Path) -> Result<usize> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|err| match err.kind() {
                io::ErrorKind::AlreadyExists => CollisionError::FileExists(path.to_path_buf()),
                _ => CollisionError::Io(err),
            })?;
        let mut writer = BufWriter::new(file);
        let count = self.dump_shapes(&mut writer)?;
        writer.flush()?;
        Ok(count)
    }

    pub fn restore_from_file(&mut self, path: &Path) -> Result<usize> {
        if !path.is_file() {
            return Err(CollisionError::FileNotFound(path.to_path_buf()));
        }
        let mut reader = BufReader::new(File::open(path)?);
        self.restore_shapes(&mut reader)
    }

    fn run(mut self) {
        info!("collision worker started");
        while !self.signaled_to_exit {
            self.shared.tasks_available.acquire();
            let Some(task) = self.shared.queue.lock().tasks.pop_front() else {
                continue;
            };

            let name = task.name();
            let task_id = task.id();
            let start = Instant::now();
            let outcome = catch_unwind(AssertUnwindSafe(|| task.execute(&mut self)));
            let elapsed = start.elapsed();

            self.profile.accumulate(name, elapsed);
            warn_if_task_budget_exceeded(name, elapsed, self.config.task_budget_ms);

            match outcome {
                Ok(Ok(())) => debug!("task {task_id} ({name}) completed"),
                Ok(Err(err)) => self.report_error(&err),
                Err(panic) => {
                    self.report_error(&CollisionError::TaskPanicked(panic_message(&*panic, name)))
                }
            }
            self.shared.finish_task();
        }

        self.clear_shapes();
        info!("collision worker exited");
    }
}

fn read_shapes<R: Read + ?Sized>(reader: &mut R) -> Result<Vec<Shape>> {
    let count = read_u32(reader)?;
    let mut shapes = Vec::new();
    for _ in 0..count {
        let type_id = read_u32(reader)?;
        let kind = ShapeKind::from_type_id(type_id)
            .ok_or(CollisionError::UnknownShapeType(type_id))?;
        let mut shape = Shape::create(kind);
        shape.restore(reader)?;
        shapes.push(shape);
    }
    Ok(shapes)
}

fn panic_message(panic: &(dyn Any + Send), task_name: &str) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_owned());
    format!("{task_name}: {detail}")
}

/// Owner of the worker thread and the caller side of its queue.
pub struct CollisionThread {
    config: CollisionConfig,
    context: Arc<EngineContext>,
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl CollisionThread {
    pub fn new(config: CollisionConfig, context: Arc<EngineContext>) -> Self {
        Self {
            config,
            context,
            shared: Arc::new(Shared::default()),
            handle: None,
        }
    }

    pub fn config(&self) -> &CollisionConfig {
        &self.config
    }

    pub fn startup(&mut self) -> Result<()> {
        if self.handle.is_some() {
            return Err(CollisionError::AlreadyRunning);
        }
        let worker = Worker::new(
            self.config.clone(),
            Arc::clone(&self.context),
            Arc::clone(&self.shared),
        );
        let handle = std::thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || worker.run())
            .map_err(|err| CollisionError::ThreadSpawn(err.to_string()))?;
        self.handle = Some(handle);
        Ok(())
    }

    /// Queues an exit, waits for the worker to finish and drops anything left behind.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.handle.is_none() {
            return Ok(());
        }
        self.send_command(Box::new(ExitThreadCommand))?;
        let joined = self.handle.take().map(JoinHandle::join);

        {
            let mut queue = self.shared.queue.lock();
            if !queue.tasks.is_empty() {
                warn!("dropping {} tasks queued after exit", queue.tasks.len());
            }
            queue.tasks.clear();
            queue.outstanding = 0;
            self.shared.all_done.notify_all();
        }
        self.shared.results.lock().clear();
        self.shared.tasks_available.reset();

        match joined {
            Some(Err(_)) => Err(CollisionError::TaskPanicked(
                "collision worker thread".to_owned(),
            )),
            _ => Ok(()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn send_command(&self, command: Box<dyn Command>) -> Result<TaskId> {
        let id = self.context.allocate_task_id();
        self.send_task(Task::command(id, command))
    }

    pub fn send_query(&self, query: Box<dyn Query>) -> Result<TaskId> {
        let id = self.context.allocate_task_id();
        self.send_task(Task::query(id, query))
    }

    /// Appends the task to the queue. Never blocks on the worker.
    pub fn send_task(&self, task: Task) -> Result<TaskId> {
        if !self.is_running() {
            return Err(CollisionError::NotRunning);
        }
        let id = task.id();
        {
            let mut queue = self.shared.queue.lock();
            queue.tasks.push_back(task);
            queue.outstanding += 1;
        }
        self.shared.tasks_available.release();
        Ok(id)
    }

    /// Takes the result of a finished query, or `None` while it is still pending.
    pub fn receive_result(&self, task_id: TaskId) -> Option<QueryResult> {
        self.shared.results.lock().remove(&task_id)
    }

    /// Blocks until every submitted task has executed.
    pub fn wait_for_all_tasks_to_complete(&self) {
        let mut queue = self.shared.queue.lock();
        while queue.outstanding > 0 && self.is_running() {
            self.shared.all_done.wait(&mut queue);
        }
    }
}

impl Drop for CollisionThread {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            self.context.errors().report(&err);
        }
    }
}
