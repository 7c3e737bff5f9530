use crate::collision::shapes::{Shape, ShapeId};
use crate::collision::AddFlags;
use crate::error::Result;
use crate::geometry::Transform;
use crate::thread::Worker;
use glam::DVec3;
use log::info;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

/// A task that changes collision world state and produces no result.
pub trait Command: Send {
    fn name(&self) -> &'static str;

    fn execute(self: Box<Self>, worker: &mut Worker) -> Result<()>;
}

/// Stops the worker loop once it has run.
#[derive(Debug, Default)]
pub struct ExitThreadCommand;

impl Command for ExitThreadCommand {
    fn name(&self) -> &'static str {
        "ExitThreadCommand"
    }

    fn execute(self: Box<Self>, worker: &mut Worker) -> Result<()> {
        worker.signal_exit();
        Ok(())
    }
}

/// Hands a shape over to the worker's tree.
#[derive(Debug)]
pub struct AddShapeCommand {
    pub shape: Shape,
    pub flags: AddFlags,
}

impl AddShapeCommand {
    pub fn new(shape: Shape, flags: AddFlags) -> Self {
        Self { shape, flags }
    }
}

impl Command for AddShapeCommand {
    fn name(&self) -> &'static str {
        "AddShapeCommand"
    }

    fn execute(self: Box<Self>, worker: &mut Worker) -> Result<()> {
        worker.add_shape(self.shape, self.flags).map(|_| ())
    }
}

#[derive(Debug)]
pub struct RemoveShapeCommand {
    pub shape_id: ShapeId,
}

impl RemoveShapeCommand {
    pub fn new(shape_id: ShapeId) -> Self {
        Self { shape_id }
    }
}

impl Command for RemoveShapeCommand {
    fn name(&self) -> &'static str {
        "RemoveShapeCommand"
    }

    fn execute(self: Box<Self>, worker: &mut Worker) -> Result<()> {
        worker.remove_shape(self.shape_id).map(|_| ())
    }
}

#[derive(Debug, Default)]
pub struct RemoveAllShapesCommand;

impl Command for RemoveAllShapesCommand {
    fn name(&self) -> &'static str {
        "RemoveAllShapesCommand"
    }

    fn execute(self: Box<Self>, worker: &mut Worker) -> Result<()> {
        worker.clear_shapes();
        Ok(())
    }
}

#[derive(Debug)]
pub struct SetDebugRenderColorCommand {
    pub shape_id: ShapeId,
    pub color: DVec3,
}

impl SetDebugRenderColorCommand {
    pub fn new(shape_id: ShapeId, color: DVec3) -> Self {
        Self { shape_id, color }
    }
}

impl Command for SetDebugRenderColorCommand {
    fn name(&self) -> &'static str {
        "SetDebugRenderColorCommand"
    }

    fn execute(self: Box<Self>, worker: &mut Worker) -> Result<()> {
        worker.tree_mut().set_debug_color(self.shape_id, self.color)
    }
}

/// Replaces the user flags that ray-cast and collision masks are tested against.
#[derive(Debug)]
pub struct SetUserFlagsCommand {
    pub shape_id: ShapeId,
    pub user_flags: u64,
}

impl SetUserFlagsCommand {
    pub fn new(shape_id: ShapeId, user_flags: u64) -> Self {
        Self {
            shape_id,
            user_flags,
        }
    }
}

impl Command for SetUserFlagsCommand {
    fn name(&self) -> &'static str {
        "SetUserFlagsCommand"
    }

    fn execute(self: Box<Self>, worker: &mut Worker) -> Result<()> {
        worker.tree_mut().set_user_flags(self.shape_id, self.user_flags)
    }
}

/// Moves a shape and re-inserts it into the tree.
#[derive(Debug)]
pub struct ObjectToWorldCommand {
    pub shape_id: ShapeId,
    pub object_to_world: Transform,
}

impl ObjectToWorldCommand {
    pub fn new(shape_id: ShapeId, object_to_world: Transform) -> Self {
        Self {
            shape_id,
            object_to_world,
        }
    }
}

impl Command for ObjectToWorldCommand {
    fn name(&self) -> &'static str {
        "ObjectToWorldCommand"
    }

    fn execute(self: Box<Self>, worker: &mut Worker) -> Result<()> {
        worker
            .tree_mut()
            .set_object_to_world(self.shape_id, self.object_to_world)
    }
}

#[derive(Debug, Default)]
pub struct ResetProfileDataCommand;

impl Command for ResetProfileDataCommand {
    fn name(&self) -> &'static str {
        "ResetProfileDataCommand"
    }

    fn execute(self: Box<Self>, worker: &mut Worker) -> Result<()> {
        worker.profile_mut().reset();
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    Dump,
    Restore,
}

/// Slot a [`FileCommand`] fills with its outcome once it has run.
pub type FileOutcome = Arc<Mutex<Option<Result<usize>>>>;

/// Writes every shape to, or replaces every shape from, a debug snapshot file.
///
/// Dumping never overwrites an existing file; restoring requires the file to exist.
#[derive(Debug)]
pub struct FileCommand {
    pub action: FileAction,
    pub path: PathBuf,
    outcome: Option<FileOutcome>,
}

impl FileCommand {
    pub fn new(action: FileAction, path: impl Into<PathBuf>) -> Self {
        Self {
            action,
            path: path.into(),
            outcome: None,
        }
    }

    /// Also deliver the outcome (shape count or error) through `outcome`.
    pub fn with_outcome(mut self, outcome: FileOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }
}

impl Command for FileCommand {
    fn name(&self) -> &'static str {
        "FileCommand"
    }

    fn execute(self: Box<Self>, worker: &mut Worker) -> Result<()> {
        let result = match self.action {
            FileAction::Dump => worker.dump_to_file(&self.path),
            FileAction::Restore => worker.restore_from_file(&self.path),
        };
        if let Ok(count) = &result {
            info!("{:?} of {count} shapes via {}", self.action, self.path.display());
        }

        match self.outcome {
            Some(slot) => {
                if let Err(err) = &result {
                    worker.report_error(err);
                }
                *slot.lock() = Some(result);
                Ok(())
            }
            None => result.map(|_| ()),
        }
    }
}
