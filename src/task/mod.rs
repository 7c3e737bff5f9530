//! Cross-thread vocabulary: commands mutate the collision world, queries read it and
//! leave a [`QueryResult`] behind under their task ID.

pub mod command;
pub mod query;
pub mod result;

pub use command::{
    AddShapeCommand, Command, ExitThreadCommand, FileAction, FileCommand, FileOutcome,
    ObjectToWorldCommand, RemoveAllShapesCommand, RemoveShapeCommand, ResetProfileDataCommand,
    SetDebugRenderColorCommand, SetUserFlagsCommand,
};
pub use query::{
    CollisionQuery, DebugRenderQuery, ObjectToWorldQuery, ProfileStatsQuery, Query, RayCastQuery,
    ShapeInBoundsQuery, StatsQuery,
};
pub use result::{
    BoolResult, CollisionQueryResult, DebugRenderResult, ObjectToWorldResult, QueryResult,
    RayCastResult, StatsResult, StringResult,
};

use crate::error::Result;
use crate::thread::Worker;
use std::fmt;

/// Handle identifying a submitted task. Issued in increasing order, starting at 1.
pub type TaskId = u32;

pub enum TaskKind {
    Command(Box<dyn Command>),
    Query(Box<dyn Query>),
}

/// A unit of work executed exactly once on the collision worker.
pub struct Task {
    id: TaskId,
    kind: TaskKind,
}

impl Task {
    pub fn command(id: TaskId, command: Box<dyn Command>) -> Self {
        Self {
            id,
            kind: TaskKind::Command(command),
        }
    }

    pub fn query(id: TaskId, query: Box<dyn Query>) -> Self {
        Self {
            id,
            kind: TaskKind::Query(query),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        match &self.kind {
            TaskKind::Command(command) => command.name(),
            TaskKind::Query(query) => query.name(),
        }
    }

    /// Runs the task. A query's result is stored on the worker under this task's ID.
    pub fn execute(self, worker: &mut Worker) -> Result<()> {
        match self.kind {
            TaskKind::Command(command) => command.execute(worker),
            TaskKind::Query(query) => {
                let result = query.execute_query(worker)?;
                worker.store_result(self.id, result);
                Ok(())
            }
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("name", &self.name())
            .finish()
    }
}
