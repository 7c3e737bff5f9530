use crate::collision::shapes::{ShapeId, ShapeKind};
use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced by the collision system.
#[derive(Debug, Error)]
pub enum CollisionError {
    #[error("the collision thread is not running")]
    NotRunning,
    #[error("the collision thread is already running")]
    AlreadyRunning,
    #[error("failed to spawn the collision thread: {0}")]
    ThreadSpawn(String),
    #[error("no shape with ID {0} exists")]
    UnknownShape(ShapeId),
    #[error("shape {0} is already in the collision world")]
    DuplicateShape(ShapeId),
    #[error("shape {0} has invalid geometry or transform")]
    InvalidShape(ShapeId),
    #[error("no collision calculator for {0:?} against {1:?}")]
    MissingCalculator(ShapeKind, ShapeKind),
    #[error("unknown shape type ID {0}")]
    UnknownShapeType(u32),
    #[error("refusing to overwrite existing file {}", .0.display())]
    FileExists(PathBuf),
    #[error("file {} does not exist", .0.display())]
    FileNotFound(PathBuf),
    #[error("malformed dump: {0}")]
    MalformedDump(String),
    #[error("task panicked: {0}")]
    TaskPanicked(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CollisionError>;
