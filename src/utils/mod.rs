//! Utility helpers: the generational arena, binary dump encoding, logging, profiling and
//! the worker semaphore.

pub mod arena;
pub mod binary;
pub mod logging;
pub mod profiling;
pub mod semaphore;

pub use arena::{Arena, ArenaId};
pub use profiling::{ProfileBlock, ProfileData};
pub use semaphore::Semaphore;
