//! Local-execution mode: recipe inference runs in-process on a bounded
//! worker pool, tracked by a [`registry::TaskRegistry`].

pub mod pool;
pub mod registry;
pub mod store;

pub use pool::WorkerPool;
pub use registry::{TaskPoll, TaskRegistry};
pub use store::InMemoryTaskStore;
