//! Scheduler runner -- owns the worker pool and dispatches tasks.
//!
//! Split into focused submodules:
//! - `core`: Scheduler struct, constructor, accessors, report and shutdown
//! - `execution`: task dispatch and the batch barrier

mod core;
mod execution;
#[cfg(test)]
mod tests;

pub use self::core::Scheduler;
