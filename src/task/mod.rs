// src/task/mod.rs

//! Task storage.
//!
//! - [`handle`] defines the generation-checked [`Handle`].
//! - [`record`] holds the per-task state (closure, completion counter,
//!   parent link).
//! - [`table`] owns every record and validates handles.
//! - [`closure`] normalises task bodies and isolates their failures.

pub mod closure;
pub mod handle;
pub(crate) mod record;
pub(crate) mod table;

pub use closure::TaskOutput;
pub use handle::Handle;
pub(crate) use record::TaskRecord;
pub(crate) use table::TaskTable;
