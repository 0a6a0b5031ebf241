// src/task/handle.rs

//! Generation-checked task handles.

use std::fmt;

/// Opaque reference to a task slot in a [`TaskTable`](super::TaskTable).
///
/// A handle is the only way to name a task. It stays valid until the slot it
/// points to is reissued to a new task; after that every lookup through the
/// old handle fails with [`StaleHandle`](crate::errors::SchedulerError::StaleHandle)
/// instead of aliasing the new task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    table: u32,
    index: u32,
    generation: u32,
}

impl Handle {
    pub(crate) fn new(table: u32, index: u32, generation: u32) -> Self {
        Self {
            table,
            index,
            generation,
        }
    }

    /// Slot index inside the issuing table.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Generation of the slot at the time this handle was issued.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub(crate) fn table_id(&self) -> u32 {
        self.table
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}
