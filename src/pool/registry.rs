// src/pool/registry.rs

use std::collections::HashMap;
use std::thread::{self, ThreadId};

use parking_lot::RwLock;

use crate::scheduler::hooks::EXTERNAL_THREAD_INDEX;

/// Maps OS thread ids to the small indices reported to hooks.
///
/// Written once per thread at startup, read on every task execution.
#[derive(Debug, Default)]
pub(crate) struct ThreadRegistry {
    indices: RwLock<HashMap<ThreadId, usize>>,
}

impl ThreadRegistry {
    pub(crate) fn register(&self, id: ThreadId, index: usize) {
        self.indices.write().insert(id, index);
    }

    pub(crate) fn unregister(&self, id: ThreadId) {
        self.indices.write().remove(&id);
    }

    pub(crate) fn index_of(&self, id: ThreadId) -> usize {
        self.indices
            .read()
            .get(&id)
            .copied()
            .unwrap_or(EXTERNAL_THREAD_INDEX)
    }

    pub(crate) fn current(&self) -> usize {
        self.index_of(thread::current().id())
    }
}
