// src/task/table.rs

//! Sharded, generation-checked storage for task records.
//!
//! Slots are spread across a fixed number of shards, each behind its own
//! mutex, so allocations from different threads rarely contend. A global
//! slot index encodes both the shard and the position inside it:
//! `index = local * shard_count + shard`.
//!
//! Recycling a slot only marks it vacant. The record stays readable through
//! its handle until the slot is reissued, at which point the generation is
//! bumped and the old handle turns stale. Free slots are reissued in FIFO
//! order so a completed handle stays queryable for as long as possible.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use anyhow::anyhow;
use parking_lot::Mutex;
use tracing::trace;

use crate::errors::{Result, SchedulerError};
use crate::task::closure::TaskFn;
use crate::task::{Handle, TaskRecord};

static NEXT_TABLE_ID: AtomicU32 = AtomicU32::new(1);

#[derive(Debug)]
struct Slot {
    generation: u32,
    vacant: bool,
    record: Option<Arc<TaskRecord>>,
}

#[derive(Debug, Default)]
struct Shard {
    slots: Vec<Slot>,
    /// Local indices of vacant slots, oldest first.
    free: VecDeque<u32>,
}

#[derive(Debug)]
pub(crate) struct TaskTable {
    id: u32,
    shards: Box<[Mutex<Shard>]>,
    next_shard: AtomicUsize,
    /// Slots holding a task that has not been recycled.
    live: AtomicUsize,
    capacity: Option<usize>,
}

impl TaskTable {
    /// `capacity` bounds the number of unrecycled tasks; `None` grows on
    /// demand.
    pub(crate) fn new(shard_count: usize, capacity: Option<usize>) -> Self {
        let shard_count = shard_count.max(1);
        let shards = (0..shard_count)
            .map(|_| Mutex::new(Shard::default()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            id: NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed),
            shards,
            next_shard: AtomicUsize::new(0),
            live: AtomicUsize::new(0),
            capacity,
        }
    }

    /// Reserve a slot (reusing the oldest vacant one in the chosen shard)
    /// and store a fresh record in it.
    ///
    /// Fails with [`SchedulerError::TaskTableFull`] when the table is
    /// bounded and every slot holds an unrecycled task.
    pub(crate) fn allocate(
        &self,
        name: String,
        closure: Option<TaskFn>,
        parent: Option<Handle>,
        released: bool,
    ) -> Result<Arc<TaskRecord>> {
        self.reserve()?;
        let allocated = self.fill_slot(name, closure, parent, released);
        if allocated.is_err() {
            self.live.fetch_sub(1, Ordering::AcqRel);
        }
        allocated
    }

    fn reserve(&self) -> Result<()> {
        match self.capacity {
            Some(capacity) => self
                .live
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| {
                    (live < capacity).then_some(live + 1)
                })
                .map(|_| ())
                .map_err(|_| SchedulerError::TaskTableFull { capacity }),
            None => {
                self.live.fetch_add(1, Ordering::AcqRel);
                Ok(())
            }
        }
    }

    fn fill_slot(
        &self,
        name: String,
        closure: Option<TaskFn>,
        parent: Option<Handle>,
        released: bool,
    ) -> Result<Arc<TaskRecord>> {
        let shard_count = self.shards.len();
        let shard_idx = self.next_shard.fetch_add(1, Ordering::Relaxed) % shard_count;
        let mut shard = self.shards[shard_idx].lock();

        let (local, generation) = match shard.free.pop_front() {
            Some(local) => {
                let slot = &mut shard.slots[local as usize];
                slot.generation += 1;
                slot.vacant = false;
                (local, slot.generation)
            }
            None => {
                let local = shard.slots.len();
                // Make sure the global index fits before growing the shard.
                global_index(local, shard_count, shard_idx)?;
                shard.slots.push(Slot {
                    generation: 0,
                    vacant: false,
                    record: None,
                });
                (local as u32, 0)
            }
        };

        let index = global_index(local as usize, shard_count, shard_idx)?;
        let handle = Handle::new(self.id, index, generation);
        let record = Arc::new(TaskRecord::new(handle, name, closure, parent, released));
        shard.slots[local as usize].record = Some(Arc::clone(&record));
        drop(shard);

        trace!(task = %record.name(), %handle, "allocated task slot");
        Ok(record)
    }

    /// Look up the record a handle was issued for.
    pub(crate) fn get(&self, handle: Handle) -> Result<Arc<TaskRecord>> {
        if handle.table_id() != self.id {
            return Err(SchedulerError::StaleHandle(handle));
        }

        let (shard_idx, local) = self.locate(handle.index());
        let shard = self.shards[shard_idx].lock();

        shard
            .slots
            .get(local)
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.record.clone())
            .ok_or(SchedulerError::StaleHandle(handle))
    }

    /// Mark a completed, released task's slot as reusable.
    ///
    /// Returns `false` if the handle is stale or the slot was already
    /// recycled. A slot whose generation is exhausted is retired instead of
    /// being put back on the free list.
    pub(crate) fn recycle(&self, handle: Handle) -> bool {
        if handle.table_id() != self.id {
            return false;
        }

        let (shard_idx, local) = self.locate(handle.index());
        let mut shard = self.shards[shard_idx].lock();

        let Some(slot) = shard.slots.get_mut(local) else {
            return false;
        };
        if slot.generation != handle.generation() || slot.vacant {
            return false;
        }

        slot.vacant = true;
        let exhausted = slot.generation == u32::MAX;
        if !exhausted {
            shard.free.push_back(local as u32);
        }
        drop(shard);

        self.live.fetch_sub(1, Ordering::AcqRel);
        trace!(%handle, exhausted, "recycled task slot");
        true
    }

    /// Number of slots currently holding a task that was not recycled yet.
    pub(crate) fn live(&self) -> usize {
        self.live.load(Ordering::Relaxed)
    }

    fn locate(&self, index: u32) -> (usize, usize) {
        let shard_count = self.shards.len();
        let index = index as usize;
        (index % shard_count, index / shard_count)
    }
}

#[cfg(test)]
impl TaskTable {
    /// Overwrite the generation of the slot behind `index`.
    fn seed_generation(&self, index: u32, generation: u32) {
        let (shard_idx, local) = self.locate(index);
        self.shards[shard_idx].lock().slots[local].generation = generation;
    }

    fn free_len(&self) -> usize {
        self.shards.iter().map(|s| s.lock().free.len()).sum()
    }
}

fn global_index(local: usize, shard_count: usize, shard_idx: usize) -> Result<u32> {
    local
        .checked_mul(shard_count)
        .and_then(|i| i.checked_add(shard_idx))
        .and_then(|i| u32::try_from(i).ok())
        .ok_or_else(|| anyhow!("task table exhausted: no slot index left in shard {shard_idx}").into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alloc(table: &TaskTable, name: &str) -> Arc<TaskRecord> {
        table
            .allocate(name.to_string(), None, None, true)
            .expect("allocation failed")
    }

    #[test]
    fn test_exhausted_generation_retires_slot() {
        let table = TaskTable::new(1, None);
        let first = alloc(&table, "first");
        assert!(table.recycle(first.handle()));
        table.seed_generation(first.handle().index(), u32::MAX - 1);

        let last = alloc(&table, "last");
        assert_eq!(last.handle().index(), first.handle().index());
        assert_eq!(last.handle().generation(), u32::MAX);

        assert!(table.recycle(last.handle()));
        assert_eq!(table.free_len(), 0, "exhausted slot went back on the free list");
        assert!(!table.recycle(last.handle()));

        let fresh = alloc(&table, "fresh");
        assert_ne!(fresh.handle().index(), last.handle().index());
        assert_eq!(fresh.handle().generation(), 0);

        // The retired slot still answers for its final handle only.
        assert!(table.get(last.handle()).is_ok());
        assert!(matches!(
            table.get(first.handle()),
            Err(SchedulerError::StaleHandle(_))
        ));
    }

    #[test]
    fn test_bounded_table_rejects_then_reuses() {
        let table = TaskTable::new(2, Some(2));
        let a = alloc(&table, "a");
        let _b = alloc(&table, "b");

        assert!(matches!(
            table.allocate("c".to_string(), None, None, true),
            Err(SchedulerError::TaskTableFull { capacity: 2 })
        ));
        assert_eq!(table.live(), 2);

        assert!(table.recycle(a.handle()));
        let c = alloc(&table, "c");
        assert_eq!(c.handle().index(), a.handle().index());
        assert_eq!(table.live(), 2);
    }
}
