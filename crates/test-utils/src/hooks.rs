use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tasksched::SchedulerHooks;
use tasksched::errors::SchedulerError;

/// One `on_task_start` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    pub thread_index: usize,
    pub task: String,
}

/// Hooks that record every callback for later assertions.
#[derive(Debug, Default)]
pub struct RecordingHooks {
    executions: Mutex<Vec<Execution>>,
    thread_starts: Mutex<BTreeSet<usize>>,
    thread_stops: Mutex<BTreeSet<usize>>,
    errors: Mutex<Vec<(String, String)>>,
}

impl RecordingHooks {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn executions(&self) -> Vec<Execution> {
        self.executions.lock().clone()
    }

    /// Thread indices that executed a task with this exact name.
    pub fn threads_for(&self, task: &str) -> Vec<usize> {
        self.executions
            .lock()
            .iter()
            .filter(|e| e.task == task)
            .map(|e| e.thread_index)
            .collect()
    }

    pub fn executed_count(&self, task: &str) -> usize {
        self.threads_for(task).len()
    }

    pub fn thread_starts(&self) -> BTreeSet<usize> {
        self.thread_starts.lock().clone()
    }

    pub fn thread_stops(&self) -> BTreeSet<usize> {
        self.thread_stops.lock().clone()
    }

    /// `(task, rendered error)` for each failed closure.
    pub fn errors(&self) -> Vec<(String, String)> {
        self.errors.lock().clone()
    }
}

impl SchedulerHooks for RecordingHooks {
    fn on_thread_start(&self, thread_index: usize) {
        self.thread_starts.lock().insert(thread_index);
    }

    fn on_thread_stop(&self, thread_index: usize) {
        self.thread_stops.lock().insert(thread_index);
    }

    fn on_task_start(&self, thread_index: usize, task: &str) {
        self.executions.lock().push(Execution {
            thread_index,
            task: task.to_string(),
        });
    }

    fn on_task_error(&self, _thread_index: usize, task: &str, error: &SchedulerError) {
        self.errors
            .lock()
            .push((task.to_string(), error.to_string()));
    }
}
