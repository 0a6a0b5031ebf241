// src/task/closure.rs

//! Task bodies and the boundary around invoking them.
//!
//! Closures may return `()` or any `Result<(), E>` whose error converts into
//! [`anyhow::Error`]. Both are normalised into a boxed [`TaskFn`] when the
//! task is created. [`invoke`] is the only place a closure is called: it
//! turns returned errors and panics into
//! [`SchedulerError::TaskClosure`] so nothing escapes into the worker loop.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use anyhow::anyhow;

use crate::errors::{Result, SchedulerError};

pub(crate) type TaskFn = Box<dyn FnOnce() -> anyhow::Result<()> + Send + 'static>;

/// Return types accepted from task closures.
pub trait TaskOutput {
    fn into_task_result(self) -> anyhow::Result<()>;
}

impl TaskOutput for () {
    fn into_task_result(self) -> anyhow::Result<()> {
        Ok(())
    }
}

impl<E> TaskOutput for std::result::Result<(), E>
where
    E: Into<anyhow::Error>,
{
    fn into_task_result(self) -> anyhow::Result<()> {
        self.map_err(Into::into)
    }
}

pub(crate) fn boxed<F, R>(f: F) -> TaskFn
where
    F: FnOnce() -> R + Send + 'static,
    R: TaskOutput,
{
    Box::new(move || f().into_task_result())
}

/// Run a task body, catching both error returns and panics.
pub(crate) fn invoke(task: &str, f: TaskFn) -> Result<()> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(reason)) => Err(SchedulerError::TaskClosure {
            task: task.to_string(),
            reason,
        }),
        Err(payload) => Err(SchedulerError::TaskClosure {
            task: task.to_string(),
            reason: anyhow!("panicked: {}", panic_message(payload.as_ref())),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}
