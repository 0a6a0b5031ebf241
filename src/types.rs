// src/types.rs

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Bound on how much main-thread work a single `execute_main_queue` call
/// drains. Tasks beyond the budget stay queued for the next call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainQueueBudget {
    /// Stop after this many tasks.
    Tasks(usize),
    /// Stop starting new tasks once this much time has elapsed.
    Time(Duration),
}

impl fmt::Display for MainQueueBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MainQueueBudget::Tasks(n) => write!(f, "{n} tasks"),
            MainQueueBudget::Time(d) => {
                // Largest unit that loses nothing, so the text parses back.
                let nanos = d.as_nanos();
                if nanos % 1_000_000 == 0 {
                    write!(f, "{}ms", nanos / 1_000_000)
                } else if nanos % 1_000 == 0 {
                    write!(f, "{}us", nanos / 1_000)
                } else {
                    write!(f, "{nanos}ns")
                }
            }
        }
    }
}

impl MainQueueBudget {
    pub fn is_zero(&self) -> bool {
        match self {
            MainQueueBudget::Tasks(n) => *n == 0,
            MainQueueBudget::Time(d) => d.is_zero(),
        }
    }
}

/// Parses `"32"` (or `"32 tasks"`) as a task count and `"4ms"`, `"500us"`
/// or `"250ns"` as a time budget. Accepts everything `Display` prints.
impl FromStr for MainQueueBudget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();

        let budget = if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(|ms| MainQueueBudget::Time(Duration::from_millis(ms)))
        } else if let Some(us) = s.strip_suffix("us") {
            us.trim()
                .parse::<u64>()
                .map(|us| MainQueueBudget::Time(Duration::from_micros(us)))
        } else if let Some(ns) = s.strip_suffix("ns") {
            ns.trim()
                .parse::<u64>()
                .map(|ns| MainQueueBudget::Time(Duration::from_nanos(ns)))
        } else {
            s.strip_suffix("tasks")
                .unwrap_or(&s)
                .trim()
                .parse::<usize>()
                .map(MainQueueBudget::Tasks)
        };

        match budget {
            Ok(b) if b.is_zero() => Err(format!(
                "main queue budget must be non-zero (got \"{s}\")"
            )),
            Ok(b) => Ok(b),
            Err(_) => Err(format!(
                "invalid main queue budget: {s} (expected a task count like \"32\" or a time like \"4ms\")"
            )),
        }
    }
}
