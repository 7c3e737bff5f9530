use log::{Level, log_enabled, warn};
use std::time::{Duration, Instant};

/// Scoped timer that traces how long a section of worker code took.
pub struct ScopedTimer<'a> {
    label: &'a str,
    start: Instant,
}

impl<'a> ScopedTimer<'a> {
    pub fn new(label: &'a str) -> Self {
        if log_enabled!(Level::Trace) {
            log::trace!("⏱️ start {label}");
        }
        Self {
            label,
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl<'a> Drop for ScopedTimer<'a> {
    fn drop(&mut self) {
        if log_enabled!(Level::Trace) {
            let elapsed = self.start.elapsed();
            log::trace!("⏱️ end {} ({} µs)", self.label, elapsed.as_micros());
        }
    }
}

/// Warns when a single task held the worker longer than its budget.
pub fn warn_if_task_budget_exceeded(task_name: &str, duration: Duration, budget_ms: f32) {
    if budget_ms > 0.0 && duration.as_secs_f32() * 1000.0 > budget_ms {
        warn!(
            "{task_name} exceeded task budget: {:.2} ms > {:.2} ms",
            duration.as_secs_f32() * 1000.0,
            budget_ms
        );
    }
}
