//! Execution-context handle and its ambient binding
//!
//! Each logical unit of work owns one [`ExecutionContext`]: a timing stack
//! plus a context store. Contexts are never shared. Inside
//! [`ExecutionContext::scope`] the context is bound to the tokio task and
//! follows it across worker threads; outside any scope each OS thread has
//! its own context.

use chrono::{DateTime, Utc};
use std::cell::RefCell;
use std::future::Future;

use scopewatch_core_types::ContextKey;

use crate::clock::{format_millis, format_timestamp};
use crate::fields::ContextStore;
use crate::stack::{StopReport, TimingStack};

tokio::task_local! {
    static TASK_CONTEXT: RefCell<ExecutionContext>;
}

thread_local! {
    static THREAD_CONTEXT: RefCell<ExecutionContext> = RefCell::new(ExecutionContext::new());
}

/// Timing stack and context store of one logical unit of work
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    stack: TimingStack,
    fields: ContextStore,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stack(&self) -> &TimingStack {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut TimingStack {
        &mut self.stack
    }

    pub fn fields(&self) -> &ContextStore {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut ContextStore {
        &mut self.fields
    }

    /// Start the top frame, recording `BeginTimestamp` on a transition
    pub fn start(&mut self, now: DateTime<Utc>) {
        if self.stack.start(now) {
            self.fields
                .put(ContextKey::BeginTimestamp, format_timestamp(now));
        }
    }

    /// Stop the top frame and write timing and target identity fields
    ///
    /// Target identity is written even when the frame was not running.
    pub fn stop(&mut self, now: DateTime<Utc>) -> StopReport {
        let report = self.stack.stop(now);
        if let Some(lap) = &report.lap {
            self.fields
                .put(ContextKey::BeginTimestamp, format_timestamp(lap.started_at));
            self.fields
                .put(ContextKey::EndTimestamp, format_timestamp(lap.stopped_at));
            self.fields
                .put(ContextKey::ElapsedTime, format_millis(lap.total));
        }
        if let Some(target) = report.target.as_deref().filter(|t| !t.is_empty()) {
            self.fields.put(ContextKey::TargetEntity, target);
        }
        if let Some(operation) = report.operation.as_deref() {
            self.fields.put(ContextKey::TargetServiceName, operation);
        }
        report
    }

    /// Drop all frames and fields
    pub fn reset(&mut self) {
        self.stack.clear();
        self.fields.clear();
    }

    /// Run `f` against the calling context
    ///
    /// Resolves to the task-bound context inside [`ExecutionContext::scope`],
    /// otherwise to the current thread's context. A re-entrant call made while
    /// the context is already borrowed (e.g. from a tracing layer) runs against
    /// a detached empty context instead of panicking; its writes are discarded.
    pub fn current<R>(f: impl FnOnce(&mut ExecutionContext) -> R) -> R {
        if Self::is_task_bound() {
            TASK_CONTEXT.with(|cell| Self::borrow_or_detached(cell, f))
        } else {
            THREAD_CONTEXT.with(|cell| Self::borrow_or_detached(cell, f))
        }
    }

    fn borrow_or_detached<R>(
        cell: &RefCell<ExecutionContext>,
        f: impl FnOnce(&mut ExecutionContext) -> R,
    ) -> R {
        match cell.try_borrow_mut() {
            Ok(mut ctx) => f(&mut ctx),
            Err(_) => f(&mut ExecutionContext::new()),
        }
    }

    /// Whether the caller runs inside a task-bound scope
    pub fn is_task_bound() -> bool {
        TASK_CONTEXT.try_with(|_| ()).is_ok()
    }

    /// Reset the calling context; call at worker reuse boundaries
    pub fn reset_current() {
        Self::current(ExecutionContext::reset);
    }

    /// Run `fut` with a fresh context bound to the task
    pub async fn scope<F: Future>(fut: F) -> F::Output {
        TASK_CONTEXT
            .scope(RefCell::new(ExecutionContext::new()), fut)
            .await
    }

    /// Run `f` synchronously with a fresh context
    pub fn sync_scope<R>(f: impl FnOnce() -> R) -> R {
        TASK_CONTEXT.sync_scope(RefCell::new(ExecutionContext::new()), f)
    }
}
