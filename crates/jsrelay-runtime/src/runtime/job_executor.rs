//! Microtask queue for the owning thread.
//!
//! Boa hands promise reactions to a `JobExecutor`. The event loop installs
//! this one and drains it after every callback invocation (a microtask
//! checkpoint), so promise chains started by a callback settle before the next
//! queued call runs.
//!
//! # Job Types
//!
//! - **PromiseJob**: promise reactions (`then`/`catch` handlers)
//! - **GenericJob**: host-enqueued jobs
//!
//! Native async jobs and timeouts have no driver on the owning thread and are
//! dropped with a warning.

use boa_engine::{
    context::Context,
    job::{GenericJob, Job, JobExecutor, PromiseJob},
    JsResult,
};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// A `JobExecutor` that queues jobs until the event loop asks for a checkpoint.
///
/// Uses `RefCell` because Boa only ever touches the executor from the
/// thread that owns the context.
pub struct MicrotaskQueue {
    /// Promise reactions, run in FIFO order
    promise_jobs: RefCell<VecDeque<PromiseJob>>,
    /// Host jobs, one per checkpoint iteration
    generic_jobs: RefCell<VecDeque<GenericJob>>,
}

impl MicrotaskQueue {
    pub fn new() -> Self {
        Self {
            promise_jobs: RefCell::default(),
            generic_jobs: RefCell::default(),
        }
    }

    /// Returns true if a checkpoint would do any work.
    pub fn has_pending_jobs(&self) -> bool {
        !self.promise_jobs.borrow().is_empty() || !self.generic_jobs.borrow().is_empty()
    }

    /// Runs at most one generic job, then every promise job queued so far.
    fn drain_once(&self, context: &mut Context) {
        let generic = self.generic_jobs.borrow_mut().pop_front();
        if let Some(generic) = generic {
            if let Err(err) = generic.call(context) {
                tracing::error!("Uncaught error in generic job: {err}");
            }
        }

        let jobs = std::mem::take(&mut *self.promise_jobs.borrow_mut());
        for job in jobs {
            if let Err(err) = job.call(context) {
                tracing::error!("Uncaught error in promise job: {err}");
            }
        }

        context.clear_kept_objects();
    }
}

impl Default for MicrotaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl JobExecutor for MicrotaskQueue {
    fn enqueue_job(self: Rc<Self>, job: Job, _context: &mut Context) {
        match job {
            Job::PromiseJob(job) => self.promise_jobs.borrow_mut().push_back(job),
            Job::GenericJob(job) => self.generic_jobs.borrow_mut().push_back(job),
            _ => {
                tracing::warn!("Unsupported job type enqueued on the owning thread, ignoring");
            }
        }
    }

    /// Drains until both queues are empty, including jobs enqueued while draining.
    fn run_jobs(self: Rc<Self>, context: &mut Context) -> JsResult<()> {
        while self.has_pending_jobs() {
            self.drain_once(context);
        }
        Ok(())
    }

    async fn run_jobs_async(self: Rc<Self>, context: &RefCell<&mut Context>) -> JsResult<()>
    where
        Self: Sized,
    {
        self.run_jobs(&mut context.borrow_mut())
    }
}
