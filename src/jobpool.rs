// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Bounded-parallelism fan-out.
//!
//! A [`JobPool`] owns a list of jobs and runs them on at most `workers`
//! scoped threads. Results land in the slot matching each job's submission
//! index; a failing (or panicking) job is recorded and never stops its
//! siblings.

use core::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use parking_lot::Mutex;
use thiserror::Error;

type JobFn<'a, T> = Box<dyn FnOnce() -> anyhow::Result<T> + Send + 'a>;

/// A unit of work.
pub struct Job<'a, T> {
    work: JobFn<'a, T>,
}

impl<'a, T> Job<'a, T> {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<T> + Send + 'a,
    {
        Self { work: Box::new(f) }
    }

    /// A job that fails with `err` when run. Used when a job could not even
    /// be built (e.g. listing the partitions to fan out over failed).
    pub fn failed(err: anyhow::Error) -> Self
    where
        T: 'a,
    {
        let message = format!("{err:#}");
        Self::new(move || Err(anyhow::anyhow!(message)))
    }
}

impl<T> fmt::Debug for Job<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Job")
    }
}

/// Every failure of a pool run, keyed by job index.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct JobPoolError {
    pub failures: Vec<(usize, String)>,
}

impl JobPoolError {
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for JobPoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} job(s) failed", self.failures.len())?;
        for (idx, msg) in &self.failures {
            write!(f, "; job {idx}: {msg}")?;
        }
        Ok(())
    }
}

enum Slot<T> {
    Pending,
    Done(T),
    Failed(String),
}

pub struct JobPool<'a, T> {
    jobs: Vec<Option<Job<'a, T>>>,
    workers: usize,
    slots: Vec<Slot<T>>,
}

impl<T> fmt::Debug for JobPool<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobPool")
            .field("jobs", &self.jobs.len())
            .field("workers", &self.workers)
            .finish()
    }
}

impl<'a, T: Send> JobPool<'a, T> {
    /// Create a pool. A worker count of zero is treated as one.
    pub fn new(jobs: Vec<Job<'a, T>>, workers: usize) -> Self {
        let slots = jobs.iter().map(|_| Slot::Pending).collect();
        Self {
            jobs: jobs.into_iter().map(Some).collect(),
            workers: workers.max(1),
            slots,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Run every job and block until all of them have finished.
    pub fn run(&mut self) {
        let total = self.jobs.len();
        if total == 0 {
            return;
        }
        let workers = self.workers.min(total);
        log::debug!("job pool: running {total} jobs on {workers} workers");

        let queue: Vec<Mutex<Option<Job<'a, T>>>> =
            self.jobs.drain(..).map(Mutex::new).collect();
        let outputs: Vec<Mutex<Slot<T>>> = (0..total).map(|_| Mutex::new(Slot::Pending)).collect();
        let next = AtomicUsize::new(0);

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    let idx = next.fetch_add(1, Ordering::SeqCst);
                    if idx >= total {
                        break;
                    }
                    let Some(job) = queue[idx].lock().take() else {
                        continue;
                    };
                    let outcome = panic::catch_unwind(AssertUnwindSafe(job.work));
                    let slot = match outcome {
                        Ok(Ok(value)) => Slot::Done(value),
                        Ok(Err(err)) => {
                            log::warn!("job {idx} failed: {err:#}");
                            Slot::Failed(format!("{err:#}"))
                        }
                        Err(payload) => {
                            let msg = panic_message(payload.as_ref());
                            log::warn!("job {idx} panicked: {msg}");
                            Slot::Failed(format!("panic: {msg}"))
                        }
                    };
                    *outputs[idx].lock() = slot;
                });
            }
        });

        self.slots = outputs.into_iter().map(Mutex::into_inner).collect();
    }

    pub fn has_errors(&self) -> bool {
        self.slots.iter().any(|s| matches!(s, Slot::Failed(_)))
    }

    /// Aggregated failures, `None` when every job succeeded.
    pub fn errors(&self) -> Option<JobPoolError> {
        let failures: Vec<(usize, String)> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(idx, s)| match s {
                Slot::Failed(msg) => Some((idx, msg.clone())),
                _ => None,
            })
            .collect();
        if failures.is_empty() {
            None
        } else {
            Some(JobPoolError { failures })
        }
    }

    /// Outcome of job `idx`; `None` for failed or not-yet-run jobs.
    pub fn result(&self, idx: usize) -> Option<&T> {
        match self.slots.get(idx) {
            Some(Slot::Done(value)) => Some(value),
            _ => None,
        }
    }

    /// Outcomes in submission order.
    pub fn results(&self) -> Vec<Option<&T>> {
        (0..self.slots.len()).map(|idx| self.result(idx)).collect()
    }

    pub fn into_results(self) -> Vec<Result<T, String>> {
        self.slots
            .into_iter()
            .map(|s| match s {
                Slot::Done(value) => Ok(value),
                Slot::Failed(msg) => Err(msg),
                Slot::Pending => Err("job did not run".to_string()),
            })
            .collect()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run `f` once per partition on a pool of `workers` and concatenate the
/// outputs in partition order. Any failure is returned as a [`JobPoolError`]
/// listing every failed partition.
pub fn fan_out<P, R, F>(partitions: Vec<P>, workers: usize, f: F) -> Result<Vec<R>, JobPoolError>
where
    P: Send,
    R: Send,
    F: Fn(P) -> anyhow::Result<Vec<R>> + Sync,
{
    let f = &f;
    let jobs = partitions
        .into_iter()
        .map(|p| Job::new(move || f(p)))
        .collect();
    let mut pool = JobPool::new(jobs, workers);
    pool.run();
    if let Some(err) = pool.errors() {
        return Err(err);
    }
    let mut out = Vec::new();
    for batch in pool.into_results().into_iter().flatten() {
        out.extend(batch);
    }
    Ok(out)
}
