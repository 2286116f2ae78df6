//! Background solving for the interactive client.
//!
//! Every submitted problem gets the next sequence number. The worker skips
//! queued problems that a newer submission has superseded, and results older
//! than the newest submission are dropped on the receiving side.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::error::Result;
use crate::models::Solution;
use crate::planner::request::MealProblem;
use crate::planner::solver::{Backend, MicroLpBackend};
use crate::planner::solve_meal_with;

struct Job {
    seq: u64,
    problem: MealProblem,
}

/// A finished solve tagged with the submission it answers.
#[derive(Debug)]
pub struct Completed {
    pub seq: u64,
    pub result: Result<Solution>,
}

pub struct SolveDispatcher {
    jobs: Option<Sender<Job>>,
    results: Receiver<Completed>,
    issued: Arc<AtomicU64>,
    worker: Option<JoinHandle<()>>,
}

impl SolveDispatcher {
    pub fn spawn() -> Result<Self> {
        Self::with_backend(Arc::new(MicroLpBackend))
    }

    pub fn with_backend(backend: Arc<dyn Backend>) -> Result<Self> {
        let (job_tx, job_rx) = mpsc::channel::<Job>();
        let (result_tx, result_rx) = mpsc::channel();
        let issued = Arc::new(AtomicU64::new(0));
        let worker_issued = Arc::clone(&issued);

        let worker = thread::Builder::new()
            .name("solve-dispatcher".to_string())
            .spawn(move || {
                while let Ok(mut job) = job_rx.recv() {
                    while let Ok(newer) = job_rx.try_recv() {
                        trace!(skipped = job.seq, "superseded before start");
                        job = newer;
                    }
                    if job.seq < worker_issued.load(Ordering::Acquire) {
                        trace!(skipped = job.seq, "superseded before start");
                        continue;
                    }
                    let result = solve_meal_with(&job.problem, Arc::clone(&backend));
                    if result_tx.send(Completed { seq: job.seq, result }).is_err() {
                        break;
                    }
                }
            })?;

        Ok(Self {
            jobs: Some(job_tx),
            results: result_rx,
            issued,
            worker: Some(worker),
        })
    }

    /// Queue a problem; returns its sequence number.
    pub fn submit(&self, problem: MealProblem) -> u64 {
        let seq = self.issued.fetch_add(1, Ordering::AcqRel) + 1;
        if let Some(jobs) = &self.jobs {
            // A closed queue means the worker is gone; `wait_latest` then reports nothing.
            let _ = jobs.send(Job { seq, problem });
        }
        debug!(seq, "submitted");
        seq
    }

    /// Newest sequence number handed out.
    pub fn latest(&self) -> u64 {
        self.issued.load(Ordering::Acquire)
    }

    fn accept(&self, completed: Completed) -> Option<Completed> {
        if completed.seq == self.latest() {
            Some(completed)
        } else {
            debug!(seq = completed.seq, latest = self.latest(), "discarding stale result");
            None
        }
    }

    /// Non-blocking: the result for the newest submission, if it has arrived.
    pub fn poll(&self) -> Option<Completed> {
        let mut current = None;
        while let Ok(completed) = self.results.try_recv() {
            if let Some(c) = self.accept(completed) {
                current = Some(c);
            }
        }
        current
    }

    /// Block until the newest submission is answered or `timeout` passes.
    pub fn wait_latest(&self, timeout: Duration) -> Option<Completed> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.results.recv_timeout(remaining) {
                Ok(completed) => {
                    if let Some(c) = self.accept(completed) {
                        return Some(c);
                    }
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return None;
                }
            }
        }
    }
}

impl Drop for SolveDispatcher {
    fn drop(&mut self) {
        self.jobs.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
