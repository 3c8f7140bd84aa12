// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! One-shot GPU jobs and the FIFO queue that feeds the worker thread.

use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::borrow::Cow;
use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};

type Task = Box<dyn FnOnce() + Send + 'static>;

/// A unit of work executed once on the worker thread.
///
/// A job captures everything it needs by value. It may be empty (carry no
/// task), which the worker rejects instead of queueing.
pub struct Job {
    label: Cow<'static, str>,
    task: Option<Task>,
}

/// What happened when a job was executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The task ran to completion.
    Completed,
    /// The task panicked; the payload message is attached.
    Panicked(String),
    /// There was nothing to run.
    Empty,
}

impl Job {
    /// Wraps a closure.
    pub fn new(task: impl FnOnce() + Send + 'static) -> Self {
        Self::named("job", task)
    }

    /// Wraps a closure with a label used in log messages.
    pub fn named(label: impl Into<Cow<'static, str>>, task: impl FnOnce() + Send + 'static) -> Self {
        Self {
            label: label.into(),
            task: Some(Box::new(task)),
        }
    }

    /// A job with no task.
    pub fn empty() -> Self {
        Self {
            label: Cow::Borrowed("empty"),
            task: None,
        }
    }

    /// Returns `true` if the job carries no task.
    pub fn is_empty(&self) -> bool {
        self.task.is_none()
    }

    /// The label given at construction.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Runs the task on the calling thread, containing any panic.
    pub fn execute(self) -> JobOutcome {
        let Some(task) = self.task else {
            return JobOutcome::Empty;
        };
        match panic::catch_unwind(AssertUnwindSafe(task)) {
            Ok(()) => JobOutcome::Completed,
            Err(payload) => JobOutcome::Panicked(panic_message(payload.as_ref())),
        }
    }
}

impl Default for Job {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("label", &self.label)
            .field("empty", &self.is_empty())
            .finish()
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

struct QueueState {
    jobs: VecDeque<Job>,
    shutdown: bool,
}

/// A FIFO queue of [`Job`]s with blocking dequeue and explicit shutdown.
///
/// After [`shutdown`](Self::shutdown) no job is accepted, but jobs already
/// queued are still handed out: [`pop`](Self::pop) only reports the end once
/// the queue is both shut down and empty.
pub struct JobQueue {
    state: Mutex<QueueState>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: Option<usize>,
    // Lock-free snapshot for diagnostics.
    len: AtomicUsize,
}

impl JobQueue {
    /// Creates an unbounded queue.
    pub fn new() -> Self {
        Self::with_capacity_limit(None)
    }

    /// Creates a queue holding at most `capacity` jobs; producers block while it is full.
    pub fn bounded(capacity: usize) -> Self {
        Self::with_capacity_limit(Some(capacity))
    }

    /// A zero bound is raised to one so producers can make progress.
    pub(crate) fn with_capacity_limit(capacity: Option<usize>) -> Self {
        let capacity = capacity.map(|capacity| capacity.max(1));
        Self {
            state: Mutex::new(QueueState {
                jobs: VecDeque::new(),
                shutdown: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
            len: AtomicUsize::new(0),
        }
    }

    /// Appends `job` to the tail and wakes one consumer.
    ///
    /// Returns the job back if it is empty or the queue has been shut down.
    /// On a bounded queue this blocks until there is room or shutdown is requested.
    pub fn push(&self, job: Job) -> Result<(), Job> {
        if job.is_empty() {
            log::warn!("Attempted to add an empty job; ignoring it");
            return Err(job);
        }

        let mut state = self.state.lock();
        if let Some(capacity) = self.capacity {
            while state.jobs.len() >= capacity && !state.shutdown {
                self.not_full.wait(&mut state);
            }
        }
        if state.shutdown {
            drop(state);
            log::warn!("Job '{}' added after shutdown was requested; dropping it", job.label());
            return Err(job);
        }

        state.jobs.push_back(job);
        self.len.store(state.jobs.len(), Ordering::Release);
        drop(state);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Blocks until a job is available, then returns it.
    ///
    /// Returns `None` once shutdown has been requested and every queued job has
    /// been handed out.
    pub fn pop(&self) -> Option<Job> {
        let mut state = self.state.lock();
        loop {
            if let Some(job) = self.take_front(&mut state) {
                return Some(job);
            }
            if state.shutdown {
                return None;
            }
            self.not_empty.wait(&mut state);
        }
    }

    /// Returns the next job without blocking.
    pub fn try_pop(&self) -> Option<Job> {
        let mut state = self.state.lock();
        self.take_front(&mut state)
    }

    fn take_front(&self, state: &mut QueueState) -> Option<Job> {
        let job = state.jobs.pop_front()?;
        self.len.store(state.jobs.len(), Ordering::Release);
        self.not_full.notify_one();
        Some(job)
    }

    /// Stops accepting jobs and wakes every waiting producer and consumer.
    ///
    /// Returns `true` for the call that actually initiated shutdown.
    pub fn shutdown(&self) -> bool {
        let initiated = {
            let mut state = self.state.lock();
            !std::mem::replace(&mut state.shutdown, true)
        };
        self.not_empty.notify_all();
        self.not_full.notify_all();
        initiated
    }

    /// Returns `true` once [`shutdown`](Self::shutdown) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.state.lock().shutdown
    }

    /// Number of queued jobs. A snapshot; it may change immediately.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Returns `true` if no jobs are queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The bound given at construction.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobQueue")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn recording(log: &Arc<Mutex<Vec<u32>>>, n: u32) -> Job {
        let log = Arc::clone(log);
        Job::new(move || log.lock().push(n))
    }

    #[test]
    fn pops_in_push_order() {
        let queue = JobQueue::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for n in 0..50 {
            queue.push(recording(&seen, n)).unwrap();
        }
        assert_eq!(queue.len(), 50);
        queue.shutdown();
        while let Some(job) = queue.pop() {
            assert_eq!(job.execute(), JobOutcome::Completed);
        }
        assert_eq!(*seen.lock(), (0..50).collect::<Vec<_>>());
        assert!(queue.is_empty());
    }

    #[test]
    fn empty_job_is_rejected_without_changing_length() {
        let queue = JobQueue::new();
        queue.push(Job::new(|| {})).unwrap();
        let rejected = queue.push(Job::empty()).unwrap_err();
        assert!(rejected.is_empty());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn push_after_shutdown_hands_job_back() {
        let queue = JobQueue::new();
        assert!(queue.shutdown());
        assert!(!queue.shutdown());
        let job = queue.push(Job::named("late", || {})).unwrap_err();
        assert_eq!(job.label(), "late");
        assert_eq!(queue.len(), 0);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn pop_blocks_until_push() {
        let queue = Arc::new(JobQueue::new());
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop().map(|j| j.label().to_string()))
        };
        thread::sleep(Duration::from_millis(20));
        queue.push(Job::named("wake", || {})).unwrap();
        assert_eq!(consumer.join().unwrap().as_deref(), Some("wake"));
    }

    #[test]
    fn shutdown_wakes_idle_consumers() {
        let queue = Arc::new(JobQueue::new());
        let consumers: Vec<_> = (0..3)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || queue.pop().is_none())
            })
            .collect();
        thread::sleep(Duration::from_millis(20));
        queue.shutdown();
        for c in consumers {
            assert!(c.join().unwrap());
        }
    }

    #[test]
    fn bounded_queue_blocks_producer_until_space() {
        let queue = Arc::new(JobQueue::bounded(1));
        queue.push(Job::named("first", || {})).unwrap();

        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.push(Job::named("second", || {})).is_ok())
        };
        thread::sleep(Duration::from_millis(20));
        assert_eq!(queue.len(), 1);

        assert_eq!(queue.pop().unwrap().label(), "first");
        assert!(producer.join().unwrap());
        assert_eq!(queue.pop().unwrap().label(), "second");
    }

    #[test]
    fn shutdown_releases_blocked_producer() {
        let queue = Arc::new(JobQueue::bounded(1));
        queue.push(Job::new(|| {})).unwrap();
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.push(Job::new(|| {})).is_err())
        };
        thread::sleep(Duration::from_millis(20));
        queue.shutdown();
        assert!(producer.join().unwrap());
        // The job queued before shutdown is still delivered.
        assert!(queue.pop().is_some());
        assert!(queue.pop().is_none());
    }

    #[test]
    fn zero_capacity_accepts_one_job() {
        let queue = JobQueue::with_capacity_limit(Some(0));
        queue.push(Job::named("only", || {})).unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pop().unwrap().label(), "only");
    }

    #[test]
    fn execute_contains_panics() {
        let outcome = Job::new(|| panic!("boom")).execute();
        assert_eq!(outcome, JobOutcome::Panicked("boom".to_string()));
        assert_eq!(Job::empty().execute(), JobOutcome::Empty);
    }
}
