//! Execution contexts decide where a continuation runs.
//!
//! A promise never owns threads. It hands each continuation to the
//! [`ExecutionContext`] captured when the continuation was attached; the
//! context either runs it inline or passes it to an [`Executor`].
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{
    mpsc::{channel, Sender},
    Arc, OnceLock,
};
use std::thread;

/// A unit of work handed to an executor.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Anything that can run jobs somewhere else.
pub trait Executor: Send + Sync {
    fn execute(&self, job: Job);
}

/// Opaque handle naming where a continuation runs.
///
/// The default is inline: the continuation runs on whichever thread settles
/// the promise, or on the attaching thread when the promise is already
/// settled.
#[derive(Clone, Default)]
pub struct ExecutionContext {
    executor: Option<Arc<dyn Executor>>,
}

impl ExecutionContext {
    pub fn inline() -> Self {
        Self { executor: None }
    }

    pub fn from_executor(executor: Arc<dyn Executor>) -> Self {
        Self {
            executor: Some(executor),
        }
    }

    pub fn is_inline(&self) -> bool {
        self.executor.is_none()
    }

    pub fn dispatch(&self, job: Job) {
        match &self.executor {
            None => job(),
            Some(executor) => executor.execute(job),
        }
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.executor {
            None => f.write_str("ExecutionContext::Inline"),
            Some(_) => f.write_str("ExecutionContext::Executor"),
        }
    }
}

impl From<WorkerQueue> for ExecutionContext {
    fn from(queue: WorkerQueue) -> Self {
        Self::from_executor(Arc::new(queue))
    }
}

impl From<&WorkerQueue> for ExecutionContext {
    fn from(queue: &WorkerQueue) -> Self {
        queue.clone().into()
    }
}

impl From<MainQueue> for ExecutionContext {
    fn from(queue: MainQueue) -> Self {
        Self::from_executor(Arc::new(queue))
    }
}

impl From<&MainQueue> for ExecutionContext {
    fn from(queue: &MainQueue) -> Self {
        queue.clone().into()
    }
}

/// Run a job on a queue; a panic is logged so the queue keeps going.
fn run_job(job: Job) {
    if catch_unwind(AssertUnwindSafe(job)).is_err() {
        tracing::warn!("queued job panicked");
    }
}

/// A named serial queue with its own worker thread.
///
/// Jobs run one at a time in submission order. The sender side may be
/// cloned freely; the worker exits once every handle is dropped and the
/// remaining jobs have run.
///
/// # Examples
///
/// ```
/// use promise_then::{Promise, WorkerQueue};
/// use std::sync::mpsc::channel;
/// let queue = WorkerQueue::new("io");
/// let (tx, rx) = channel();
/// let p = Promise::<u32>::new();
/// p.on_queue(&queue).done(move |v| {
///     tx.send((*v, std::thread::current().name().map(str::to_owned))).unwrap();
/// });
/// p.resolve(5);
/// assert_eq!(rx.recv().unwrap(), (5, Some("io".to_owned())));
/// ```
#[derive(Debug, Clone)]
pub struct WorkerQueue {
    name: Arc<str>,
    sender: Sender<Job>,
}

impl WorkerQueue {
    pub fn new(name: &str) -> Self {
        let (tx, rx) = channel::<Job>();
        let thread_name = name.to_owned();
        let spawned = thread::Builder::new().name(thread_name).spawn(move || {
            for job in rx {
                run_job(job);
            }
        });
        if let Err(err) = spawned {
            // The receiver went down with the closure, so every submit will
            // report the queue as closed.
            tracing::warn!(queue = name, error = %err, "failed to spawn worker thread");
        }
        Self {
            name: name.into(),
            sender: tx,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Submit a job. Returns `false` when the worker is gone.
    pub fn submit(&self, job: Job) -> bool {
        if self.sender.send(job).is_err() {
            tracing::warn!(queue = %self.name, "worker queue closed, dropping job");
            return false;
        }
        true
    }
}

impl Executor for WorkerQueue {
    fn execute(&self, job: Job) {
        self.submit(job);
    }
}

/// A queue drained explicitly by the thread that owns it.
///
/// This plays the role of a UI or main thread run loop: jobs pile up until
/// the owner calls [`MainQueue::run_pending`].
#[derive(Clone, Default)]
pub struct MainQueue {
    jobs: Arc<Mutex<VecDeque<Job>>>,
}

impl MainQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide queue used by `on_main_queue`.
    pub fn shared() -> &'static MainQueue {
        static SHARED: OnceLock<MainQueue> = OnceLock::new();
        SHARED.get_or_init(MainQueue::new)
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }

    /// Run the jobs queued so far on the calling thread.
    ///
    /// Jobs queued while this runs wait for the next call. Returns the
    /// number of jobs run.
    pub fn run_pending(&self) -> usize {
        let batch: Vec<Job> = self.jobs.lock().drain(..).collect();
        let count = batch.len();
        for job in batch {
            run_job(job);
        }
        count
    }

    /// Keep draining until nothing is queued.
    pub fn run_until_idle(&self) -> usize {
        let mut total = 0;
        loop {
            let ran = self.run_pending();
            if ran == 0 {
                return total;
            }
            total += ran;
        }
    }
}

impl Executor for MainQueue {
    fn execute(&self, job: Job) {
        self.jobs.lock().push_back(job);
    }
}

impl fmt::Debug for MainQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainQueue")
            .field("pending", &self.len())
            .finish()
    }
}
