//! Turning a unit of work into a promise.
//!
//! An [`Operation`] is anything that eventually reports exactly one of
//! success or failure through the [`Completion`] it is started with. The
//! promise side knows nothing else about it.
use crate::context::WorkerQueue;
use crate::{Error, Promise};
use std::fmt;

/// A unit of work that reports its outcome through a [`Completion`].
pub trait Operation: Send + 'static {
    type Output: Clone + Send + 'static;

    /// Begin the work. Must not block waiting for it to finish.
    fn start(self, completion: Completion<Self::Output>);
}

/// Adds [`promise`](OperationExt::promise) to every operation.
pub trait OperationExt: Operation + Sized {
    /// Start the operation and return a promise for its outcome right away.
    ///
    /// ```
    /// use promise_then::operation::{from_fn, OperationExt};
    /// use std::thread;
    /// let p = from_fn(|done| {
    ///     thread::spawn(move || done.success(6 * 7));
    /// })
    /// .promise();
    /// let (tx, rx) = std::sync::mpsc::channel();
    /// p.done(move |v| tx.send(*v).unwrap());
    /// assert_eq!(rx.recv().unwrap(), 42);
    /// ```
    fn promise(self) -> Promise<Self::Output> {
        let promise = Promise::new();
        self.start(Completion::new(promise.clone()));
        promise
    }
}

impl<O: Operation> OperationExt for O {}

/// One-shot handle an operation settles its promise through.
///
/// Dropping it without calling either method rejects the promise with
/// [`ErrorKind::ProducerDropped`](crate::ErrorKind::ProducerDropped).
pub struct Completion<T: Clone + Send + 'static> {
    promise: Option<Promise<T>>,
}

impl<T: Clone + Send + 'static> Completion<T> {
    pub fn new(promise: Promise<T>) -> Self {
        Self {
            promise: Some(promise),
        }
    }

    pub fn success(mut self, value: T) {
        if let Some(promise) = self.promise.take() {
            promise.resolve(value);
        }
    }

    pub fn failure(mut self, err: Error) {
        if let Some(promise) = self.promise.take() {
            promise.reject(err);
        }
    }

    pub fn complete(mut self, outcome: Result<T, Error>) {
        if let Some(promise) = self.promise.take() {
            promise.settle(outcome);
        }
    }
}

impl<T: Clone + Send + 'static> Drop for Completion<T> {
    /// If this is an uncompleted handle, reject.
    fn drop(&mut self) {
        if let Some(promise) = self.promise.take() {
            tracing::debug!("completion dropped without an outcome");
            promise.reject(Error::producer_dropped());
        }
    }
}

impl<T: Clone + Send + 'static> fmt::Debug for Completion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("completed", &self.promise.is_none())
            .finish()
    }
}

/// An operation built from a closure that receives the completion handle.
pub struct FnOperation<T, F> {
    start: F,
    _output: std::marker::PhantomData<fn() -> T>,
}

pub fn from_fn<T, F>(start: F) -> FnOperation<T, F>
where
    T: Clone + Send + 'static,
    F: FnOnce(Completion<T>) + Send + 'static,
{
    FnOperation {
        start,
        _output: std::marker::PhantomData,
    }
}

impl<T, F> Operation for FnOperation<T, F>
where
    T: Clone + Send + 'static,
    F: FnOnce(Completion<T>) + Send + 'static,
{
    type Output = T;

    fn start(self, completion: Completion<T>) {
        (self.start)(completion)
    }
}

impl WorkerQueue {
    /// Run `work` on this queue and get a promise for its result.
    ///
    /// Continuations attached to the returned promise still run inline
    /// (on the worker, if attached before it finishes) unless routed with
    /// `on_queue`.
    ///
    /// ```
    /// use promise_then::WorkerQueue;
    /// use futures::executor::block_on;
    /// let queue = WorkerQueue::new("compute");
    /// let p = queue.run(|| Ok(1 + 1));
    /// assert_eq!(block_on(async { p.await }), Ok(2));
    /// ```
    pub fn run<T, F>(&self, work: F) -> Promise<T>
    where
        T: Clone + Send + 'static,
        F: FnOnce() -> Result<T, Error> + Send + 'static,
    {
        let queue = self.clone();
        from_fn(move |completion: Completion<T>| {
            // A closed queue drops the job, and with it the completion.
            queue.submit(Box::new(move || {
                completion.complete(crate::continuation::guarded(work))
            }));
        })
        .promise()
    }
}
