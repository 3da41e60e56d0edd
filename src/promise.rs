use crate::config::{Config, MisusePolicy};
use crate::context::ExecutionContext;
use crate::continuation::{guarded, Continuation, Record};
use crate::scheduled::Scheduled;
use crate::Error;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Where a promise is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Pending,
    Resolved,
    Rejected,
}

enum State<T> {
    Pending(Vec<Record<T>>),
    Resolved(T),
    Rejected(Error),
}

/// A single-assignment slot for a value or an error, with continuations.
///
/// Clones share the same slot: hand one to the producer and others to
/// consumers. `then`, `done` and `error` each return a new derived promise,
/// so chains compose.
///
/// # Examples
///
/// ```
/// use promise_then::{Error, Promise};
/// let p = Promise::<i32>::new();
/// let d = p.then(|v| Ok(v + 1));
/// p.resolve(41);
/// assert_eq!(d.value(), Some(42));
///
/// let p = Promise::<i32>::new();
/// let d = p.then(|v| Ok(v + 1));
/// p.reject(Error::new("E"));
/// assert_eq!(d.reason(), Some(Error::new("E")));
/// ```
pub struct Promise<T> {
    inner: Arc<Mutex<State<T>>>,
    config: Config,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: self.config.clone(),
        }
    }
}

impl<T> Default for Promise<T> {
    fn default() -> Self {
        Self::with_config(Config::default())
    }
}

impl<T> Promise<T> {
    /// A pending promise whose continuations run inline by default.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            inner: Arc::new(Mutex::new(State::Pending(Vec::new()))),
            config,
        }
    }

    /// A pending promise whose continuations run on `context` by default.
    pub fn with_context(context: impl Into<ExecutionContext>) -> Self {
        Self::with_config(Config::new().context(context))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn status(&self) -> Status {
        match &*self.inner.lock() {
            State::Pending(_) => Status::Pending,
            State::Resolved(_) => Status::Resolved,
            State::Rejected(_) => Status::Rejected,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status() == Status::Pending
    }

    pub fn is_resolved(&self) -> bool {
        self.status() == Status::Resolved
    }

    pub fn is_rejected(&self) -> bool {
        self.status() == Status::Rejected
    }

    pub fn reason(&self) -> Option<Error> {
        match &*self.inner.lock() {
            State::Rejected(err) => Some(err.clone()),
            _ => None,
        }
    }

    fn derive<U>(&self) -> Promise<U> {
        Promise::with_config(self.config.clone())
    }

    fn discarded(&self, attempt: Status) {
        match self.config.misuse {
            MisusePolicy::Ignore => {
                tracing::trace!(?attempt, "promise already settled, discarding")
            }
            MisusePolicy::Warn => {
                tracing::warn!(?attempt, "promise already settled, discarding")
            }
        }
    }
}

impl<T: Clone + Send + 'static> Promise<T> {
    pub fn resolved(value: T) -> Self {
        let promise = Self::new();
        promise.resolve(value);
        promise
    }

    pub fn rejected(err: Error) -> Self {
        let promise = Self::new();
        promise.reject(err);
        promise
    }

    pub fn value(&self) -> Option<T> {
        match &*self.inner.lock() {
            State::Resolved(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// The outcome, once settled.
    pub fn result(&self) -> Option<Result<T, Error>> {
        match &*self.inner.lock() {
            State::Pending(_) => None,
            State::Resolved(value) => Some(Ok(value.clone())),
            State::Rejected(err) => Some(Err(err.clone())),
        }
    }

    /// Fulfill with `value`. Returns `false` if the promise was already settled.
    pub fn resolve(&self, value: T) -> bool {
        self.settle(Ok(value))
    }

    /// Reject with `err`. Returns `false` if the promise was already settled.
    pub fn reject(&self, err: Error) -> bool {
        self.settle(Err(err))
    }

    /// Settle with either outcome.
    pub fn settle(&self, outcome: Result<T, Error>) -> bool {
        let attempt = match outcome {
            Ok(_) => Status::Resolved,
            Err(_) => Status::Rejected,
        };
        let records = {
            let mut state = self.inner.lock();
            if !matches!(*state, State::Pending(_)) {
                drop(state);
                self.discarded(attempt);
                return false;
            }
            let settled = match &outcome {
                Ok(value) => State::Resolved(value.clone()),
                Err(err) => State::Rejected(err.clone()),
            };
            match std::mem::replace(&mut *state, settled) {
                State::Pending(records) => records,
                _ => unreachable!("state checked as pending under the same lock"),
            }
        };
        tracing::debug!(status = ?attempt, continuations = records.len(), "promise settled");
        for record in records {
            record.fire(outcome.clone());
        }
        true
    }

    /// Attach a record, or fire it right away if already settled.
    ///
    /// Attachment and settlement take the same lock, so a record is either
    /// in the drained list or sees the settled state here, never neither.
    fn attach(&self, continuation: Continuation<T>, context: ExecutionContext) {
        let record = Record::new(continuation, context);
        let outcome = {
            let mut state = self.inner.lock();
            match &mut *state {
                State::Pending(records) => {
                    records.push(record);
                    return;
                }
                State::Resolved(value) => Ok(value.clone()),
                State::Rejected(err) => Err(err.clone()),
            }
        };
        record.fire(outcome);
    }

    /// Run `handler` once the promise settles, with either outcome.
    ///
    /// No derived promise is produced.
    pub fn on_settled<F>(&self, handler: F)
    where
        F: FnOnce(Result<T, Error>) + Send + 'static,
    {
        self.on_settled_in(self.config.context.clone(), handler)
    }

    pub(crate) fn on_settled_in<F>(&self, context: ExecutionContext, handler: F)
    where
        F: FnOnce(Result<T, Error>) + Send + 'static,
    {
        self.attach(Continuation::OnSettled(Box::new(handler)), context);
    }

    /// Transform the value. Rejections pass through without calling `handler`.
    ///
    /// Returning `Err` (or panicking) rejects the derived promise.
    pub fn then<U, F>(&self, handler: F) -> Promise<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<U, Error> + Send + 'static,
    {
        self.then_in(self.config.context.clone(), handler)
    }

    pub(crate) fn then_in<U, F>(&self, context: ExecutionContext, handler: F) -> Promise<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<U, Error> + Send + 'static,
    {
        let derived = self.derive::<U>();
        let target = derived.clone();
        let passthrough = derived.clone();
        self.attach(
            Continuation::OnFulfilled {
                handler: Box::new(move |value| {
                    target.settle(guarded(|| handler(value)));
                }),
                passthrough: Box::new(move |err| {
                    passthrough.reject(err);
                }),
            },
            context,
        );
        derived
    }

    /// Like [`then`](Self::then), but `handler` returns another promise
    /// whose eventual outcome becomes the derived promise's outcome.
    ///
    /// ```
    /// use promise_then::Promise;
    /// let p = Promise::<i32>::new();
    /// let inner = Promise::<String>::new();
    /// let inner2 = inner.clone();
    /// let d = p.and_then(move |_| Ok(inner2));
    /// p.resolve(1);
    /// assert!(d.is_pending());
    /// inner.resolve("X".into());
    /// assert_eq!(d.value().as_deref(), Some("X"));
    /// ```
    pub fn and_then<U, F>(&self, handler: F) -> Promise<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<Promise<U>, Error> + Send + 'static,
    {
        self.and_then_in(self.config.context.clone(), handler)
    }

    pub(crate) fn and_then_in<U, F>(&self, context: ExecutionContext, handler: F) -> Promise<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<Promise<U>, Error> + Send + 'static,
    {
        let derived = self.derive::<U>();
        let target = derived.clone();
        let passthrough = derived.clone();
        self.attach(
            Continuation::OnFulfilled {
                handler: Box::new(move |value| match guarded(|| handler(value)) {
                    // Adopt through a one-shot subscription; it is released once fired.
                    Ok(next) => next.on_settled_in(ExecutionContext::inline(), move |outcome| {
                        target.settle(outcome);
                    }),
                    Err(err) => {
                        target.reject(err);
                    }
                }),
                passthrough: Box::new(move |err| {
                    passthrough.reject(err);
                }),
            },
            context,
        );
        derived
    }

    /// Observe the value. The derived promise resolves with the same value.
    ///
    /// A panicking observer is logged and does not change the outcome;
    /// use [`then`](Self::then) to turn a failure into a rejection.
    pub fn done<F>(&self, handler: F) -> Promise<T>
    where
        F: FnOnce(&T) + Send + 'static,
    {
        self.done_in(self.config.context.clone(), handler)
    }

    pub(crate) fn done_in<F>(&self, context: ExecutionContext, handler: F) -> Promise<T>
    where
        F: FnOnce(&T) + Send + 'static,
    {
        let derived = self.derive::<T>();
        let target = derived.clone();
        let passthrough = derived.clone();
        self.attach(
            Continuation::OnFulfilled {
                handler: Box::new(move |value| {
                    observe(|| handler(&value));
                    target.resolve(value);
                }),
                passthrough: Box::new(move |err| {
                    passthrough.reject(err);
                }),
            },
            context,
        );
        derived
    }

    /// Observe a rejection. The derived promise rejects with the same error;
    /// values pass through untouched. A panicking observer is logged and
    /// the error it was shown still reaches the derived promise.
    pub fn error<F>(&self, handler: F) -> Promise<T>
    where
        F: FnOnce(&Error) + Send + 'static,
    {
        self.error_in(self.config.context.clone(), handler)
    }

    pub(crate) fn error_in<F>(&self, context: ExecutionContext, handler: F) -> Promise<T>
    where
        F: FnOnce(&Error) + Send + 'static,
    {
        let derived = self.derive::<T>();
        let target = derived.clone();
        let passthrough = derived.clone();
        let abandoned = derived.clone();
        self.attach(
            Continuation::OnRejected {
                handler: Box::new(move |err| {
                    observe(|| handler(&err));
                    target.reject(err);
                }),
                passthrough: Box::new(move |value| {
                    passthrough.resolve(value);
                }),
                abandon: Box::new(move |err| {
                    abandoned.reject(err);
                }),
            },
            context,
        );
        derived
    }

    /// Run the next attached continuation on `context` instead of the default.
    pub fn on_queue(&self, context: impl Into<ExecutionContext>) -> Scheduled<'_, T> {
        Scheduled::new(self, context.into())
    }

    /// Run the next attached continuation on [`MainQueue::shared`](crate::MainQueue::shared).
    pub fn on_main_queue(&self) -> Scheduled<'_, T> {
        self.on_queue(crate::MainQueue::shared())
    }
}

/// Run an observer; a panic is logged and goes no further.
fn observe(f: impl FnOnce()) {
    if let Err(err) = guarded(|| {
        f();
        Ok(())
    }) {
        tracing::warn!(error = %err, "observer panicked, outcome passed through");
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (status, pending) = match &*self.inner.lock() {
            State::Pending(records) => (Status::Pending, records.len()),
            State::Resolved(_) => (Status::Resolved, 0),
            State::Rejected(_) => (Status::Rejected, 0),
        };
        f.debug_struct("Promise")
            .field("status", &status)
            .field("continuations", &pending)
            .field("context", &self.config.context)
            .finish()
    }
}
