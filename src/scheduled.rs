use crate::context::ExecutionContext;
use crate::{Error, Promise};

/// A promise paired with the context for its next continuation.
///
/// Returned by [`Promise::on_queue`] and [`Promise::on_main_queue`]. Each
/// method consumes the builder, so the choice covers exactly one attachment;
/// the promise it returns goes back to the default context.
///
/// ```
/// use promise_then::{MainQueue, Promise};
/// let main = MainQueue::new();
/// let p = Promise::<i32>::new();
/// let d = p.on_queue(&main).then(|v| Ok(v + 1));
/// let dd = d.then(|v| Ok(v * 2));
/// p.resolve(1);
/// assert!(d.is_pending());
/// main.run_pending();
/// // `dd` was attached without a queue, so it ran inline as soon as `d` settled.
/// assert_eq!(dd.value(), Some(4));
/// ```
#[must_use = "a scheduled promise does nothing until a continuation is attached"]
#[derive(Debug)]
pub struct Scheduled<'a, T> {
    promise: &'a Promise<T>,
    context: ExecutionContext,
}

impl<'a, T: Clone + Send + 'static> Scheduled<'a, T> {
    pub(crate) fn new(promise: &'a Promise<T>, context: ExecutionContext) -> Self {
        Self { promise, context }
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn then<U, F>(self, handler: F) -> Promise<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<U, Error> + Send + 'static,
    {
        self.promise.then_in(self.context, handler)
    }

    pub fn and_then<U, F>(self, handler: F) -> Promise<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<Promise<U>, Error> + Send + 'static,
    {
        self.promise.and_then_in(self.context, handler)
    }

    pub fn done<F>(self, handler: F) -> Promise<T>
    where
        F: FnOnce(&T) + Send + 'static,
    {
        self.promise.done_in(self.context, handler)
    }

    pub fn error<F>(self, handler: F) -> Promise<T>
    where
        F: FnOnce(&Error) + Send + 'static,
    {
        self.promise.error_in(self.context, handler)
    }

    pub fn on_settled<F>(self, handler: F)
    where
        F: FnOnce(Result<T, Error>) + Send + 'static,
    {
        self.promise.on_settled_in(self.context, handler)
    }
}
