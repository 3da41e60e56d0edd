use crate::context::ExecutionContext;
use crate::{Error, ErrorKind};
use std::panic::{catch_unwind, AssertUnwindSafe};

type Handler<A> = Box<dyn FnOnce(A) + Send + 'static>;

/// What to run when the source settles.
///
/// The fulfillment and rejection variants carry a passthrough next to their
/// handler: the passthrough forwards the outcome the handler does not
/// cover straight to the derived promise it captured. `abandon` settles that
/// derived promise when the handler never gets to run.
pub(crate) enum Continuation<T> {
    OnFulfilled {
        handler: Handler<T>,
        passthrough: Handler<Error>,
    },
    OnRejected {
        handler: Handler<Error>,
        passthrough: Handler<T>,
        abandon: Handler<Error>,
    },
    OnSettled(Handler<Result<T, Error>>),
}

impl<T> Continuation<T> {
    fn run(self, outcome: Result<T, Error>) {
        match (self, outcome) {
            (Continuation::OnFulfilled { handler, .. }, Ok(value)) => handler(value),
            (Continuation::OnFulfilled { passthrough, .. }, Err(err)) => passthrough(err),
            (Continuation::OnRejected { handler, .. }, Err(err)) => handler(err),
            (Continuation::OnRejected { passthrough, .. }, Ok(value)) => passthrough(value),
            (Continuation::OnSettled(handler), outcome) => handler(outcome),
        }
    }

    fn abandon(self, err: Error) {
        match self {
            Continuation::OnFulfilled { passthrough, .. } => passthrough(err),
            Continuation::OnRejected { abandon, .. } => abandon(err),
            Continuation::OnSettled(handler) => handler(Err(err)),
        }
    }
}

/// A continuation plus the context it was attached with.
pub(crate) struct Record<T> {
    pub(crate) continuation: Continuation<T>,
    pub(crate) context: ExecutionContext,
}

impl<T: Send + 'static> Record<T> {
    pub(crate) fn new(continuation: Continuation<T>, context: ExecutionContext) -> Self {
        Self {
            continuation,
            context,
        }
    }

    pub(crate) fn fire(self, outcome: Result<T, Error>) {
        let Record {
            continuation,
            context,
        } = self;
        tracing::trace!(
            inline = context.is_inline(),
            fulfilled = outcome.is_ok(),
            "dispatching continuation"
        );
        let job = Dispatch {
            continuation: Some(continuation),
            outcome: Some(outcome),
        };
        context.dispatch(Box::new(move || job.run()));
    }
}

/// A continuation in flight to its execution context.
///
/// Dropped without running (closed queue, discarded main queue), it
/// abandons the continuation with a `ProducerDropped` rejection.
struct Dispatch<T> {
    continuation: Option<Continuation<T>>,
    outcome: Option<Result<T, Error>>,
}

impl<T> Dispatch<T> {
    fn run(mut self) {
        if let (Some(continuation), Some(outcome)) =
            (self.continuation.take(), self.outcome.take())
        {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| continuation.run(outcome))) {
                let err = Error::panicked(payload);
                tracing::warn!(error = %err, "continuation panicked");
            }
        }
    }
}

impl<T> Drop for Dispatch<T> {
    fn drop(&mut self) {
        if let Some(continuation) = self.continuation.take() {
            tracing::warn!("continuation dropped by its execution context");
            let err = Error::with_kind(
                ErrorKind::ProducerDropped,
                "continuation dropped before it could run",
            );
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| continuation.abandon(err))) {
                let err = Error::panicked(payload);
                tracing::warn!(error = %err, "abandoned continuation panicked");
            }
        }
    }
}

/// Run a user handler, turning a panic into a `Panicked` rejection.
pub(crate) fn guarded<R>(f: impl FnOnce() -> Result<R, Error>) -> Result<R, Error> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(Error::panicked(payload)),
    }
}
