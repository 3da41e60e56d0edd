//! Awaiting a promise.
//!
//! The future subscribes once with an `OnSettled` continuation, which parks
//! the outcome in a shared slot and wakes whoever polled last.
use crate::context::ExecutionContext;
use crate::{Error, Promise};
use parking_lot::Mutex;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

/// Future returned by `promise.into_future()` (or `promise.await`).
///
/// # Examples
///
/// ```
/// use promise_then::Promise;
/// use futures::executor::block_on;
/// use std::thread;
/// let p = Promise::<String>::new();
/// let producer = p.clone();
/// let task = thread::spawn(move || producer.resolve("🍓".into()));
/// assert_eq!(block_on(async { p.await }).unwrap(), "🍓");
/// task.join().expect("The producer thread has panicked");
/// ```
#[derive(Debug)]
pub struct Settled<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

#[derive(Debug)]
struct Slot<T> {
    outcome: Option<Result<T, Error>>,
    waker: Option<Waker>,
}

impl<T: Clone + Send + 'static> IntoFuture for Promise<T> {
    type Output = Result<T, Error>;
    type IntoFuture = Settled<T>;

    fn into_future(self) -> Self::IntoFuture {
        let slot = Arc::new(Mutex::new(Slot {
            outcome: None,
            waker: None,
        }));
        let shared = slot.clone();
        // Inline, so waking never depends on some queue being pumped.
        self.on_settled_in(ExecutionContext::inline(), move |outcome| {
            let mut slot = shared.lock();
            slot.outcome = Some(outcome);
            if let Some(waker) = slot.waker.take() {
                waker.wake()
            }
        });
        Settled { slot }
    }
}

impl<T> Future for Settled<T> {
    type Output = Result<T, Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut slot = self.slot.lock();
        match slot.outcome.take() {
            Some(outcome) => Poll::Ready(outcome),
            None => {
                slot.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}
