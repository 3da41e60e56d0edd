//! A single-assignment promise with chainable continuations.
//!
//! A producer creates a [`Promise`], hands clones to consumers and later
//! calls [`resolve`](Promise::resolve) or [`reject`](Promise::reject) once.
//! Consumers attach continuations with [`then`](Promise::then),
//! [`and_then`](Promise::and_then), [`done`](Promise::done) and
//! [`error`](Promise::error); each returns a new promise for the outcome of
//! that step. [`on_queue`](Promise::on_queue) picks the execution context
//! for the next continuation only.
//!
//! Settling twice is not an error: the later outcome is discarded and the
//! first one stays. [`MisusePolicy::Warn`] makes that visible in the logs.
//!
//! ```
//! use promise_then::{Error, Promise};
//! let p = Promise::<i32>::new();
//! let seen = p
//!     .then(|v| if v > 0 { Ok(v * 2) } else { Err(Error::handler("negative")) })
//!     .done(|v| println!("got {v}"))
//!     .error(|e| eprintln!("failed: {e}"));
//! p.resolve(21);
//! assert_eq!(seen.value(), Some(42));
//! ```
pub mod config;
pub mod context;
mod continuation;
pub mod error;
pub mod operation;
pub mod promise;
pub mod scheduled;
pub mod wait;

pub use config::{Config, MisusePolicy};
pub use context::{ExecutionContext, Executor, Job, MainQueue, WorkerQueue};
pub use error::{Error, ErrorKind};
pub use operation::{Completion, Operation, OperationExt};
pub use promise::{Promise, Status};
pub use scheduled::Scheduled;
pub use wait::Settled;
