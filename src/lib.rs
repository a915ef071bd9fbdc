//! Executor driven promise: deferred then/catch chaining, blocking
//! retrieval and an `all` aggregate over many pending promises.
//!
//! A [`Promise`] stores its executor without running it. The first `then`
//! (or a blocking await) starts the executor, which settles the promise
//! exactly once through the [`Producer`] it is handed. Settlement either
//! wakes a blocked waiter or dispatches the next queued continuation of
//! the chain.
//!
//! # Examples
//!
//! then()/catch():
//!
//! ```
//! use promise_chain::{Promise, Step};
//! use std::sync::mpsc::channel;
//! use std::thread;
//!
//! let (tx, rx) = channel();
//! let promise = Promise::<String, String>::new(|producer| {
//!     thread::spawn(move || producer.resolve("result".to_owned()));
//! });
//! let _chain = promise
//!     .then(move |result| {
//!         tx.send(result).unwrap();
//!         Step::Done
//!     })
//!     .catch(|error| println!("failed: {error}"));
//! assert_eq!(rx.recv().unwrap(), "result");
//! ```
//!
//! await:
//!
//! ```
//! use promise_chain::Promise;
//! use std::thread;
//!
//! let promise = Promise::<&str, ()>::new(|producer| {
//!     thread::spawn(move || producer.resolve("🍓"));
//! });
//! assert_eq!(promise.await_promise(), Ok("🍓"));
//! ```
//!
//! all():
//!
//! ```
//! use promise_chain::{Promise, ALL_PROMISES_SUCCESS};
//! use std::thread;
//!
//! let children = (0..3)
//!     .map(|i| {
//!         Promise::<i32, String>::new(move |producer| {
//!             thread::spawn(move || producer.resolve(i));
//!         })
//!     })
//!     .collect();
//! assert_eq!(
//!     Promise::all(children).await_promise(),
//!     Ok(ALL_PROMISES_SUCCESS.to_owned())
//! );
//! ```

mod all;
mod chain;
pub mod promise;
mod wait;

pub use all::ALL_PROMISES_SUCCESS;
pub use promise::{Producer, Promise, Step};

/// Why a blocking retrieval came back without a value.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error<E> {
    /// The promise rejected with the producer supplied error.
    #[error("promise rejected")]
    Rejected(E),
    /// Every producer was dropped before the promise settled.
    #[error("producer dropped without settling the promise")]
    ProducerDropped,
    /// The deadline passed before the promise settled.
    #[error("timed out waiting for the promise to settle")]
    TimedOut,
}
