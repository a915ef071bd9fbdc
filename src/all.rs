//! Aggregate combinator: one promise settling on the joint outcome of
//! many children.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::promise::{Promise, Step};

/// Value an [`Promise::all`] aggregate fulfills with once every child
/// has fulfilled.
pub const ALL_PROMISES_SUCCESS: &str = "Succeed to execute all promises.";

impl<T, E> Promise<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Combines `promises` into one promise that fulfills with
    /// [`ALL_PROMISES_SUCCESS`] once every child fulfills, and rejects
    /// with the first child error otherwise.
    ///
    /// Children only start when the aggregate itself is consumed. An
    /// empty input fulfills immediately. Once the aggregate settles,
    /// later child outcomes are observed but change nothing.
    ///
    /// # Examples
    ///
    /// ```
    /// use promise_chain::{Promise, ALL_PROMISES_SUCCESS};
    /// use std::thread;
    ///
    /// let children = (0..3)
    ///     .map(|i| {
    ///         Promise::<i32, String>::new(move |producer| {
    ///             thread::spawn(move || producer.resolve(i));
    ///         })
    ///     })
    ///     .collect();
    /// let all = Promise::all(children);
    /// assert_eq!(all.await_promise(), Ok(ALL_PROMISES_SUCCESS.to_owned()));
    /// ```
    pub fn all(promises: Vec<Promise<T, E>>) -> Promise<String, E> {
        Promise::new(move |producer| {
            if promises.is_empty() {
                producer.resolve(ALL_PROMISES_SUCCESS.to_owned());
                return;
            }
            let remaining = Arc::new(AtomicUsize::new(promises.len()));
            for promise in promises {
                let remaining = remaining.clone();
                let on_fulfilled = producer.clone();
                let on_rejected = producer.clone();
                let _chain = promise
                    .then(move |_value| {
                        let left = remaining.fetch_sub(1, Ordering::SeqCst) - 1;
                        log::trace!("aggregate child fulfilled, {left} left");
                        if left == 0 {
                            on_fulfilled.resolve(ALL_PROMISES_SUCCESS.to_owned());
                        }
                        Step::Done
                    })
                    .catch(move |error| {
                        // First failure wins; a settled aggregate
                        // ignores the rest.
                        on_rejected.reject(error);
                    });
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::ALL_PROMISES_SUCCESS;
    use crate::{Error, Promise, Step};
    use std::sync::mpsc::channel;
    use std::thread;
    use std::time::Duration;

    fn delayed_resolve(value: i32, delay_ms: u64) -> Promise<i32, String> {
        Promise::new(move |producer| {
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(delay_ms));
                producer.resolve(value);
            });
        })
    }

    fn delayed_reject(error: &str, delay_ms: u64) -> Promise<i32, String> {
        let error = error.to_owned();
        Promise::new(move |producer| {
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(delay_ms));
                producer.reject(error);
            });
        })
    }

    #[test]
    fn test_all_fulfills_with_sentinel() {
        let all = Promise::all(vec![delayed_resolve(1, 10), delayed_resolve(2, 30)]);
        assert_eq!(all.await_promise(), Ok(ALL_PROMISES_SUCCESS.to_owned()));
    }

    #[test]
    fn test_all_rejects_with_first_error() {
        let all = Promise::all(vec![
            delayed_resolve(1, 10),
            delayed_resolve(2, 20),
            delayed_reject("boom", 30),
        ]);
        assert_eq!(all.await_promise(), Err(Error::Rejected("boom".to_owned())));
    }

    #[test]
    fn test_all_success_path_never_runs_after_rejection() {
        // The rejecting child settles first; the fulfilled child is
        // observed afterwards but the aggregate stays rejected.
        let (tx, rx) = channel();
        let all = Promise::all(vec![delayed_reject("early", 5), delayed_resolve(1, 30)]);
        let _chain = all
            .then(move |sentinel| {
                tx.send(sentinel).unwrap();
                Step::Done
            })
            .catch(|_error| {});
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    }

    #[test]
    fn test_all_empty_input_fulfills_immediately() {
        let all = Promise::all(Vec::<Promise<i32, String>>::new());
        assert_eq!(all.await_promise(), Ok(ALL_PROMISES_SUCCESS.to_owned()));
    }
}
