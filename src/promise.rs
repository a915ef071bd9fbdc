//! The settlement core: a promise holds its executor until a consumer
//! shows up, then reacts to the executor's one-time resolve or reject.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::chain::ChainState;
use crate::wait::WaitCell;
use crate::Error;

/// How a continuation carries the chain forward.
pub enum Step<T, E> {
    /// Continue immediately with an already-computed value.
    Value(T),
    /// Continue once this promise settles.
    Promise(Promise<T, E>),
    /// End of the chain.
    Done,
}

/// Settlement is terminal: no transition leaves a settled state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Pending,
    Fulfilled,
    Rejected,
}

type Executor<T, E> = Box<dyn FnOnce(Producer<T, E>) + Send>;
type Waiter<T, E> = Arc<WaitCell<Result<T, Error<E>>>>;

struct Core<T, E> {
    executor: Option<Executor<T, E>>,
    state: State,
    waiter: Option<Waiter<T, E>>,
    /// The chain this promise settles into. A promise returned from a
    /// continuation is re-pointed at the chain root before it starts.
    chain: Arc<Mutex<ChainState<T, E>>>,
}

/// Handle to a single eventual value of type `T` or a failure `E`.
///
/// The executor is stored at construction and only invoked once a
/// consumer shows up: the first [`then`](Promise::then) starts it, as
/// does [`await_promise`](Promise::await_promise). A promise supports
/// exactly one consumption mode, either callback chaining via
/// `then`/`catch` or blocking retrieval, never both on the same
/// instance.
pub struct Promise<T, E> {
    core: Arc<Mutex<Core<T, E>>>,
    chain: Arc<Mutex<ChainState<T, E>>>,
}

/// The settling half handed to the executor.
///
/// `resolve` and `reject` consume the handle; settlement is terminal and
/// a second attempt through a clone is a no-op. Dropping the last clone
/// of an unsettled producer wakes a blocked waiter with
/// [`Error::ProducerDropped`].
pub struct Producer<T, E> {
    shared: Arc<ProducerShared<T, E>>,
}

struct ProducerShared<T, E> {
    core: Arc<Mutex<Core<T, E>>>,
}

impl<T, E> Clone for Producer<T, E> {
    fn clone(&self) -> Self {
        Producer {
            shared: self.shared.clone(),
        }
    }
}

impl<T, E> Drop for ProducerShared<T, E> {
    /// An unsettled producer going away would strand a blocked waiter;
    /// wake it with an error instead.
    fn drop(&mut self) {
        let waiter = {
            let mut core = self.core.lock().unwrap();
            if core.state != State::Pending {
                return;
            }
            core.state = State::Rejected;
            core.waiter.take()
        };
        if let Some(waiter) = waiter {
            log::debug!("producer dropped before settling");
            waiter.signal(Err(Error::ProducerDropped));
        }
    }
}

impl<T, E> Producer<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Fulfills the promise. The first settlement wins; later calls
    /// through clones have no effect.
    ///
    /// # Examples
    ///
    /// ```
    /// use promise_chain::{Promise, Step};
    /// use std::sync::mpsc::channel;
    /// use std::thread;
    ///
    /// let (tx, rx) = channel();
    /// let promise = Promise::<String, ()>::new(|producer| {
    ///     thread::spawn(move || producer.resolve("🍓".to_owned()));
    /// });
    /// let _chain = promise.then(move |value| {
    ///     tx.send(value).unwrap();
    ///     Step::Done
    /// });
    /// assert_eq!(rx.recv().unwrap(), "🍓");
    /// ```
    pub fn resolve(self, value: T) {
        settle_fulfilled(&self.shared.core, value);
    }

    /// Rejects the promise. The first settlement wins; later calls
    /// through clones have no effect.
    pub fn reject(self, error: E) {
        settle_rejected(&self.shared.core, error);
    }
}

impl<T, E> Promise<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Stores `executor` without invoking it; execution starts with the
    /// first `then` or with a blocking await.
    pub fn new(executor: impl FnOnce(Producer<T, E>) + Send + 'static) -> Self {
        let chain = Arc::new(Mutex::new(ChainState::new()));
        let core = Arc::new(Mutex::new(Core {
            executor: Some(Box::new(executor)),
            state: State::Pending,
            waiter: None,
            chain: chain.clone(),
        }));
        Promise { core, chain }
    }

    /// A promise that fulfills with `value` as soon as it is consumed.
    pub fn resolved(value: T) -> Self {
        Promise::new(move |producer| producer.resolve(value))
    }

    /// A promise that rejects with `error` as soon as it is consumed.
    pub fn rejected(error: E) -> Self {
        Promise::new(move |producer| producer.reject(error))
    }

    /// Appends `continuation` to the chain and returns the chain handle
    /// for further chaining.
    ///
    /// The first appended continuation starts the executor. While a
    /// previous link is outstanding a new continuation only enqueues;
    /// it runs once that link's produced promise settles. If the chain
    /// is idle with a value already produced, the continuation runs
    /// immediately with that value.
    pub fn then(self, continuation: impl FnOnce(T) -> Step<T, E> + Send + 'static) -> Self {
        enum Dispatch<T> {
            Start,
            Run(T),
            Queued,
        }
        let dispatch = {
            let mut state = self.chain.lock().unwrap();
            state.enqueue(Box::new(continuation));
            if !state.started {
                state.started = true;
                state.outstanding = true;
                Dispatch::Start
            } else if !state.outstanding && !state.rejected {
                match state.take_cached() {
                    Some(value) => Dispatch::Run(value),
                    None => Dispatch::Queued,
                }
            } else {
                Dispatch::Queued
            }
        };
        match dispatch {
            Dispatch::Start => self.start(),
            Dispatch::Run(value) => drive(&self.chain, value),
            Dispatch::Queued => {}
        }
        self
    }

    /// Registers the failure handler for this chain; it fires at most
    /// once, with the first rejection that reaches it. A rejection that
    /// arrived before registration is delivered immediately.
    pub fn catch(self, handler: impl FnOnce(E) + Send + 'static) -> Self {
        let fire = self
            .chain
            .lock()
            .unwrap()
            .register_catch(Box::new(handler));
        if let Some((handler, error)) = fire {
            handler(error);
        }
        self
    }

    /// Starts the executor if needed and blocks the calling thread until
    /// the promise settles.
    ///
    /// The executor must not settle synchronously on the thread that
    /// blocks here, or the wait never ends.
    ///
    /// # Examples
    ///
    /// ```
    /// use promise_chain::Promise;
    /// use std::thread;
    /// use std::time::Duration;
    ///
    /// let promise = Promise::<i32, ()>::new(|producer| {
    ///     thread::spawn(move || {
    ///         thread::sleep(Duration::from_millis(10));
    ///         producer.resolve(42);
    ///     });
    /// });
    /// assert_eq!(promise.await_promise(), Ok(42));
    /// ```
    pub fn await_promise(self) -> Result<T, Error<E>> {
        let cell = self.install_waiter();
        self.start();
        cell.wait()
    }

    /// As [`await_promise`](Promise::await_promise), but gives up with
    /// [`Error::TimedOut`] once `timeout` passes.
    pub fn await_timeout(self, timeout: Duration) -> Result<T, Error<E>> {
        let cell = self.install_waiter();
        self.start();
        cell.wait_timeout(timeout).unwrap_or(Err(Error::TimedOut))
    }

    fn install_waiter(&self) -> Waiter<T, E> {
        let cell = Arc::new(WaitCell::new());
        self.core.lock().unwrap().waiter = Some(cell.clone());
        cell
    }

    /// Takes and invokes the executor; a no-op if it already ran.
    fn start(&self) {
        let executor = self.core.lock().unwrap().executor.take();
        if let Some(executor) = executor {
            executor(Producer {
                shared: Arc::new(ProducerShared {
                    core: self.core.clone(),
                }),
            });
        }
    }

    /// Re-points this promise at `chain` and starts it, so that its
    /// settlement dispatches that chain's next link.
    fn start_on(self, chain: &Arc<Mutex<ChainState<T, E>>>) {
        self.core.lock().unwrap().chain = chain.clone();
        self.start();
    }
}

impl<T, E> fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.core.try_lock() {
            Ok(core) => f.debug_struct("Promise").field("state", &core.state).finish(),
            Err(_) => f.write_str("Promise { <locked> }"),
        }
    }
}

fn settle_fulfilled<T, E>(core: &Arc<Mutex<Core<T, E>>>, value: T)
where
    T: Send + 'static,
    E: Send + 'static,
{
    let (waiter, chain) = {
        let mut core = core.lock().unwrap();
        if core.state != State::Pending {
            return;
        }
        core.state = State::Fulfilled;
        (core.waiter.take(), core.chain.clone())
    };
    if let Some(waiter) = waiter {
        log::trace!("fulfilled, waking blocked waiter");
        waiter.signal(Ok(value));
        return;
    }
    drive(&chain, value);
}

fn settle_rejected<T, E>(core: &Arc<Mutex<Core<T, E>>>, error: E)
where
    T: Send + 'static,
    E: Send + 'static,
{
    let (waiter, chain) = {
        let mut core = core.lock().unwrap();
        if core.state != State::Pending {
            return;
        }
        core.state = State::Rejected;
        (core.waiter.take(), core.chain.clone())
    };
    if let Some(waiter) = waiter {
        log::trace!("rejected, waking blocked waiter");
        waiter.signal(Err(Error::Rejected(error)));
        return;
    }
    let fired = chain.lock().unwrap().reject(error);
    if let Some((handler, error)) = fired {
        handler(error);
    }
}

/// Runs queued continuations with `value` until the chain goes idle or a
/// link hands back a promise that has to settle first.
fn drive<T, E>(chain: &Arc<Mutex<ChainState<T, E>>>, mut value: T)
where
    T: Send + 'static,
    E: Send + 'static,
{
    loop {
        let (index, continuation) = {
            let mut state = chain.lock().unwrap();
            if state.rejected {
                return;
            }
            match state.dequeue_next() {
                Some(next) => {
                    state.outstanding = true;
                    next
                }
                None => {
                    // Chain complete; keep the value for a continuation
                    // attached later.
                    state.cache(value);
                    state.outstanding = false;
                    return;
                }
            }
        };
        log::trace!("dispatching continuation #{index}");
        match continuation(value) {
            Step::Value(next) => value = next,
            Step::Promise(promise) => {
                promise.start_on(chain);
                return;
            }
            Step::Done => {
                chain.lock().unwrap().outstanding = false;
                return;
            }
        }
    }
}
