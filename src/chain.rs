//! Root-owned state of a `then` chain.

use std::collections::VecDeque;

use crate::promise::Step;

/// A queued success continuation: receives the previous link's value and
/// says how the chain continues.
pub(crate) type Continuation<T, E> = Box<dyn FnOnce(T) -> Step<T, E> + Send>;

pub(crate) type CatchHandler<E> = Box<dyn FnOnce(E) + Send>;

/// Everything the chain root tracks, behind one mutex.
///
/// The queue and its bookkeeping are only touched while that mutex is
/// held; continuations and the failure handler run after release.
pub(crate) struct ChainState<T, E> {
    queue: VecDeque<Continuation<T, E>>,
    /// Continuations dispatched so far.
    index: usize,
    /// The root executor has been started.
    pub(crate) started: bool,
    /// A link is currently running or waiting on its produced promise.
    pub(crate) outstanding: bool,
    /// Value produced by a link that settled synchronously, kept for a
    /// continuation attached after the fact.
    cached: Option<T>,
    /// Rejection latch: once set, success continuations never run again.
    pub(crate) rejected: bool,
    /// A rejection that arrived before any handler was registered.
    pending_error: Option<E>,
    on_rejected: Option<CatchHandler<E>>,
}

impl<T, E> ChainState<T, E> {
    pub(crate) fn new() -> Self {
        ChainState {
            queue: VecDeque::new(),
            index: 0,
            started: false,
            outstanding: false,
            cached: None,
            rejected: false,
            pending_error: None,
            on_rejected: None,
        }
    }

    pub(crate) fn enqueue(&mut self, continuation: Continuation<T, E>) {
        self.queue.push_back(continuation);
    }

    /// Pops the next continuation and advances the dispatch index.
    /// Exhaustion is the normal end of a chain, not an error.
    pub(crate) fn dequeue_next(&mut self) -> Option<(usize, Continuation<T, E>)> {
        let continuation = self.queue.pop_front()?;
        self.index += 1;
        Some((self.index, continuation))
    }

    pub(crate) fn cache(&mut self, value: T) {
        self.cached = Some(value);
    }

    pub(crate) fn take_cached(&mut self) -> Option<T> {
        self.cached.take()
    }

    /// Latches the rejection, discards every queued continuation and
    /// hands back the failure handler if one is registered; otherwise
    /// the error is parked for a handler registered later.
    pub(crate) fn reject(&mut self, error: E) -> Option<(CatchHandler<E>, E)> {
        let skipped = self.queue.len();
        if skipped > 0 {
            log::debug!("rejection skipped {skipped} queued continuation(s)");
        }
        self.queue.clear();
        self.rejected = true;
        self.outstanding = false;
        self.cached = None;
        match self.on_rejected.take() {
            Some(handler) => Some((handler, error)),
            None => {
                self.pending_error = Some(error);
                None
            }
        }
    }

    /// Registers the failure handler, or hands it straight back together
    /// with a rejection that already arrived.
    pub(crate) fn register_catch(
        &mut self,
        handler: CatchHandler<E>,
    ) -> Option<(CatchHandler<E>, E)> {
        match self.pending_error.take() {
            Some(error) => Some((handler, error)),
            None => {
                self.on_rejected = Some(handler);
                None
            }
        }
    }
}
