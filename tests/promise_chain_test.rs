#[cfg(test)]
mod tests {
    use promise_chain::{Error, Promise, Step};
    use std::sync::mpsc::channel;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn test_await_blocks_until_threaded_resolve() {
        let promise = Promise::<i32, String>::new(|producer| {
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(100));
                producer.resolve(42);
            });
        });
        let started = Instant::now();
        assert_eq!(promise.await_promise(), Ok(42));
        assert!(started.elapsed() >= Duration::from_millis(100));
    }

    #[test]
    fn test_await_returns_rejection_error() {
        let promise = Promise::<i32, String>::new(|producer| {
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                producer.reject("failed".to_owned());
            });
        });
        assert_eq!(
            promise.await_promise(),
            Err(Error::Rejected("failed".to_owned()))
        );
    }

    #[test]
    fn test_await_timeout_expires_before_settlement() {
        let promise = Promise::<i32, String>::new(|producer| {
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(500));
                producer.resolve(1);
            });
        });
        assert_eq!(
            promise.await_timeout(Duration::from_millis(50)),
            Err(Error::TimedOut)
        );
    }

    #[test]
    fn test_chained_steps_deliver_in_registration_order() {
        let (tx, rx) = channel();
        let tx1 = tx.clone();
        let _chain = Promise::<i32, String>::new(|producer| {
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                producer.resolve(1);
            });
        })
        .then(move |value| {
            tx1.send(value).unwrap();
            Step::Promise(Promise::new(|producer| {
                thread::spawn(move || {
                    thread::sleep(Duration::from_millis(10));
                    producer.resolve(2);
                });
            }))
        })
        .then(move |value| {
            tx.send(value).unwrap();
            Step::Done
        });
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 1);
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 2);
    }
}
