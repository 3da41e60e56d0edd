#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use promise_then::{Error, ErrorKind, MainQueue, Promise, Status, WorkerQueue};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc::channel;
    use std::sync::{Arc, Barrier};
    use std::{thread, time::Duration};

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    #[test]
    fn then_adds_one() {
        let p = Promise::<i32>::new();
        let d = p.then(|v| Ok(v + 1));
        p.resolve(41);
        assert_eq!(d.value(), Some(42));
    }

    #[test]
    fn rejection_skips_then_handler() {
        let called = Arc::new(AtomicUsize::new(0));
        let c = called.clone();
        let p = Promise::<i32>::new();
        let d = p.then(move |v| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(v + 1)
        });
        let root = Error::new("E").with_cause(std::io::Error::new(std::io::ErrorKind::Other, "root"));
        p.reject(root.clone());
        assert_eq!(called.load(Ordering::SeqCst), 0);
        assert!(d.reason().unwrap().same_as(&root));
    }

    #[test]
    fn failing_handler_rejects_derived() {
        let p = Promise::<i32>::new();
        let d = p.then(|_| -> Result<i32, Error> { Err(Error::handler("F").with_code(3)) });
        p.resolve(1);
        let err = d.reason().unwrap();
        assert_eq!((err.kind(), err.code(), err.message()), (ErrorKind::Handler, 3, "F"));
    }

    #[test]
    fn cause_chain_survives_a_long_chain() {
        let p = Promise::<u8>::new();
        let seen = Arc::new(parking_lot::Mutex::new(None));
        let s = seen.clone();
        let tail = p
            .then(|v| Ok(v as u32))
            .done(|_| {})
            .then(|v| Ok(v.to_string()))
            .error(move |e| *s.lock() = Some(e.clone()));
        let root = Error::new("io").with_cause(Error::new("disk"));
        p.reject(root.clone());
        assert!(seen.lock().as_ref().unwrap().same_as(&root));
        assert!(tail.reason().unwrap().same_as(&root));
    }

    #[test]
    fn value_passes_through_error_observer() {
        let p = Promise::<&'static str>::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let d = p.error(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        p.resolve("v");
        assert_eq!(d.value(), Some("v"));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn done_and_error_observe_without_changing_the_outcome() {
        let p = Promise::<i32>::new();
        let (tx, rx) = channel();
        let d = p.done(move |v| tx.send(*v).unwrap());
        p.resolve(5);
        assert_eq!(rx.try_recv(), Ok(5));
        assert_eq!(d.value(), Some(5));

        let p = Promise::<i32>::new();
        let (tx, rx) = channel();
        let d = p.error(move |e| tx.send(e.message().to_owned()).unwrap());
        p.reject(Error::new("bad"));
        assert_eq!(rx.try_recv().as_deref(), Ok("bad"));
        assert_eq!(d.reason(), Some(Error::new("bad")));
    }

    #[test]
    fn flattening_adopts_the_inner_outcome() {
        let p = Promise::<i32>::new();
        let inner = Promise::<i32>::new();
        let handle = inner.clone();
        let d = p.and_then(move |_| Ok(handle));
        p.resolve(0);
        assert_eq!(d.status(), Status::Pending);
        inner.resolve(99);
        assert_eq!(d.value(), Some(99));

        let p = Promise::<i32>::new();
        let inner = Promise::<i32>::new();
        let handle = inner.clone();
        let d = p.and_then(move |_| Ok(handle));
        p.resolve(0);
        inner.reject(Error::new("inner"));
        assert_eq!(d.reason(), Some(Error::new("inner")));
    }

    #[test]
    fn flattening_an_already_settled_promise() {
        let p = Promise::resolved(2);
        let d = p.and_then(|v| Ok(Promise::resolved(v * 3)));
        assert_eq!(d.value(), Some(6));
    }

    #[test]
    fn late_attachment_sees_the_same_outcome() {
        let p = Promise::<i32>::new();
        let early = p.then(|v| Ok(v * 2));
        p.resolve(4);
        let late = p.then(|v| Ok(v * 2));
        assert_eq!(early.value(), late.value());
        assert_eq!(late.value(), Some(8));
    }

    #[test]
    fn second_settlement_is_discarded() {
        init_tracing();
        let p = Promise::<i32>::new();
        let (tx, rx) = channel();
        p.done(move |v| tx.send(*v).unwrap());
        assert!(p.resolve(1));
        assert!(!p.resolve(2));
        assert!(!p.reject(Error::new("late")));
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![1]);
        assert!(p.is_resolved());
        assert!(!p.is_rejected());
    }

    #[test]
    fn concurrent_settlers_settle_exactly_once() {
        init_tracing();
        for _ in 0..50 {
            let p = Promise::<usize>::new();
            let fired = Arc::new(AtomicUsize::new(0));
            let f = fired.clone();
            p.on_settled(move |_| {
                f.fetch_add(1, Ordering::SeqCst);
            });
            let barrier = Arc::new(Barrier::new(8));
            let wins = Arc::new(AtomicUsize::new(0));
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let p = p.clone();
                    let barrier = barrier.clone();
                    let wins = wins.clone();
                    thread::spawn(move || {
                        barrier.wait();
                        let won = if i % 2 == 0 {
                            p.resolve(i)
                        } else {
                            p.reject(Error::new(format!("thread {i}")))
                        };
                        if won {
                            wins.fetch_add(1, Ordering::SeqCst);
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().expect("settler thread panicked");
            }
            assert_eq!(wins.load(Ordering::SeqCst), 1);
            assert_eq!(fired.load(Ordering::SeqCst), 1);
            assert!(!p.is_pending());
        }
    }

    #[test]
    fn attaching_while_settling_never_loses_a_continuation() {
        for _ in 0..50 {
            let p = Promise::<u32>::new();
            let fired = Arc::new(AtomicUsize::new(0));
            let barrier = Arc::new(Barrier::new(2));
            let attacher = {
                let p = p.clone();
                let fired = fired.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..100 {
                        let fired = fired.clone();
                        p.done(move |_| {
                            fired.fetch_add(1, Ordering::SeqCst);
                        });
                    }
                })
            };
            barrier.wait();
            p.resolve(1);
            attacher.join().expect("attacher thread panicked");
            assert_eq!(fired.load(Ordering::SeqCst), 100);
        }
    }

    #[test]
    fn main_queue_runs_continuations_when_pumped() {
        let p = Promise::<i32>::new();
        let producer = p.clone();
        let main = MainQueue::shared();
        let (tx, rx) = channel();
        let d = p.on_main_queue().done(move |v| {
            tx.send((*v, thread::current().id())).unwrap();
        });
        thread::spawn(move || producer.resolve(10))
            .join()
            .expect("producer thread panicked");
        assert!(d.is_pending());
        main.run_until_idle();
        assert_eq!(rx.try_recv(), Ok((10, thread::current().id())));
        assert_eq!(d.value(), Some(10));
    }

    #[test]
    fn worker_queue_hand_off() {
        let queue = WorkerQueue::new("promise-worker");
        let p = Promise::<String>::new();
        let d = p.on_queue(&queue).then(|s| {
            let name = thread::current().name().map(str::to_owned).unwrap_or_default();
            Ok(format!("{s} on {name}"))
        });
        let producer = p.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.resolve("🍓".into());
        });
        assert_eq!(block_on(async { d.await }).unwrap(), "🍓 on promise-worker");
    }

    #[test]
    fn unresolved_promise_drops_cleanly() {
        let hits = Arc::new(AtomicUsize::new(0));
        {
            let p = Promise::<Vec<u8>>::new();
            let h = hits.clone();
            let _d = p.done(move |_| {
                h.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(Arc::strong_count(&hits), 1);
    }

    #[test]
    fn panicking_settled_handler_does_not_stop_later_continuations() {
        init_tracing();
        let p = Promise::<i32>::new();
        p.on_settled(|_| panic!("settled handler boom"));
        let d = p.then(|v| Ok(v + 1));
        let settled = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| p.resolve(1)));
        assert_eq!(settled.ok(), Some(true));
        assert_eq!(d.value(), Some(2));
    }

    #[test]
    fn worker_survives_a_panicking_continuation() {
        let queue = WorkerQueue::new("survivor");
        let p = Promise::<i32>::new();
        p.on_queue(&queue).on_settled(|_| panic!("worker continuation boom"));
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let d = p.on_queue(&queue).done(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        p.resolve(3);
        assert_eq!(block_on(async { d.await }), Ok(3));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn discarded_queue_rejects_its_continuations() {
        let main = MainQueue::new();
        let p = Promise::<i32>::new();
        let d = p.on_queue(&main).then(|v| Ok(v + 1));
        let observed = p.on_queue(&main).error(|_| {});
        let (tx, rx) = channel();
        p.on_queue(&main).on_settled(move |outcome| tx.send(outcome).unwrap());
        p.resolve(1);
        assert!(d.is_pending());
        drop(main);
        assert_eq!(d.reason().map(|e| e.kind()), Some(ErrorKind::ProducerDropped));
        assert_eq!(observed.reason().map(|e| e.kind()), Some(ErrorKind::ProducerDropped));
        let outcome = rx.try_recv().expect("settled handler should fire once");
        assert_eq!(outcome.map_err(|e| e.kind()), Err(ErrorKind::ProducerDropped));
    }

    #[test]
    fn panicking_error_observer_keeps_the_root_cause() {
        init_tracing();
        let p = Promise::<i32>::new();
        let seen = Arc::new(parking_lot::Mutex::new(None));
        let s = seen.clone();
        let tail = p
            .error(|_| panic!("observer boom"))
            .error(move |e| *s.lock() = Some(e.clone()));
        let root = Error::new("io").with_cause(Error::new("disk"));
        p.reject(root.clone());
        assert!(seen.lock().as_ref().unwrap().same_as(&root));
        assert!(tail.reason().unwrap().same_as(&root));
    }

    #[test]
    fn panicking_done_observer_keeps_the_value() {
        let p = Promise::<i32>::new();
        let d = p.done(|_| panic!("observer boom")).then(|v| Ok(v * 2));
        p.resolve(21);
        assert_eq!(d.value(), Some(42));
    }
}
