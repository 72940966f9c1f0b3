use promissory::{pair, BrokenPromise};
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering::SeqCst;
use std::sync::mpsc;
use std::sync::Arc;

//Producer drops without publishing: the continuation observes BrokenPromise.
#[test]
fn test() {
    let (promise, future) = pair::<i32>();
    let (tx, rx) = mpsc::channel();
    future
        .then_run(move |t| {
            let failure = t.err().expect("expected a failure");
            let matched =
                failure.is::<BrokenPromise>() && failure.downcast_ref::<BrokenPromise>().is_some();
            tx.send(matched).unwrap();
        })
        .unwrap();

    drop(promise);
    //Delivered inline on the dropping thread.
    assert!(rx.try_recv().unwrap());
}

struct Payload(Arc<AtomicBool>);

impl Drop for Payload {
    fn drop(&mut self) {
        self.0.store(true, SeqCst);
    }
}

//Consumer drops without registering: no user continuation runs, the published
//value is still consumed and released.
#[test]
fn test2() {
    let released = Arc::new(AtomicBool::new(false));
    let (promise, future) = pair::<Payload>();
    assert!(promise.set_value(Payload(Arc::clone(&released))).is_ok());
    assert!(!released.load(SeqCst));

    drop(future);
    assert!(released.load(SeqCst));
    drop(promise);
}
