use promissory::pair;
use std::sync::mpsc;
use std::thread;

//Callback registered first, result second: the continuation runs exactly once,
//with the published value, on the publishing thread.
#[test]
fn test() {
    let (promise, future) = pair::<i32>();
    let (tx, rx) = mpsc::channel();
    future
        .then_run(move |t| {
            tx.send((t.ok(), thread::current().id())).unwrap();
        })
        .unwrap();

    let setter = thread::spawn(move || {
        promise.set_value(42).unwrap();
        thread::current().id()
    });
    let setter_tid = setter.join().unwrap();

    let (value, ran_on) = rx.recv().unwrap();
    assert_eq!(value, Some(42));
    assert_eq!(ran_on, setter_tid);
    assert!(rx.try_recv().is_err());
}
