use promissory::{pair, Executor, InlineExecutor, QueueExecutor, ThreadExecutor};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

//The executor receives exactly one task; running it invokes the continuation.
#[test]
fn test() {
    let ex = Arc::new(QueueExecutor::new());
    let (promise, future) = pair::<i32>();
    future.set_executor(Arc::clone(&ex) as Arc<dyn Executor>);

    let (tx, rx) = mpsc::channel();
    future
        .then_run(move |t| {
            tx.send(t.unwrap()).unwrap();
        })
        .unwrap();
    promise.set_value(99).unwrap();

    assert!(rx.try_recv().is_err());
    assert_eq!(ex.len(), 1);
    assert_eq!(ex.run_all(), 1);
    assert_eq!(rx.try_recv().unwrap(), 99);
    assert!(ex.is_empty());
}

//Both handles may be gone before the executor gets around to the task: the
//task owns everything it needs.
#[test]
fn test2() {
    let ex = Arc::new(QueueExecutor::new());
    let (promise, future) = pair::<String>();
    future.set_executor(Arc::clone(&ex) as Arc<dyn Executor>);

    let (tx, rx) = mpsc::channel();
    future
        .then_run(move |t| {
            tx.send(t.unwrap()).unwrap();
        })
        .unwrap();
    promise.set_value("late delivery".to_string()).unwrap();
    drop(promise);
    drop(future);

    assert_eq!(ex.run_all(), 1);
    assert_eq!(rx.recv().unwrap(), "late delivery");
}

#[test]
fn test3() {
    let (promise, future) = pair::<i32>();
    future.set_executor(Arc::new(ThreadExecutor));

    let (tx, rx) = mpsc::channel();
    let registering = thread::current().id();
    future
        .then_run(move |t| {
            tx.send((t.unwrap(), thread::current().id())).unwrap();
        })
        .unwrap();
    promise.set_value(1).unwrap();

    let (value, ran_on) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(value, 1);
    assert_ne!(ran_on, registering);
}

#[test]
fn test4() {
    let (promise, future) = pair::<i32>();
    future.set_executor(Arc::new(InlineExecutor));

    let (tx, rx) = mpsc::channel();
    future
        .then_run(move |t| {
            tx.send(t.unwrap()).unwrap();
        })
        .unwrap();
    promise.set_value(3).unwrap();

    //InlineExecutor ran the task during set_value.
    assert_eq!(rx.try_recv().unwrap(), 3);
}
