use promissory::pair;
use std::thread;
use std::time::Duration;

#[test]
fn test() {
    let (promise, future) = pair::<i32>();
    assert!(!future.ready());
    assert!(!promise.ready());
    promise.set_value(5).unwrap();
    assert!(future.ready());
    assert!(promise.ready());
    let guard = future.get_try().unwrap();
    assert_eq!(guard.as_value(), Some(&5));
}

#[test]
fn test2() {
    let (promise, future) = pair::<String>();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        promise.set_value("done".to_string()).unwrap();
    });
    assert!(future.wait_timeout(Duration::from_secs(5)));
    assert_eq!(
        future.get_try().unwrap().as_value(),
        Some(&"done".to_string())
    );
}

#[test]
fn test3() {
    let (promise, future) = pair::<u64>();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        promise.set_value(7).unwrap();
    });
    future.wait();
    assert!(future.ready());
}

#[test]
fn test4() {
    let (_promise, future) = pair::<i32>();
    //Zero timeout never blocks, it just reports readiness.
    assert!(!future.wait_timeout(Duration::ZERO));
    assert!(!future.wait_timeout(Duration::from_millis(20)));
}

#[test]
fn test5() {
    use promissory::{Future, Try};

    let future = Future::completed(Try::Value(11));
    assert!(future.ready());
    assert_eq!(future.get_try().unwrap().as_value(), Some(&11));

    let t = Try::Value(3).map(|v| v + 1);
    assert!(t.has_value());
    assert!(!t.has_error());
    assert_eq!(t.into_result().ok(), Some(4));
}
