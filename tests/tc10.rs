use promissory::{all_of_run, pair, BrokenPromise};
use std::sync::mpsc;

//The assembled vector goes straight to the continuation, positions intact,
//delivered inline by the final arrival.
#[test]
fn test() {
    let mut promises = Vec::new();
    let mut futures = Vec::new();
    for _ in 0..3 {
        let (p, f) = pair::<i32>();
        promises.push(p);
        futures.push(f);
    }

    let (tx, rx) = mpsc::channel();
    all_of_run(futures, move |collected| {
        let values: Vec<Option<i32>> = collected.into_iter().map(promissory::Try::ok).collect();
        tx.send(values).unwrap();
    });

    promises[2].set_value(30).unwrap();
    promises[0].set_value(10).unwrap();
    assert!(rx.try_recv().is_err());
    promises[1].set_value(20).unwrap();
    assert_eq!(
        rx.try_recv().unwrap(),
        vec![Some(10), Some(20), Some(30)]
    );
}

#[test]
fn test2() {
    let (tx, rx) = mpsc::channel();
    all_of_run(Vec::<promissory::Future<i32>>::new(), move |collected| {
        tx.send(collected.len()).unwrap();
    });
    assert_eq!(rx.try_recv().unwrap(), 0);
}

//An abandoned child shows up as a BrokenPromise failure in its slot.
#[test]
fn test3() {
    let (p1, f1) = pair::<i32>();
    let (p2, f2) = pair::<i32>();

    let (tx, rx) = mpsc::channel();
    all_of_run(vec![f1, f2], move |collected| {
        tx.send(collected).unwrap();
    });

    p1.set_value(1).unwrap();
    drop(p2);

    let collected = rx.try_recv().unwrap();
    assert_eq!(collected[0].as_value(), Some(&1));
    match &collected[1] {
        promissory::Try::Error(failure) => assert!(failure.is::<BrokenPromise>()),
        promissory::Try::Value(_) => panic!("expected the dropped child to fail"),
    }
}
