use promissory::{all_of, any_of, pair};
use std::thread;
use std::time::Duration;

fn main() {
    // Race two workers, keep whichever answers first.
    let (p1, f1) = pair::<&'static str>();
    let (p2, f2) = pair::<&'static str>();
    let first = any_of(vec![f1, f2]);

    thread::spawn(move || {
        thread::sleep(Duration::from_millis(150));
        p1.set_value("slow worker").ok();
    });
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        p2.set_value("fast worker").ok();
    });

    first.wait();
    {
        let guard = first.get_try().unwrap();
        let won = guard.as_value().unwrap();
        println!("input {} won the race: {:?}", won.0, won.1.as_value());
    }

    // Gather a whole batch, positions follow input order.
    let mut futures = Vec::new();
    for i in 0..4u64 {
        let (promise, future) = pair::<u64>();
        futures.push(future);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20 * (4 - i)));
            promise.set_value(i * i).ok();
        });
    }

    let all = all_of(futures);
    all.wait();
    let guard = all.get_try().unwrap();
    for (i, t) in guard.as_value().unwrap().iter().enumerate() {
        println!("input {i} produced {:?}", t.as_value());
    }
}
