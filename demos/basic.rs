use promissory::pair;
use std::thread;
use std::time::Duration;

fn main() {
    let (promise, future) = pair::<String>();

    thread::spawn(move || {
        // Do some background task here
        thread::sleep(Duration::from_secs(1));
        //
        // eventually publish the result.
        promise.set_value(format!("The result is {}", 12345)).ok();
    });

    // Block the main thread until the producer publishes, then borrow the value.
    future.wait();
    println!("{}", future.get_try().unwrap().as_value().unwrap());
}
