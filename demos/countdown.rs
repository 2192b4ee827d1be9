//! Prints a greeting one character per tick, then combines three delayed values.
//!
//! Run with `RUST_LOG=trace` to watch frames suspend and resume.

use cadence::{Runtime, Task, TaskError, sleep};
use std::io::Write;
use std::time::Duration;

const TICK: Duration = Duration::from_millis(100);

async fn wait_n(n: u32) -> u32 {
    println!("before wait {n}");
    sleep(TICK * n).await;
    println!("after wait {n}");
    n
}

async fn greet_then_sum() -> Result<u32, TaskError> {
    for c in "hello world\n".chars() {
        print!("{c}");
        let _ = std::io::stdout().flush();
        sleep(TICK).await;
    }

    println!("step 1");
    let w3 = Task::start(wait_n(3));
    println!("step 2");
    let w2 = Task::start(wait_n(2));
    println!("step 3");
    let w1 = Task::start(wait_n(1));
    println!("step 4");

    let r = w2.wait()?.await + w3.wait()?.await;
    println!("awaiting already computed task");

    Ok(w1.wait()?.await + r)
}

fn main() {
    env_logger::init();

    let mut rt = Runtime::new();
    let mut result = rt.start(greet_then_sum());
    rt.run();

    match result.get() {
        Ok(Ok(sum)) => println!("result: {sum}"),
        Ok(Err(err)) | Err(err) => eprintln!("error: {err}"),
    }
}
