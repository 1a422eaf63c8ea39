//! Runs a batch of slow tasks on the global pool and shows them interleave.
//!
//! ```text
//! cargo run --example pool_demo -- 6 3
//! ```

use alarm_pool::prelude::*;
use clap::builder::RangedU64ValueParser;
use clap::Parser;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(about = "Demonstrates the worker pool with sleeping tasks")]
struct Args {
    /// Number of tasks to submit
    #[arg(default_value_t = 1, value_parser = at_least_one())]
    tasks: usize,

    /// Number of worker threads
    #[arg(default_value_t = 1, value_parser = at_least_one())]
    threads: usize,

    /// Ticks each task prints before finishing
    #[arg(long, default_value_t = 5)]
    ticks: u32,
}

fn compute(no: usize, ticks: u32) {
    let indent = " ".repeat(no * 2);

    println!("{indent}Task {no} starting");
    for _ in 0..ticks {
        thread::sleep(Duration::from_secs(1));
        println!("{indent}|");
    }
    println!("{indent}Task {no} ending");
}

fn at_least_one() -> RangedU64ValueParser<usize> {
    RangedU64ValueParser::new().range(1..)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    println!(
        "------ Running demo with {} tasks and {} threads ----\n",
        args.tasks, args.threads
    );

    alarm_pool::init(args.threads);

    let ticks = args.ticks;
    let tasks: Vec<_> = (1..=args.tasks)
        .map(|no| {
            let task = Task::new(no, move |no| compute(no, ticks));
            alarm_pool::submit(&task);
            task
        })
        .collect();

    for task in &tasks {
        task.wait();
    }
    println!("\n---------- All tasks completed ----------");

    for task in tasks {
        task.dismiss();
    }
}
