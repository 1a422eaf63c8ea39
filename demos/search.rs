//! Counts pattern occurrences in a text file, once with a single task and
//! once split across many tasks, and reports the speedup.
//!
//! ```text
//! cargo run --release --example search -- text.txt needle 16 4 results.csv
//! ```

use alarm_pool::prelude::*;
use clap::builder::RangedU64ValueParser;
use clap::Parser;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

const MAX_SIZE: u64 = 10 * 1024 * 1024;
const WARMUPS: usize = 2;
const RUNS: usize = 5;

#[derive(Debug, Parser)]
#[command(about = "Parallel pattern search on the worker pool")]
struct Args {
    /// Text file to search
    text_file: PathBuf,

    /// Pattern to count
    pattern: String,

    /// Number of tasks for the split search
    #[arg(default_value_t = 1, value_parser = at_least_one())]
    tasks: usize,

    /// Number of worker threads
    #[arg(default_value_t = 1, value_parser = at_least_one())]
    threads: usize,

    /// CSV file the timings are appended to
    data_file: Option<PathBuf>,
}

struct Corpus {
    text: Vec<u8>,
    pattern: Vec<u8>,
}

impl Corpus {
    /// Occurrences starting in `[from, to)`. Compares every byte on purpose
    /// so each task does a predictable amount of work.
    fn search(&self, from: usize, to: usize) -> usize {
        let plen = self.pattern.len();
        if plen > self.text.len() {
            return 0;
        }
        let last = self.text.len().saturating_sub(plen);

        (from..to.min(last + 1))
            .filter(|&i| {
                let mut found = true;
                for j in 0..plen {
                    if self.text[i + j] != self.pattern[j] {
                        found = false;
                    }
                }
                found
            })
            .count()
    }
}

fn read_text(path: &Path) -> Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut text = Vec::new();
    file.take(MAX_SIZE).read_to_end(&mut text)?;

    if text.len() as u64 == MAX_SIZE {
        tracing::warn!(file = %path.display(), "text truncated to {} bytes", MAX_SIZE);
    }
    Ok(text)
}

fn intervals(len: usize, tasks: usize) -> Vec<(usize, usize)> {
    let chunk = len.div_ceil(tasks.max(1)).max(1);
    (0..len)
        .step_by(chunk)
        .map(|from| (from, (from + chunk).min(len)))
        .collect()
}

fn timed_search(corpus: &Arc<Corpus>, tasks: usize) -> (usize, u128) {
    let start = Instant::now();

    let handles: Vec<_> = intervals(corpus.text.len(), tasks)
        .into_iter()
        .map(|interval| {
            let corpus = corpus.clone();
            let task = Task::new(interval, move |(from, to)| corpus.search(from, to));
            alarm_pool::submit(&task);
            task
        })
        .collect();

    for task in &handles {
        task.wait();
    }

    let mut total = 0;
    for task in handles {
        total += task.take_result().unwrap_or_else(|e| {
            tracing::error!(error = %e, "search task failed");
            0
        });
        task.dismiss();
    }

    (total, start.elapsed().as_micros())
}

fn at_least_one() -> RangedU64ValueParser<usize> {
    RangedU64ValueParser::new().range(1..)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let corpus = Arc::new(Corpus {
        text: read_text(&args.text_file)?,
        pattern: args.pattern.clone().into_bytes(),
    });

    println!(
        "Running search with: \n  file = {}, file length = {}\n  pattern = '{}', pattern length = {}\n  tasks = {}, threads = {}",
        args.text_file.display(),
        corpus.text.len(),
        args.pattern,
        corpus.pattern.len(),
        args.tasks,
        args.threads
    );
    if let Some(data_file) = &args.data_file {
        println!("  Data file = {}", data_file.display());
    }
    println!();

    alarm_pool::init(args.threads);

    let mut total_warmup = 0;
    for k in 0..WARMUPS {
        let (found, us) = timed_search(&corpus, 1);
        println!("Warmup run no. {k} using single task. Occurences = {found}, time = {us} [us]");
        total_warmup += us;
    }
    println!(
        "Average of warmup runs: {:.1} [us]\n",
        total_warmup as f64 / WARMUPS as f64
    );

    let mut total_single = 0;
    let mut result_single = 0;
    for k in 0..RUNS {
        let (found, us) = timed_search(&corpus, 1);
        println!("Regular run no. {k} using single task. Occurences = {found}, time = {us} [us]");
        total_single += us;
        result_single = found;
    }
    let avg_single = total_single as f64 / RUNS as f64;
    println!("Average of regular single task runs: {avg_single:.1} [us]\n");

    let mut total_multiple = 0;
    let mut result_multiple = 0;
    for k in 0..RUNS {
        let (found, us) = timed_search(&corpus, args.tasks);
        println!(
            "Proper run no. {k} using {} tasks. Occurences = {found}, time = {us} [us]",
            args.tasks
        );
        total_multiple += us;
        result_multiple = found;
    }
    let avg_multiple = total_multiple as f64 / RUNS as f64;
    println!("Average of multiple task runs: {avg_multiple:.1} [us]\n");

    let speedup = avg_single / avg_multiple.max(1.0);
    println!("  Speedup = {speedup:.6}\n");

    if result_single != result_multiple {
        tracing::warn!(
            single = result_single,
            multiple = result_multiple,
            "results differ"
        );
        return Ok(());
    }

    if let Some(path) = &args.data_file {
        let mut data = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(
            data,
            "{}, {}, {:.1}, {:.1}, {:.6}",
            args.tasks, args.threads, avg_single, avg_multiple, speedup
        )?;
        println!("\nSearch data written to {}", path.display());
    }

    Ok(())
}
