//! # Demo: accounts
//!
//! Signs in to a batch of (simulated) accounts with at most three sessions at a
//! time. Some logins fail once and are retried, one never answers and hits the
//! per-task timeout. Ctrl-C stops the run: queued accounts are never launched,
//! in-flight sessions are given the stop grace to finish.
//!
//! ## Flow
//! ```text
//! Scheduler::start()
//!   ├─► acc-1..acc-3 launched (1s apart)
//!   ├─► acc-2 fails ─► Retrying ─► backoff 500ms ─► Running ─► Success
//!   ├─► acc-5 never answers ─► timeout ─► Retrying ─► timeout ─► Error
//!   └─► queue drained, all slots free ─► RunCompleted
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=batchvisor=debug cargo run --example accounts
//! ```

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use batchvisor::{
    AttemptContext, ExecutorError, ExecutorFn, JsonSource, LogSink, Scheduler, StatusFn,
    StatusSink, Task, TaskId, TaskStatus,
};
use tracing_subscriber::EnvFilter;

struct Account {
    email: String,
    flaky: bool,
    hangs: bool,
}

const CONFIG: &str = r#"{
    "maxConcurrency": 3,
    "interLaunchDelayMs": 1000,
    "timeoutSec": 3,
    "maxRetries": 1,
    "retryBackoffMs": 500,
    "stopGraceSec": 5
}"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("batchvisor=info")),
        )
        .init();

    // 1. The worker: one simulated login session per attempt.
    let failed_once = Arc::new(Mutex::new(HashSet::new()));
    let exec = ExecutorFn::new(move |acc: Arc<Account>, ctx: AttemptContext| {
        let failed_once = Arc::clone(&failed_once);
        async move {
            ctx.report(format!("opening session for {}", acc.email));
            if acc.hangs {
                ctx.cancelled().await;
                return Err(ExecutorError::Cancelled);
            }

            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(800)) => {}
                _ = ctx.cancelled() => return Err(ExecutorError::Cancelled),
            }

            let first_failure = acc.flaky
                && failed_once
                    .lock()
                    .map(|mut seen| seen.insert(ctx.task().clone()))
                    .unwrap_or(false);
            if first_failure {
                return Err(ExecutorError::failed("captcha shown"));
            }
            ctx.report("collecting balance");
            Ok(acc.email.len() * 100)
        }
    });

    // 2. A "grid" that prints every status change.
    let grid: Arc<dyn StatusSink> =
        StatusFn::arc("grid", |task: &TaskId, status: TaskStatus, msg: &str| {
            println!("| {task:<6} | {:<8} | {msg}", status.as_label());
        });

    // 3. Scheduler with the grid and the tracing sink.
    let scheduler = Scheduler::builder(exec)
        .with_sink(grid)
        .with_sink(Arc::new(LogSink::new()))
        .build();

    // 4. Work set.
    let tasks = (1..=7)
        .map(|n| {
            Task::new(
                format!("acc-{n}"),
                Account {
                    email: format!("user{n}@example.com"),
                    flaky: n % 2 == 0,
                    hangs: n == 5,
                },
            )
        })
        .collect();

    // 5. Start, stop on Ctrl-C, wait.
    let run = scheduler.start(&JsonSource::inline(CONFIG), tasks)?;
    run.stop_on_signal();

    let report = run.join_within(Duration::from_secs(120)).await?;
    println!(
        "\n{:?}: {} success, {} error, {} stopped (peak {} concurrent, {:?})",
        report.outcome,
        report.count(TaskStatus::Success),
        report.count(TaskStatus::Error),
        report.count(TaskStatus::Stopped),
        report.peak_concurrency,
        report.elapsed,
    );
    for task in report.tasks.iter().filter(|t| t.output.is_some()) {
        println!("{}: balance {:?}", task.id, task.output);
    }
    Ok(())
}
