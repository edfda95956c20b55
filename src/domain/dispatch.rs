//! Bounded worker pool with a task/result channel pair.
//!
//! Every task becomes one job on a dedicated `rayon` pool. Jobs push their
//! result onto an `mpsc` channel tagged with the task's sequence number, and
//! the caller drains exactly as many results as it enqueued tasks before
//! returning. A job that panics still reports back, so the drain never waits
//! on a result that cannot arrive.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;

/// Outcome of one unit of work: its value, or the panic message if it died.
#[derive(Debug)]
pub struct Completed<R> {
    pub seq: usize,
    pub result: Result<R, String>,
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct PoolError(String);

/// Number of workers to use when the caller asks for `requested` (0 = auto).
pub fn resolve_workers(requested: usize) -> usize {
    if requested > 0 {
        return requested;
    }
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Runs `work` over every task on `workers` threads and returns one
/// `Completed` per task, ordered by task sequence.
pub fn dispatch<T, R, F>(tasks: Vec<T>, workers: usize, work: F) -> Result<Vec<Completed<R>>, PoolError>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync,
{
    let expected = tasks.len();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(resolve_workers(workers))
        .thread_name(|i| format!("scan-worker-{i}"))
        .build()
        .map_err(|e| PoolError(e.to_string()))?;

    let (tx, rx) = mpsc::channel::<Completed<R>>();
    let mut completed = Vec::with_capacity(expected);

    pool.in_place_scope(|scope| {
        for (seq, task) in tasks.into_iter().enumerate() {
            let tx = tx.clone();
            let work = &work;
            scope.spawn(move |_| {
                let result = panic::catch_unwind(AssertUnwindSafe(|| work(task)))
                    .map_err(|payload| panic_message(payload.as_ref()));
                // The receiver outlives the scope, so a send failure is impossible.
                let _ = tx.send(Completed { seq, result });
            });
        }
        drop(tx);

        while completed.len() < expected {
            match rx.recv() {
                Ok(done) => completed.push(done),
                Err(_) => break,
            }
        }
    });

    if completed.len() != expected {
        return Err(PoolError(format!(
            "expected {} results, received {}",
            expected,
            completed.len()
        )));
    }

    completed.sort_by_key(|c| c.seq);
    Ok(completed)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
