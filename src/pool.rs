//! The worker pool: session-bound workers draining the shared queue.
//!
//! The coordinator establishes one checker per worker (all-or-nothing),
//! seeds the queue with every candidate plus one shutdown sentinel per
//! worker, runs the workers on scoped threads, and merges their private
//! result maps. Candidates are not partitioned ahead of time; allocation is
//! first-dequeue-wins, which load-balances naturally across workers with
//! uneven per-request latency.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::check::{CheckError, PlateCheck, Status};
use crate::queue::{Task, TaskQueue};
use crate::session::SessionError;

/// Mapping from candidate plate to its classification.
pub type ResultMap = HashMap<String, Status>;

/// Receiver of one event per classified candidate.
///
/// Purely observability; the pool's correctness does not depend on it. The
/// binary installs a colored console sink, tests capture events in memory.
pub trait ProgressSink: Sync {
    /// Called once per candidate, from the worker that classified it.
    /// Invocation order across workers is nondeterministic.
    fn plate_checked(&self, plate: &str, status: &Status);

    /// Called once after every worker's session is established, before any
    /// candidate is enqueued.
    fn workers_ready(&self, workers: usize) {
        let _ = workers;
    }
}

/// A [`ProgressSink`] that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl ProgressSink for Silent {
    fn plate_checked(&self, _plate: &str, _status: &Status) {}
}

/// What a worker does when a single check request fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Propagate the error, aborting the run. This is the reference
    /// behavior: one flaky request discards the whole pool.
    #[default]
    Abort,
    /// Record the candidate as [`Status::Error`] and keep consuming, so a
    /// long run survives transient failures.
    RecordAndContinue,
}

/// Errors surfaced by [`run_pool`].
#[derive(Debug)]
#[non_exhaustive]
pub enum PoolError {
    /// A worker could not establish its session; no work was started.
    Bootstrap {
        /// Index of the failed worker.
        worker: usize,
        /// The underlying bootstrap failure.
        source: SessionError,
    },
    /// A worker's check request failed under [`ErrorPolicy::Abort`].
    Check {
        /// Index of the failed worker.
        worker: usize,
        /// The candidate whose check failed.
        plate: String,
        /// The underlying request failure.
        source: CheckError,
    },
    /// Two workers reported the same candidate. The queue delivers each
    /// entry exactly once, so this means the input held a duplicate.
    DuplicatePlate(String),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bootstrap { worker, source } => {
                write!(f, "worker {worker} could not establish a session: {source}")
            }
            Self::Check {
                worker,
                plate,
                source,
            } => {
                write!(f, "worker {worker} failed while checking `{plate}`: {source}")
            }
            Self::DuplicatePlate(plate) => {
                write!(f, "duplicate candidate `{plate}` in merged results")
            }
        }
    }
}

impl std::error::Error for PoolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bootstrap { source, .. } => Some(source),
            Self::Check { source, .. } => Some(source),
            Self::DuplicatePlate(_) => None,
        }
    }
}

/// What a completed pool run produced.
#[derive(Debug)]
#[must_use]
pub struct PoolOutcome {
    /// One entry per input candidate.
    pub results: ResultMap,
    /// Wall-clock time spent seeding the queue and draining it, excluding
    /// session establishment.
    pub elapsed: Duration,
}

/// Run `workers` session-bound workers over `plates` and merge their results.
///
/// `factory` is invoked once per worker index, concurrently, to establish
/// that worker's checker; if any invocation fails the whole run aborts
/// before a single check request is issued. Each worker owns its checker
/// exclusively and drops it when its loop exits, on every exit path.
///
/// A `workers` value of zero is treated as one. On success the returned map
/// holds exactly one entry per distinct input candidate.
///
/// # Errors
///
/// [`PoolError::Bootstrap`] if any worker's establishment fails,
/// [`PoolError::Check`] if a check fails under [`ErrorPolicy::Abort`]
/// (sibling workers are cancelled and stop at their next dequeue), and
/// [`PoolError::DuplicatePlate`] if the merge detects a key collision.
pub fn run_pool<C, F, S>(
    workers: usize,
    plates: Vec<String>,
    factory: F,
    policy: ErrorPolicy,
    sink: &S,
) -> Result<PoolOutcome, PoolError>
where
    C: PlateCheck + Send,
    F: Fn(usize) -> Result<C, SessionError> + Sync,
    S: ProgressSink + ?Sized,
{
    let workers = workers.max(1);

    // establish every session before any work is queued; one failure
    // aborts the run with nothing checked
    let established: Vec<Result<C, SessionError>> = thread::scope(|s| {
        let handles: Vec<_> = (0..workers)
            .map(|id| {
                let factory = &factory;
                s.spawn(move || factory(id))
            })
            .collect();
        handles.into_iter().map(join_propagating).collect()
    });

    let mut checkers = Vec::with_capacity(workers);
    for (worker, result) in established.into_iter().enumerate() {
        match result {
            Ok(checker) => checkers.push(checker),
            Err(source) => return Err(PoolError::Bootstrap { worker, source }),
        }
    }

    sink.workers_ready(workers);

    let started = Instant::now();

    // seed fully before the workers start: C candidates, then exactly one
    // sentinel per worker, so no dequeue can block forever
    let candidates = plates.len();
    let queue = TaskQueue::new();
    for plate in plates {
        queue.enqueue(Task::Check(plate));
    }
    for _ in 0..workers {
        queue.enqueue(Task::Shutdown);
    }

    let cancel = AtomicBool::new(false);
    let finished: Vec<Result<ResultMap, PoolError>> = thread::scope(|s| {
        let handles: Vec<_> = checkers
            .into_iter()
            .enumerate()
            .map(|(id, checker)| {
                let queue = &queue;
                let cancel = &cancel;
                s.spawn(move || worker_loop(id, checker, queue, policy, sink, cancel))
            })
            .collect();
        handles.into_iter().map(join_propagating).collect()
    });

    let elapsed = started.elapsed();

    let mut partials = Vec::with_capacity(workers);
    for result in finished {
        partials.push(result?);
    }

    debug_assert!(queue.is_empty(), "queue drained on successful completion");
    debug_assert_eq!(queue.processed(), candidates + workers);

    let results = merge_results(partials)?;
    Ok(PoolOutcome { results, elapsed })
}

/// One worker's consume loop: dequeue until the sentinel arrives, checking
/// each candidate over the exclusively-owned checker.
fn worker_loop<C, S>(
    id: usize,
    mut checker: C,
    queue: &TaskQueue,
    policy: ErrorPolicy,
    sink: &S,
    cancel: &AtomicBool,
) -> Result<ResultMap, PoolError>
where
    C: PlateCheck,
    S: ProgressSink + ?Sized,
{
    let mut results = ResultMap::new();
    loop {
        match queue.dequeue() {
            Task::Shutdown => {
                queue.mark_processed();
                break;
            }
            Task::Check(plate) => {
                // a sibling already aborted the run; drain without checking
                if cancel.load(Ordering::Relaxed) {
                    queue.mark_processed();
                    continue;
                }
                match checker.check(&plate) {
                    Ok(status) => {
                        sink.plate_checked(&plate, &status);
                        results.insert(plate, status);
                    }
                    Err(source) => match policy {
                        ErrorPolicy::Abort => {
                            queue.mark_processed();
                            cancel.store(true, Ordering::Relaxed);
                            return Err(PoolError::Check {
                                worker: id,
                                plate,
                                source,
                            });
                        }
                        ErrorPolicy::RecordAndContinue => {
                            sink.plate_checked(&plate, &Status::Error);
                            results.insert(plate, Status::Error);
                        }
                    },
                }
                queue.mark_processed();
            }
        }
    }
    Ok(results)
}

/// Merge per-worker result maps into the global map.
///
/// The queue partitions candidates with no duplication, so the inputs' key
/// sets are disjoint and the merge is order-independent. A collision means
/// that precondition was violated upstream and is reported as
/// [`PoolError::DuplicatePlate`] rather than resolved by overwriting.
///
/// # Errors
///
/// [`PoolError::DuplicatePlate`] on the first key present in two maps.
pub fn merge_results(parts: Vec<ResultMap>) -> Result<ResultMap, PoolError> {
    let total = parts.iter().map(HashMap::len).sum();
    let mut merged = ResultMap::with_capacity(total);
    for part in parts {
        for (plate, status) in part {
            if merged.contains_key(&plate) {
                return Err(PoolError::DuplicatePlate(plate));
            }
            merged.insert(plate, status);
        }
    }
    Ok(merged)
}

fn join_propagating<T>(handle: thread::ScopedJoinHandle<'_, T>) -> T {
    match handle.join() {
        Ok(value) => value,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AllAvailable;

    impl PlateCheck for AllAvailable {
        fn check(&mut self, _plate: &str) -> Result<Status, CheckError> {
            Ok(Status::Available)
        }
    }

    #[test]
    fn zero_workers_is_treated_as_one() {
        let outcome = run_pool(
            0,
            vec!["cat".to_string()],
            |_| Ok(AllAvailable),
            ErrorPolicy::Abort,
            &Silent,
        )
        .unwrap();
        assert_eq!(outcome.results.len(), 1);
    }

    #[test]
    fn merge_of_disjoint_maps_is_union() {
        let mut a = ResultMap::new();
        a.insert("cat".into(), Status::Available);
        let mut b = ResultMap::new();
        b.insert("dog".into(), Status::Unavailable);

        let merged = merge_results(vec![a, b]).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged["cat"], Status::Available);
        assert_eq!(merged["dog"], Status::Unavailable);
    }

    #[test]
    fn merge_collision_is_a_defect() {
        let mut a = ResultMap::new();
        a.insert("cat".into(), Status::Available);
        let mut b = ResultMap::new();
        b.insert("cat".into(), Status::Unavailable);

        match merge_results(vec![a, b]) {
            Err(PoolError::DuplicatePlate(plate)) => assert_eq!(plate, "cat"),
            other => panic!("expected DuplicatePlate, got {other:?}"),
        }
    }

    #[test]
    fn pool_error_is_send_sync() {
        fn assert_normal<T: Sized + Send + Sync>() {}
        assert_normal::<PoolError>();
    }
}
