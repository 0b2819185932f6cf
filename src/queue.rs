//! The shared task queue feeding the worker pool.
//!
//! A pure concurrency primitive: entries are either candidates or shutdown
//! sentinels, delivery is exactly-once, and concurrent dequeues are
//! serialized by the underlying channel. The coordinator enqueues all
//! candidates followed by one sentinel per worker, so every worker dequeues
//! exactly one sentinel and then stops.

use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam::channel::{Receiver, Sender, unbounded};

/// One queue entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    /// A candidate plate to classify.
    Check(String),
    /// End-of-work sentinel; the receiving worker acknowledges and exits.
    Shutdown,
}

/// Concurrency-safe hand-off channel of [`Task`] entries.
#[derive(Debug)]
pub struct TaskQueue {
    tx: Sender<Task>,
    rx: Receiver<Task>,
    processed: AtomicUsize,
}

impl TaskQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx,
            processed: AtomicUsize::new(0),
        }
    }

    /// Add an entry to the queue.
    pub fn enqueue(&self, task: Task) {
        // the queue owns both ends, so the channel cannot be disconnected
        let _ = self.tx.send(task);
    }

    /// Remove and return the next entry, blocking until one is available.
    ///
    /// Safe under concurrent callers; each entry is delivered to exactly one
    /// of them.
    pub fn dequeue(&self) -> Task {
        // self.tx keeps the channel alive, so recv can only fail if the
        // queue itself is being torn down; shutting down is the safe answer
        self.rx.recv().unwrap_or(Task::Shutdown)
    }

    /// Acknowledge that a dequeued entry has been fully handled.
    pub fn mark_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of entries acknowledged so far. After a successful pool run
    /// this equals candidates plus sentinels.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::Relaxed)
    }

    /// Number of entries waiting in the queue.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether the queue currently holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn delivers_in_order_to_single_consumer() {
        let queue = TaskQueue::new();
        queue.enqueue(Task::Check("cat".into()));
        queue.enqueue(Task::Check("dog".into()));
        queue.enqueue(Task::Shutdown);
        assert_eq!(queue.dequeue(), Task::Check("cat".into()));
        assert_eq!(queue.dequeue(), Task::Check("dog".into()));
        assert_eq!(queue.dequeue(), Task::Shutdown);
        assert!(queue.is_empty());
    }

    #[test]
    fn each_sentinel_reaches_exactly_one_worker() {
        const WORKERS: usize = 4;
        let queue = TaskQueue::new();
        for i in 0..10 {
            queue.enqueue(Task::Check(format!("plate{i}")));
        }
        for _ in 0..WORKERS {
            queue.enqueue(Task::Shutdown);
        }

        // each thread records how many candidates and sentinels it saw,
        // and stops dequeuing the moment it receives its sentinel
        let counts: Vec<(usize, usize)> = thread::scope(|s| {
            let handles: Vec<_> = (0..WORKERS)
                .map(|_| {
                    s.spawn(|| {
                        let mut candidates = 0;
                        let mut sentinels = 0;
                        loop {
                            match queue.dequeue() {
                                Task::Check(_) => {
                                    candidates += 1;
                                    queue.mark_processed();
                                }
                                Task::Shutdown => {
                                    sentinels += 1;
                                    queue.mark_processed();
                                    break;
                                }
                            }
                        }
                        (candidates, sentinels)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let total_candidates: usize = counts.iter().map(|(c, _)| c).sum();
        let total_sentinels: usize = counts.iter().map(|(_, s)| s).sum();
        assert_eq!(total_candidates, 10);
        assert_eq!(total_sentinels, WORKERS);
        assert!(counts.iter().all(|(_, s)| *s == 1));
        assert!(queue.is_empty());
        assert_eq!(queue.processed(), 10 + WORKERS);
    }

    #[test]
    fn dequeue_blocks_until_an_entry_arrives() {
        let queue = TaskQueue::new();
        let got = thread::scope(|s| {
            let handle = s.spawn(|| queue.dequeue());
            thread::sleep(std::time::Duration::from_millis(20));
            queue.enqueue(Task::Check("late".into()));
            handle.join().unwrap()
        });
        assert_eq!(got, Task::Check("late".into()));
    }
}
