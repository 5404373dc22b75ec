// Fire-and-forget delayed jobs on a single background worker.
//
// Jobs are never cancelled. A job that outlives the thing it targets must
// tolerate that on its own (e.g. stacking a window that was destroyed).

use log::{debug, error};
use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Something that can run a job after a delay without blocking the caller.
pub trait Defer {
    fn defer(&self, delay: Duration, job: Job);
}

struct Scheduled {
    due: Instant,
    seq: u64,
    job: Job,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

// Reversed so the max-heap pops the earliest deadline first, FIFO on ties.
impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

pub struct DeferredRunner {
    tx: Option<Sender<Scheduled>>,
    seq: AtomicU64,
    worker: Option<JoinHandle<()>>,
}

impl DeferredRunner {
    pub fn spawn() -> io::Result<Self> {
        let (tx, rx) = channel();
        let worker = std::thread::Builder::new()
            .name("deferred".into())
            .spawn(move || worker_loop(rx))?;
        Ok(Self {
            tx: Some(tx),
            seq: AtomicU64::new(0),
            worker: Some(worker),
        })
    }
}

impl Defer for DeferredRunner {
    fn defer(&self, delay: Duration, job: Job) {
        let scheduled = Scheduled {
            due: Instant::now() + delay,
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            job,
        };
        if let Some(tx) = &self.tx {
            if tx.send(scheduled).is_err() {
                debug!("deferred worker gone, dropping job");
            }
        }
    }
}

impl Drop for DeferredRunner {
    fn drop(&mut self) {
        // Closing the channel stops the worker; pending jobs are dropped.
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn worker_loop(rx: Receiver<Scheduled>) {
    let mut pending: BinaryHeap<Scheduled> = BinaryHeap::new();
    loop {
        let now = Instant::now();
        let received = match pending.peek() {
            Some(next) if next.due <= now => {
                if let Some(next) = pending.pop() {
                    run(next.job);
                }
                continue;
            }
            Some(next) => rx.recv_timeout(next.due - now),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match received {
            Ok(scheduled) => pending.push(scheduled),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn run(job: Job) {
    if catch_unwind(AssertUnwindSafe(job)).is_err() {
        error!("deferred job panicked");
    }
}
