//! Fixed-size worker pool for rasterization tiles and resolve rows.
//!
//! Tasks are `FnOnce(thread_id)` closures; the thread id lets a task key
//! into a preallocated per-thread context array. Tasks run to completion
//! on one worker, there is no suspension. [`ThreadPool::wait_tasks_finish`]
//! polls the outstanding-task counter with a cooperative yield, so draws
//! can flush all tile work before resolving.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};

type Task = Box<dyn FnOnce(usize) + Send + 'static>;

struct PoolShared {
    queue: Mutex<VecDeque<Task>>,
    available: Condvar,
    // pushed but not yet completed
    outstanding: AtomicUsize,
    running: AtomicBool,
    paused: AtomicBool,
}

pub struct ThreadPool {
    shared: Arc<PoolShared>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    /// Pool sized to the host's available parallelism.
    #[must_use]
    pub fn new() -> Self {
        let threads = std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(1);
        Self::with_threads(threads)
    }

    #[must_use]
    pub fn with_threads(thread_count: usize) -> Self {
        let thread_count = thread_count.max(1);
        let shared = Arc::new(PoolShared {
            queue: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            outstanding: AtomicUsize::new(0),
            running: AtomicBool::new(true),
            paused: AtomicBool::new(false),
        });

        let workers = (0..thread_count)
            .map(|thread_id| {
                let shared = Arc::clone(&shared);
                std::thread::Builder::new()
                    .name(format!("prism-raster-{thread_id}"))
                    .spawn(move || worker_loop(&shared, thread_id))
                    .expect("spawn raster worker")
            })
            .collect();

        Self { shared, workers }
    }

    #[inline]
    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.workers.len()
    }

    pub fn push_task<F>(&self, task: F)
    where
        F: FnOnce(usize) + Send + 'static,
    {
        self.shared.outstanding.fetch_add(1, Ordering::SeqCst);
        {
            let mut queue = self.shared.queue.lock();
            queue.push_back(Box::new(task));
        }
        self.shared.available.notify_one();
    }

    /// Blocks until every pushed task has finished executing.
    pub fn wait_tasks_finish(&self) {
        while self.shared.outstanding.load(Ordering::SeqCst) != 0 {
            std::thread::yield_now();
        }
    }

    /// While paused, queued tasks are not popped; running tasks are not preempted.
    pub fn set_paused(&self, paused: bool) {
        self.shared.paused.store(paused, Ordering::SeqCst);
        if !paused {
            self.shared.available.notify_all();
        }
    }
}

impl Default for ThreadPool {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.set_paused(false);
        self.wait_tasks_finish();
        self.shared.running.store(false, Ordering::SeqCst);
        self.shared.available.notify_all();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn worker_loop(shared: &PoolShared, thread_id: usize) {
    loop {
        let task = {
            let mut queue = shared.queue.lock();
            loop {
                if !shared.running.load(Ordering::SeqCst) {
                    return;
                }
                if !shared.paused.load(Ordering::SeqCst) {
                    if let Some(task) = queue.pop_front() {
                        break task;
                    }
                }
                shared.available.wait(&mut queue);
            }
        };
        task(thread_id);
        shared.outstanding.fetch_sub(1, Ordering::SeqCst);
    }
}
