use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::{PriorityTask, SortableBlockingQueue, TaskState};
use crate::error::ExecutorError;

/// Пул рабочих потоков фиксированного размера, разбирающий задачи из
/// [`SortableBlockingQueue`] в порядке ранга.
///
/// Потоки стартуют сразу в конструкторе. Ранги ожидающих задач можно
/// пересчитать и очередь пересортировать атомарно через
/// [`PriorityExecutor::execute_and_cancel`].
pub struct PriorityExecutor<E: PriorityTask> {
    queue: Arc<SortableBlockingQueue<E>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    shutdown: AtomicBool,
    counters: Arc<Counters>,
    pool_size: usize,
}

/// Снимок счётчиков executor'а.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorStats {
    pub submitted: u64,
    pub completed: u64,
    pub cancelled: u64,
    pub panicked: u64,
    pub queued: usize,
    pub pool_size: usize,
}

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    completed: AtomicU64,
    cancelled: AtomicU64,
    panicked: AtomicU64,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl<E: PriorityTask> PriorityExecutor<E> {
    /// Создаёт executor и запускает `pool_size` рабочих потоков.
    ///
    /// При `pool_size == 0` задачи копятся в очереди и не выполняются.
    pub fn new(pool_size: usize) -> Result<Self, ExecutorError> {
        let queue = Arc::new(SortableBlockingQueue::new(|a: &E, b: &E| {
            a.rank().cmp(&b.rank())
        }));
        let counters = Arc::new(Counters::default());

        let mut workers = Vec::with_capacity(pool_size);
        for id in 0..pool_size {
            let worker_queue = Arc::clone(&queue);
            let counters = Arc::clone(&counters);
            let spawned = thread::Builder::new()
                .name(format!("priority-worker-{id}"))
                .spawn(move || worker_loop(id, worker_queue, counters));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(err) => {
                    // Уже запущенные потоки должны завершиться.
                    queue_close_and_join(&queue, workers);
                    return Err(ExecutorError::Spawn(err));
                }
            }
        }

        info!(pool_size, "Priority executor started");

        Ok(Self {
            queue,
            workers: Mutex::new(workers),
            shutdown: AtomicBool::new(false),
            counters,
            pool_size,
        })
    }

    /// Executor с числом потоков по количеству логических ядер.
    pub fn with_available_parallelism() -> Result<Self, ExecutorError> {
        Self::new(num_cpus::get())
    }

    /// Ставит задачу в очередь.
    pub fn execute(
        &self,
        task: E,
    ) -> Result<(), ExecutorError> {
        self.ensure_running()?;
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        self.queue.add(task);
        Ok(())
    }

    /// Пересчитывает приоритеты ожидающих задач, отменяет подходящие под
    /// `predicate`, добавляет `to_execute` и пересортировывает очередь.
    ///
    /// Всё происходит в одной критической секции очереди. Возвращает
    /// отменённые задачи в порядке, в котором они были бы выполнены.
    pub fn execute_and_cancel<I, F>(
        &self,
        to_execute: I,
        predicate: F,
    ) -> Result<Vec<E>, ExecutorError>
    where
        I: IntoIterator<Item = E>,
        F: FnMut(&E) -> bool,
    {
        self.ensure_running()?;

        let (removed, added) = self.queue.transaction(|tx| {
            tx.for_each_mut(PriorityTask::update_priority);
            let removed = tx.remove_if(predicate);
            let before = tx.len();
            tx.add_all(to_execute);
            let added = tx.len() - before;
            tx.sort();
            (removed, added)
        });

        for task in &removed {
            task.transition(TaskState::Cancelled);
        }
        self.counters
            .submitted
            .fetch_add(added as u64, Ordering::Relaxed);
        self.counters
            .cancelled
            .fetch_add(removed.len() as u64, Ordering::Relaxed);

        debug!(
            added,
            cancelled = removed.len(),
            queued = self.queue.len(),
            "Priority queue refreshed"
        );
        Ok(removed)
    }

    /// Перестаёт принимать задачи. Рабочие потоки дорабатывают очередь и
    /// завершаются.
    pub fn shutdown(&self) {
        if !self.shutdown.swap(true, Ordering::AcqRel) {
            info!(queued = self.queue.len(), "Priority executor shutting down");
        }
        self.queue.close();
    }

    /// То же, что [`shutdown`](Self::shutdown), но ещё и забирает из
    /// очереди невыполненные задачи. Уже запущенные задачи доработают.
    pub fn shutdown_now(&self) -> Vec<E> {
        self.shutdown();
        let mut pending = Vec::new();
        self.queue.drain_to(&mut pending);
        for task in &pending {
            task.transition(TaskState::Cancelled);
        }
        self.counters
            .cancelled
            .fetch_add(pending.len() as u64, Ordering::Relaxed);
        pending
    }

    /// Ждёт завершения всех рабочих потоков.
    ///
    /// Без предварительного `shutdown` ждёт бесконечно.
    pub fn await_termination(&self) {
        let workers = std::mem::take(&mut *self.workers.lock());
        for handle in workers {
            if handle.join().is_err() {
                warn!("Priority worker terminated abnormally");
            }
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Число задач, ещё ожидающих в очереди.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn stats(&self) -> ExecutorStats {
        ExecutorStats {
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            cancelled: self.counters.cancelled.load(Ordering::Relaxed),
            panicked: self.counters.panicked.load(Ordering::Relaxed),
            queued: self.queue.len(),
            pool_size: self.pool_size,
        }
    }

    fn ensure_running(&self) -> Result<(), ExecutorError> {
        if self.is_shutdown() {
            Err(ExecutorError::ShutDown)
        } else {
            Ok(())
        }
    }
}

fn worker_loop<E: PriorityTask>(
    id: usize,
    queue: Arc<SortableBlockingQueue<E>>,
    counters: Arc<Counters>,
) {
    debug!(worker = id, "Priority worker started");
    while let Some(task) = queue.take() {
        task.transition(TaskState::Running);
        match panic::catch_unwind(AssertUnwindSafe(move || task.run())) {
            Ok(()) => {
                counters.completed.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                counters.panicked.fetch_add(1, Ordering::Relaxed);
                warn!(worker = id, "Priority task panicked");
            }
        }
    }
    debug!(worker = id, "Priority worker stopped");
}

fn queue_close_and_join<E>(
    queue: &SortableBlockingQueue<E>,
    workers: Vec<JoinHandle<()>>,
) {
    queue.close();
    for handle in workers {
        let _ = handle.join();
    }
}

////////////////////////////////////////////////////////////////////////////////
// Реализация трейтов
////////////////////////////////////////////////////////////////////////////////

impl<E: PriorityTask> Drop for PriorityExecutor<E> {
    fn drop(&mut self) {
        // Потоки не ждём: они сами выйдут, когда очередь опустеет.
        self.shutdown();
    }
}
