use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
};

/// Состояние единицы работы.
///
/// `Queued → Running → (Completed | Failed)` или `Queued → Cancelled`.
/// Задача, уже взятая рабочим потоком, отменена быть не может.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    Queued,
    Running,
    Completed,
    Cancelled,
    /// Тело задачи запаниковало.
    Failed,
}

/// Единица работы для [`PriorityExecutor`](super::PriorityExecutor).
pub trait PriorityTask: Send + 'static {
    type Rank: Ord;

    /// Текущий ранг: задача с меньшим рангом выполняется раньше.
    fn rank(&self) -> Self::Rank;

    /// Пересчитывает ранг по внешнему изменяемому состоянию.
    ///
    /// Вызывается для каждой ожидающей задачи перед пересортировкой.
    fn update_priority(&mut self);

    fn run(self);

    /// Уведомление о смене состояния. Executor сообщает `Running` и
    /// `Cancelled`; о `Completed` и `Failed` задача сообщает сама из `run`.
    fn transition(
        &self,
        _state: TaskState,
    ) {
    }
}

/// Наблюдатель за состоянием задачи.
#[derive(Clone)]
pub struct TaskHandle {
    state: Arc<AtomicU8>,
}

type Ranker<K, R> = Arc<dyn Fn(&K) -> R + Send + Sync>;
type Job<K> = Box<dyn FnOnce(&K) + Send>;

/// Задача с ключом и рангом, который пересчитывается функцией `ranker`.
///
/// Ключ идентифицирует задачу для предикатов отмены, например чанк,
/// который нужно сгенерировать.
pub struct RankedJob<K, R> {
    key: K,
    rank: R,
    ranker: Ranker<K, R>,
    job: Job<K>,
    handle: TaskHandle,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl TaskState {
    const fn to_u8(self) -> u8 {
        match self {
            TaskState::Queued => 0,
            TaskState::Running => 1,
            TaskState::Completed => 2,
            TaskState::Cancelled => 3,
            TaskState::Failed => 4,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            1 => TaskState::Running,
            2 => TaskState::Completed,
            3 => TaskState::Cancelled,
            4 => TaskState::Failed,
            _ => TaskState::Queued,
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Cancelled | TaskState::Failed
        )
    }
}

impl TaskHandle {
    fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(TaskState::Queued.to_u8())),
        }
    }

    pub fn state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set(
        &self,
        state: TaskState,
    ) {
        self.state.store(state.to_u8(), Ordering::Release);
    }
}

impl<K, R> RankedJob<K, R>
where
    K: Send + Sync + 'static,
    R: Ord + Send + 'static,
{
    /// Создаёт задачу; начальный ранг сразу вычисляется через `ranker`.
    pub fn new<F, J>(
        key: K,
        ranker: F,
        job: J,
    ) -> Self
    where
        F: Fn(&K) -> R + Send + Sync + 'static,
        J: FnOnce(&K) + Send + 'static,
    {
        Self::with_shared_ranker(key, Arc::new(ranker), job)
    }

    /// То же, что [`new`](Self::new), но с ranker'ом, общим для многих задач.
    pub fn with_shared_ranker<J>(
        key: K,
        ranker: Arc<dyn Fn(&K) -> R + Send + Sync>,
        job: J,
    ) -> Self
    where
        J: FnOnce(&K) + Send + 'static,
    {
        let rank = ranker(&key);
        Self {
            key,
            rank,
            ranker,
            job: Box::new(job),
            handle: TaskHandle::new(),
        }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn handle(&self) -> TaskHandle {
        self.handle.clone()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Реализация трейтов
////////////////////////////////////////////////////////////////////////////////

impl<K, R> PriorityTask for RankedJob<K, R>
where
    K: Send + Sync + 'static,
    R: Ord + Clone + Send + 'static,
{
    type Rank = R;

    fn rank(&self) -> R {
        self.rank.clone()
    }

    fn update_priority(&mut self) {
        self.rank = (self.ranker)(&self.key);
    }

    /// Паника тела переводит задачу в `Failed` и пробрасывается дальше,
    /// чтобы executor её учёл.
    fn run(self) {
        let RankedJob {
            key, job, handle, ..
        } = self;
        match panic::catch_unwind(AssertUnwindSafe(|| job(&key))) {
            Ok(()) => handle.set(TaskState::Completed),
            Err(payload) => {
                handle.set(TaskState::Failed);
                panic::resume_unwind(payload);
            }
        }
    }

    fn transition(
        &self,
        state: TaskState,
    ) {
        self.handle.set(state);
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("state", &self.state())
            .finish()
    }
}

impl<K: fmt::Debug, R: fmt::Debug> fmt::Debug for RankedJob<K, R> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("RankedJob")
            .field("key", &self.key)
            .field("rank", &self.rank)
            .field("state", &self.handle.state())
            .finish()
    }
}
