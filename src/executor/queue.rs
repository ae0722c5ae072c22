use std::{
    cmp::Ordering,
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};

type Comparator<E> = Box<dyn Fn(&E, &E) -> Ordering + Send + Sync>;

/// Блокирующая очередь поверх списка, которую можно пересортировать.
///
/// Элементы хранятся в `Vec` и извлекаются с хвоста. Сортировка
/// раскладывает их в обратном порядке компаратора, поэтому первым
/// извлекается элемент, меньший по компаратору. При равенстве после
/// сортировки элементы извлекаются в порядке добавления.
///
/// Добавление без сортировки кладёт элемент в хвост: до следующего
/// `sort()` он будет извлечён первым.
///
/// Все операции берут один и тот же мьютекс. Для многошаговых изменений
/// есть [`SortableBlockingQueue::transaction`], которая держит его на
/// протяжении всего тела.
pub struct SortableBlockingQueue<E> {
    state: Mutex<QueueState<E>>,
    not_empty: Condvar,
    comparator: Comparator<E>,
}

struct Slot<E> {
    seq: u64,
    element: E,
}

struct QueueState<E> {
    slots: Vec<Slot<E>>,
    next_seq: u64,
    closed: bool,
}

/// Эксклюзивный доступ к содержимому очереди внутри одной критической
/// секции. Создаётся только через [`SortableBlockingQueue::transaction`].
pub struct QueueTransaction<'a, E> {
    state: &'a mut QueueState<E>,
    comparator: &'a (dyn Fn(&E, &E) -> Ordering + Send + Sync),
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl<E> SortableBlockingQueue<E> {
    /// Создаёт пустую очередь с заданным компаратором.
    pub fn new<F>(comparator: F) -> Self
    where
        F: Fn(&E, &E) -> Ordering + Send + Sync + 'static,
    {
        Self {
            state: Mutex::new(QueueState {
                slots: Vec::new(),
                next_seq: 0,
                closed: false,
            }),
            not_empty: Condvar::new(),
            comparator: Box::new(comparator),
        }
    }

    /// Сортирует текущие элементы.
    pub fn sort(&self) {
        let mut state = self.state.lock();
        sort_slots(&mut state.slots, &*self.comparator);
    }

    /// Удаляет `removals`, добавляет `additions` и сортирует под одной
    /// блокировкой.
    pub fn update<I>(
        &self,
        additions: I,
        removals: &[E],
    ) where
        I: IntoIterator<Item = E>,
        E: PartialEq,
    {
        self.transaction(|tx| {
            tx.remove_if(|e| removals.contains(e));
            tx.add_all(additions);
            tx.sort();
        });
    }

    /// Выполняет `body` внутри одной критической секции.
    ///
    /// Рабочие потоки, ждущие в `take`, не увидят промежуточного
    /// состояния: они проснутся только после выхода из тела.
    pub fn transaction<R, F>(
        &self,
        body: F,
    ) -> R
    where
        F: FnOnce(&mut QueueTransaction<'_, E>) -> R,
    {
        let mut state = self.state.lock();
        let result = {
            let mut tx = QueueTransaction {
                state: &mut *state,
                comparator: &*self.comparator,
            };
            body(&mut tx)
        };
        if !state.slots.is_empty() {
            self.not_empty.notify_all();
        }
        result
    }

    /// Ёмкость очереди не ограничена.
    pub fn remaining_capacity(&self) -> usize {
        usize::MAX
    }

    pub fn len(&self) -> usize {
        self.state.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().slots.is_empty()
    }

    pub fn contains(
        &self,
        element: &E,
    ) -> bool
    where
        E: PartialEq,
    {
        self.state
            .lock()
            .slots
            .iter()
            .any(|slot| &slot.element == element)
    }

    /// Добавляет элемент. Никогда не блокирует и всегда успешна.
    pub fn add(
        &self,
        element: E,
    ) -> bool {
        let mut state = self.state.lock();
        state.push(element);
        self.not_empty.notify_one();
        true
    }

    /// Синоним [`add`](Self::add).
    pub fn offer(
        &self,
        element: E,
    ) -> bool {
        self.add(element)
    }

    /// Синоним [`add`](Self::add).
    pub fn put(
        &self,
        element: E,
    ) {
        self.add(element);
    }

    /// Добавляет все элементы. Возвращает `true`, если очередь изменилась.
    pub fn add_all<I>(
        &self,
        elements: I,
    ) -> bool
    where
        I: IntoIterator<Item = E>,
    {
        let mut state = self.state.lock();
        let before = state.slots.len();
        for element in elements {
            state.push(element);
        }
        let changed = state.slots.len() != before;
        if changed {
            self.not_empty.notify_all();
        }
        changed
    }

    /// Возвращает копию следующего извлекаемого элемента.
    pub fn peek(&self) -> Option<E>
    where
        E: Clone,
    {
        self.state
            .lock()
            .slots
            .last()
            .map(|slot| slot.element.clone())
    }

    /// Извлекает следующий элемент, не блокируя.
    pub fn poll(&self) -> Option<E> {
        self.state.lock().slots.pop().map(|slot| slot.element)
    }

    /// Ждёт следующий элемент не дольше `timeout`.
    ///
    /// Таймаут, не представимый как момент времени, означает ожидание без
    /// ограничения, как у [`take`](Self::take).
    pub fn poll_timeout(
        &self,
        timeout: Duration,
    ) -> Option<E> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self.take();
        };
        let mut state = self.state.lock();
        loop {
            if let Some(slot) = state.slots.pop() {
                return Some(slot.element);
            }
            if state.closed {
                return None;
            }
            if self
                .not_empty
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                return state.slots.pop().map(|slot| slot.element);
            }
        }
    }

    /// Блокирует поток, пока не появится элемент.
    ///
    /// Возвращает `None` только если очередь закрыта и уже пуста.
    pub fn take(&self) -> Option<E> {
        let mut state = self.state.lock();
        loop {
            if let Some(slot) = state.slots.pop() {
                return Some(slot.element);
            }
            if state.closed {
                return None;
            }
            self.not_empty.wait(&mut state);
        }
    }

    /// Удаляет первое вхождение элемента.
    pub fn remove(
        &self,
        element: &E,
    ) -> bool
    where
        E: PartialEq,
    {
        let mut state = self.state.lock();
        match state.slots.iter().position(|slot| &slot.element == element) {
            Some(index) => {
                state.slots.remove(index);
                true
            }
            None => false,
        }
    }

    /// Удаляет все элементы, равные любому из `elements`.
    pub fn remove_all(
        &self,
        elements: &[E],
    ) -> bool
    where
        E: PartialEq,
    {
        !self
            .transaction(|tx| tx.remove_if(|e| elements.contains(e)))
            .is_empty()
    }

    /// Удаляет и возвращает элементы, для которых `predicate` вернул `true`.
    pub fn remove_if<F>(
        &self,
        predicate: F,
    ) -> Vec<E>
    where
        F: FnMut(&E) -> bool,
    {
        self.transaction(|tx| tx.remove_if(predicate))
    }

    /// Оставляет только элементы, для которых `predicate` вернул `true`.
    pub fn retain<F>(
        &self,
        mut predicate: F,
    ) -> bool
    where
        F: FnMut(&E) -> bool,
    {
        !self.remove_if(|e| !predicate(e)).is_empty()
    }

    pub fn clear(&self) {
        self.state.lock().slots.clear();
    }

    /// Переносит все элементы в `sink` в порядке извлечения.
    pub fn drain_to(
        &self,
        sink: &mut Vec<E>,
    ) -> usize {
        self.drain_to_max(sink, usize::MAX)
    }

    /// Переносит не более `max` элементов в `sink` в порядке извлечения.
    pub fn drain_to_max(
        &self,
        sink: &mut Vec<E>,
        max: usize,
    ) -> usize {
        let mut state = self.state.lock();
        let mut count = 0;
        while count < max {
            match state.slots.pop() {
                Some(slot) => {
                    sink.push(slot.element);
                    count += 1;
                }
                None => break,
            }
        }
        count
    }

    /// Снимок содержимого в порядке извлечения.
    pub fn to_vec(&self) -> Vec<E>
    where
        E: Clone,
    {
        self.state
            .lock()
            .slots
            .iter()
            .rev()
            .map(|slot| slot.element.clone())
            .collect()
    }

    /// Обходит элементы под блокировкой в порядке извлечения.
    pub fn for_each<F>(
        &self,
        mut f: F,
    ) where
        F: FnMut(&E),
    {
        let state = self.state.lock();
        state.slots.iter().rev().for_each(|slot| f(&slot.element));
    }

    /// Закрывает очередь и будит всех ждущих потребителей.
    ///
    /// Уже лежащие элементы по-прежнему извлекаются; `take` начинает
    /// возвращать `None`, когда очередь опустеет.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.not_empty.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

impl<E: Ord + 'static> SortableBlockingQueue<E> {
    /// Очередь, упорядоченная по `Ord` элементов.
    pub fn natural() -> Self {
        Self::new(E::cmp)
    }
}

impl<E> QueueState<E> {
    fn push(
        &mut self,
        element: E,
    ) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.slots.push(Slot { seq, element });
    }
}

impl<E> QueueTransaction<'_, E> {
    pub fn len(&self) -> usize {
        self.state.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.slots.is_empty()
    }

    /// Даёт изменяемый доступ к каждому элементу, например чтобы
    /// пересчитать приоритет перед сортировкой.
    pub fn for_each_mut<F>(
        &mut self,
        mut f: F,
    ) where
        F: FnMut(&mut E),
    {
        self.state
            .slots
            .iter_mut()
            .for_each(|slot| f(&mut slot.element));
    }

    /// Удаляет и возвращает подходящие элементы в порядке извлечения.
    pub fn remove_if<F>(
        &mut self,
        mut predicate: F,
    ) -> Vec<E>
    where
        F: FnMut(&E) -> bool,
    {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.state.slots.len());
        for slot in self.state.slots.drain(..).rev() {
            if predicate(&slot.element) {
                removed.push(slot.element);
            } else {
                kept.push(slot);
            }
        }
        kept.reverse();
        self.state.slots = kept;
        removed
    }

    pub fn add(
        &mut self,
        element: E,
    ) {
        self.state.push(element);
    }

    pub fn add_all<I>(
        &mut self,
        elements: I,
    ) where
        I: IntoIterator<Item = E>,
    {
        for element in elements {
            self.state.push(element);
        }
    }

    pub fn sort(&mut self) {
        sort_slots(&mut self.state.slots, self.comparator);
    }
}

/// Раскладывает слоты по убыванию, чтобы наименьший элемент оказался в
/// хвосте; среди равных в хвосте оказывается самый ранний.
fn sort_slots<E>(
    slots: &mut [Slot<E>],
    comparator: &(dyn Fn(&E, &E) -> Ordering + Send + Sync),
) {
    slots.sort_by(|a, b| comparator(&b.element, &a.element).then_with(|| b.seq.cmp(&a.seq)));
}
