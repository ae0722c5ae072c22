use std::hash::Hash;

use dashmap::{mapref::entry::Entry, DashMap};

use super::{deliver_all, Channel, DeliveryReport};
use crate::messaging::Callback;

/// Канал поверх `DashMap`: подписки в разных сегментах карты не
/// конкурируют за одну блокировку.
///
/// `publish` копирует callback'и и вызывает их уже без блокировок.
pub struct ConcurrentChannel<S, M> {
    entries: DashMap<S, Callback<M>>,
}

impl<S: Eq + Hash, M> ConcurrentChannel<S, M> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<S: Eq + Hash, M> Default for ConcurrentChannel<S, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, M> Channel<S, M> for ConcurrentChannel<S, M>
where
    S: Eq + Hash + Clone + Send + Sync,
    M: 'static,
{
    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn is_subscribed(
        &self,
        subscriber: &S,
    ) -> bool {
        self.entries.contains_key(subscriber)
    }

    fn subscribe(
        &self,
        subscriber: &S,
        callback: Callback<M>,
    ) -> bool {
        match self.entries.entry(subscriber.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(callback);
                true
            }
        }
    }

    fn unsubscribe(
        &self,
        subscriber: &S,
    ) -> bool {
        self.entries.remove(subscriber).is_some()
    }

    fn publish(
        &self,
        message: &M,
    ) -> DeliveryReport {
        let callbacks: Vec<Callback<M>> = self
            .entries
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        deliver_all(&callbacks, message)
    }
}
