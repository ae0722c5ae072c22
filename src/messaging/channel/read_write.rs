use std::{
    collections::{hash_map::Entry, HashMap},
    hash::Hash,
};

use parking_lot::RwLock;

use super::{deliver_all, Channel, DeliveryReport};
use crate::messaging::Callback;

/// Канал с обычной `HashMap` под `RwLock`.
///
/// Публикации идут параллельно под блокировкой чтения. Callback не должен
/// подписывать или отписывать кого-либо в этом же канале: блокировка
/// чтения удерживается на время доставки.
pub struct ReadWriteChannel<S, M> {
    entries: RwLock<HashMap<S, Callback<M>>>,
}

impl<S, M> ReadWriteChannel<S, M> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<S, M> Default for ReadWriteChannel<S, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, M> Channel<S, M> for ReadWriteChannel<S, M>
where
    S: Eq + Hash + Clone + Send + Sync,
    M: 'static,
{
    fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }

    fn is_subscribed(
        &self,
        subscriber: &S,
    ) -> bool {
        self.entries.read().contains_key(subscriber)
    }

    fn subscribe(
        &self,
        subscriber: &S,
        callback: Callback<M>,
    ) -> bool {
        match self.entries.write().entry(subscriber.clone()) {
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
        self.entries.write().remove(subscriber).is_some()
    }

    fn publish(
        &self,
        message: &M,
    ) -> DeliveryReport {
        let entries = self.entries.read();
        deliver_all(entries.values(), message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::channel::test_support::*;

    #[test]
    fn test_subscribe_unsubscribe() {
        check_subscribe_unsubscribe(ReadWriteChannel::new());
    }

    #[test]
    fn test_first_callback_wins() {
        check_first_callback_wins(ReadWriteChannel::new());
    }

    #[test]
    fn test_panicking_callback_isolated() {
        check_panicking_callback_isolated(ReadWriteChannel::new());
    }
}
