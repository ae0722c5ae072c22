use std::{collections::HashMap, hash::Hash, sync::Arc};

use parking_lot::Mutex;

use super::{deliver_all, Channel, DeliveryReport};
use crate::messaging::Callback;

/// Канал с копированием при записи.
///
/// `publish` берёт `Arc` на текущую карту и отпускает мьютекс до вызова
/// callback'ов. Запись копирует карту, только если на неё ещё ссылается
/// идущая публикация. Callback'и могут подписывать и отписывать
/// подписчиков в этом же канале; изменения увидит следующая публикация.
pub struct SnapshotChannel<S, M> {
    entries: Mutex<Arc<HashMap<S, Callback<M>>>>,
}

impl<S, M> SnapshotChannel<S, M> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Arc::new(HashMap::new())),
        }
    }

    fn snapshot(&self) -> Arc<HashMap<S, Callback<M>>> {
        Arc::clone(&self.entries.lock())
    }
}

impl<S, M> Default for SnapshotChannel<S, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, M> Channel<S, M> for SnapshotChannel<S, M>
where
    S: Eq + Hash + Clone + Send + Sync,
    M: 'static,
{
    fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }

    fn is_subscribed(
        &self,
        subscriber: &S,
    ) -> bool {
        self.entries.lock().contains_key(subscriber)
    }

    fn subscribe(
        &self,
        subscriber: &S,
        callback: Callback<M>,
    ) -> bool {
        let mut entries = self.entries.lock();
        if entries.contains_key(subscriber) {
            return false;
        }
        Arc::make_mut(&mut entries).insert(subscriber.clone(), callback);
        true
    }

    fn unsubscribe(
        &self,
        subscriber: &S,
    ) -> bool {
        let mut entries = self.entries.lock();
        if !entries.contains_key(subscriber) {
            return false;
        }
        Arc::make_mut(&mut entries).remove(subscriber);
        true
    }

    fn publish(
        &self,
        message: &M,
    ) -> DeliveryReport {
        let snapshot = self.snapshot();
        deliver_all(snapshot.values(), message)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::messaging::channel::test_support::*;

    #[test]
    fn test_subscribe_unsubscribe() {
        check_subscribe_unsubscribe(SnapshotChannel::new());
    }

    #[test]
    fn test_first_callback_wins() {
        check_first_callback_wins(SnapshotChannel::new());
    }

    #[test]
    fn test_panicking_callback_isolated() {
        check_panicking_callback_isolated(SnapshotChannel::new());
    }

    /// Тест проверяет, что callback может отписать себя во время
    /// публикации, и изменение видно со следующей публикации.
    #[test]
    fn test_callback_may_reenter_channel() {
        let channel: Arc<SnapshotChannel<&'static str, u32>> = Arc::new(SnapshotChannel::new());
        let hits = Arc::new(AtomicUsize::new(0));

        let weak = Arc::downgrade(&channel);
        let counter = Arc::clone(&hits);
        channel.subscribe(
            &"once",
            Arc::new(move |_: &u32| {
                counter.fetch_add(1, Ordering::SeqCst);
                if let Some(channel) = weak.upgrade() {
                    channel.unsubscribe(&"once");
                    channel.subscribe(&"late", counting(&Arc::new(AtomicUsize::new(0))));
                }
            }),
        );

        assert_eq!(channel.publish(&1).delivered, 1);
        assert!(!channel.is_subscribed(&"once"));
        assert!(channel.is_subscribed(&"late"));
        assert_eq!(channel.publish(&2).delivered, 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
