use std::{collections::HashSet, hash::Hash, sync::Arc};

use dashmap::DashMap;
use tracing::{debug, trace};

use super::{Broker, Callback, Filter, Policy};
use crate::error::{BrokerError, PolicyError};

/// Связывает политику интереса, брокер и фильтр.
///
/// Хранит для каждого подписчика множество тем, на которые он сейчас
/// подписан в брокере, и при обновлении интереса отправляет брокеру
/// только разницу.
///
/// `update` для одного и того же подписчика должен вызываться
/// последовательно; разные подписчики обновляются параллельно.
pub struct MessagingSystem<T, P: ?Sized, S, M> {
    policy: Arc<dyn Policy<T, P, S>>,
    broker: Arc<dyn Broker<T, S, M>>,
    filter: Arc<dyn Filter<S, M>>,
    subscriptions: DashMap<S, HashSet<T>>,
}

impl<T, P, S, M> MessagingSystem<T, P, S, M>
where
    T: Eq + Hash + Clone,
    P: ?Sized,
    S: Eq + Hash + Clone + Send + Sync + 'static,
    M: 'static,
{
    pub fn new(
        policy: Arc<dyn Policy<T, P, S>>,
        broker: Arc<dyn Broker<T, S, M>>,
        filter: Arc<dyn Filter<S, M>>,
    ) -> Self {
        Self {
            policy,
            broker,
            filter,
            subscriptions: DashMap::new(),
        }
    }

    /// Пересчитывает интерес подписчика и приводит его подписки в
    /// брокере в соответствие.
    ///
    /// Темы, которые остались интересны, не трогаются: их подписки
    /// сохраняют прежний callback. Новые темы получают один общий
    /// отфильтрованный callback.
    pub fn update<F>(
        &self,
        subscriber: &S,
        callback: F,
    ) where
        F: Fn(&M) + Send + Sync + 'static,
    {
        let new_topics = self.policy.compute_interest_set(subscriber);

        if new_topics.is_empty() {
            if let Some((_, old_topics)) = self.subscriptions.remove(subscriber) {
                for topic in &old_topics {
                    self.broker.unsubscribe(topic, subscriber);
                }
                debug!(removed = old_topics.len(), "Subscriber lost all interest");
            }
            return;
        }

        let callback = self.filtered(subscriber, callback);
        let old_topics = self
            .subscriptions
            .insert(subscriber.clone(), new_topics.clone());

        match old_topics {
            None => {
                for topic in &new_topics {
                    self.broker.subscribe(topic, subscriber, Arc::clone(&callback));
                }
                trace!(added = new_topics.len(), "Subscriber registered");
            }
            Some(old_topics) => {
                let mut removed = 0usize;
                for topic in old_topics.difference(&new_topics) {
                    self.broker.unsubscribe(topic, subscriber);
                    removed += 1;
                }
                let mut added = 0usize;
                for topic in new_topics.difference(&old_topics) {
                    self.broker.subscribe(topic, subscriber, Arc::clone(&callback));
                    added += 1;
                }
                trace!(added, removed, "Subscriber interest updated");
            }
        }
    }

    /// Публикует сообщение во все темы, которые политика выбрала для
    /// издателя.
    pub fn broadcast(
        &self,
        publisher: &P,
        message: &M,
    ) -> Result<(), PolicyError> {
        let targets = self.policy.select_targets(publisher)?;
        for topic in &targets {
            self.broker.publish(topic, message);
        }
        Ok(())
    }

    /// Темы, на которые подписчик сейчас подписан через эту систему.
    pub fn interest_set(
        &self,
        subscriber: &S,
    ) -> Option<HashSet<T>> {
        self.subscriptions
            .get(subscriber)
            .map(|entry| entry.value().clone())
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn broker(&self) -> &Arc<dyn Broker<T, S, M>> {
        &self.broker
    }

    pub fn close(&self) -> Result<(), BrokerError> {
        self.broker.close()
    }

    fn filtered<F>(
        &self,
        subscriber: &S,
        callback: F,
    ) -> Callback<M>
    where
        F: Fn(&M) + Send + Sync + 'static,
    {
        let filter = Arc::clone(&self.filter);
        let owner = subscriber.clone();
        Arc::new(move |message: &M| {
            if filter.filter(&owner, message) {
                callback(message);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use parking_lot::RwLock;

    use super::*;
    use crate::messaging::{brokers::ConcurrentBroker, AcceptAll};

    /// Политика с интересом, заданным вручную.
    #[derive(Default)]
    struct TablePolicy {
        interest: RwLock<HashMap<u32, HashSet<u32>>>,
    }

    impl TablePolicy {
        fn set(
            &self,
            subscriber: u32,
            topics: &[u32],
        ) {
            self.interest
                .write()
                .insert(subscriber, topics.iter().copied().collect());
        }
    }

    impl Policy<u32, u32, u32> for TablePolicy {
        fn compute_interest_set(
            &self,
            subscriber: &u32,
        ) -> HashSet<u32> {
            self.interest
                .read()
                .get(subscriber)
                .cloned()
                .unwrap_or_default()
        }

        fn select_targets(
            &self,
            publisher: &u32,
        ) -> Result<Vec<u32>, PolicyError> {
            Ok(vec![*publisher])
        }
    }

    fn system(
        policy: Arc<TablePolicy>,
    ) -> MessagingSystem<u32, u32, u32, &'static str> {
        MessagingSystem::new(
            policy,
            Arc::new(ConcurrentBroker::<u32, u32, &'static str>::new()),
            Arc::new(AcceptAll),
        )
    }

    #[test]
    fn test_update_tracks_interest_and_topics() {
        let policy = Arc::new(TablePolicy::default());
        let system = system(Arc::clone(&policy));

        policy.set(1, &[10, 11]);
        system.update(&1, |_| {});
        assert_eq!(system.interest_set(&1), Some(HashSet::from([10, 11])));
        assert_eq!(system.broker().topic_count(), 2);

        policy.set(1, &[11, 12]);
        system.update(&1, |_| {});
        assert!(!system.broker().has_topic(&10));
        assert!(system.broker().has_topic(&12));

        policy.set(1, &[]);
        system.update(&1, |_| {});
        assert_eq!(system.interest_set(&1), None);
        assert_eq!(system.subscriber_count(), 0);
        assert_eq!(system.broker().topic_count(), 0);
    }

    /// Тест проверяет, что тема, оставшаяся в интересе, сохраняет
    /// исходный callback.
    #[test]
    fn test_unchanged_topics_keep_first_callback() {
        let policy = Arc::new(TablePolicy::default());
        let system = system(Arc::clone(&policy));
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        policy.set(1, &[10]);
        let counter = Arc::clone(&first);
        system.update(&1, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        policy.set(1, &[10, 11]);
        let counter = Arc::clone(&second);
        system.update(&1, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        system.broadcast(&10, &"a").unwrap();
        system.broadcast(&11, &"b").unwrap();
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_filter_gates_delivery() {
        let policy = Arc::new(TablePolicy::default());
        let system: MessagingSystem<u32, u32, u32, &'static str> = MessagingSystem::new(
            Arc::clone(&policy) as Arc<dyn Policy<u32, u32, u32>>,
            Arc::new(ConcurrentBroker::<u32, u32, &'static str>::new()),
            Arc::new(|_: &u32, message: &&'static str| *message != "secret"),
        );
        let hits = Arc::new(AtomicUsize::new(0));
        policy.set(1, &[10]);
        let counter = Arc::clone(&hits);
        system.update(&1, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        system.broadcast(&10, &"secret").unwrap();
        system.broadcast(&10, &"public").unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_interest_without_entry_is_noop() {
        let policy = Arc::new(TablePolicy::default());
        let system = system(policy);
        system.update(&42, |_| {});
        assert_eq!(system.subscriber_count(), 0);
        assert_eq!(system.broker().topic_count(), 0);
    }
}
