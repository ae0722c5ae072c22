use std::{collections::HashMap, hash::Hash, marker::PhantomData};

use parking_lot::RwLock;

use crate::messaging::{
    channel::{Channel, ReadWriteChannel},
    Broker, BrokerMetrics, BrokerStats, Callback,
};

/// Брокер с одной `RwLock` вокруг карты тем.
///
/// Подписка и отписка берут блокировку записи, публикация берёт
/// блокировку чтения и держит её на время доставки. Callback не должен
/// подписываться или отписываться через этот же брокер.
pub struct ReadWriteBroker<T, S, M, C = ReadWriteChannel<S, M>> {
    topics: RwLock<HashMap<T, C>>,
    metrics: BrokerMetrics,
    _marker: PhantomData<fn(&S, &M)>,
}

impl<T, S, M, C> ReadWriteBroker<T, S, M, C> {
    pub fn new() -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            metrics: BrokerMetrics::default(),
            _marker: PhantomData,
        }
    }
}

impl<T, S, M, C> Default for ReadWriteBroker<T, S, M, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S, M, C> Broker<T, S, M> for ReadWriteBroker<T, S, M, C>
where
    T: Eq + Hash + Clone + Send + Sync,
    C: Channel<S, M> + Default,
{
    fn subscribe(
        &self,
        topic: &T,
        subscriber: &S,
        callback: Callback<M>,
    ) {
        self.topics
            .write()
            .entry(topic.clone())
            .or_default()
            .subscribe(subscriber, callback);
    }

    fn unsubscribe(
        &self,
        topic: &T,
        subscriber: &S,
    ) {
        let mut topics = self.topics.write();
        let now_empty = match topics.get(topic) {
            Some(channel) => {
                channel.unsubscribe(subscriber);
                channel.is_empty()
            }
            None => false,
        };
        if now_empty {
            topics.remove(topic);
        }
    }

    fn publish(
        &self,
        topic: &T,
        message: &M,
    ) {
        let topics = self.topics.read();
        let report = topics.get(topic).map(|channel| channel.publish(message));
        drop(topics);
        self.metrics.record_publish(report);
    }

    fn topic_count(&self) -> usize {
        self.topics.read().len()
    }

    fn has_topic(
        &self,
        topic: &T,
    ) -> bool {
        self.topics.read().contains_key(topic)
    }

    fn stats(&self) -> BrokerStats {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::messaging::{brokers::test_support::*, channel::ConcurrentChannel};

    #[test]
    fn test_topic_lifecycle() {
        check_topic_lifecycle(&ReadWriteBroker::<_, _, _>::new());
    }

    #[test]
    fn test_publish_without_topic_is_dropped() {
        check_publish_without_topic(&ReadWriteBroker::<_, _, _>::new());
    }

    #[test]
    fn test_with_concurrent_channel() {
        check_topic_lifecycle(&ReadWriteBroker::<_, _, _, ConcurrentChannel<_, _>>::new());
    }

    #[test]
    fn test_concurrent_subscribe_unsubscribe_leaves_no_empty_topic() {
        check_concurrent_churn(Arc::new(ReadWriteBroker::<_, _, _>::new()));
    }
}
