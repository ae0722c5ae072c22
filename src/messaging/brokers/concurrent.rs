use std::{hash::Hash, marker::PhantomData, sync::Arc};

use dashmap::DashMap;

use crate::messaging::{
    channel::{Channel, ConcurrentChannel},
    Broker, BrokerMetrics, BrokerStats, Callback,
};

/// Брокер поверх `DashMap<T, Arc<C>>`.
///
/// Подписка создаёт канал атомарно через `entry`, отписка удаляет его
/// через `remove_if`, так что пустой канал не переживает последнюю
/// отписку. Публикация клонирует `Arc` канала и доставляет сообщения уже
/// без блокировки сегмента карты.
pub struct ConcurrentBroker<T, S, M, C = ConcurrentChannel<S, M>> {
    topics: DashMap<T, Arc<C>>,
    metrics: BrokerMetrics,
    _marker: PhantomData<fn(&S, &M)>,
}

impl<T, S, M, C> ConcurrentBroker<T, S, M, C>
where
    T: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            topics: DashMap::new(),
            metrics: BrokerMetrics::default(),
            _marker: PhantomData,
        }
    }
}

impl<T, S, M, C> Default for ConcurrentBroker<T, S, M, C>
where
    T: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S, M, C> Broker<T, S, M> for ConcurrentBroker<T, S, M, C>
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
        // Сегмент остаётся заблокированным, пока подписчик не добавлен.
        let channel = self
            .topics
            .entry(topic.clone())
            .or_insert_with(|| Arc::new(C::default()));
        channel.subscribe(subscriber, callback);
    }

    fn unsubscribe(
        &self,
        topic: &T,
        subscriber: &S,
    ) {
        self.topics.remove_if(topic, |_, channel| {
            channel.unsubscribe(subscriber);
            channel.is_empty()
        });
    }

    fn publish(
        &self,
        topic: &T,
        message: &M,
    ) {
        let channel = self.topics.get(topic).map(|entry| Arc::clone(entry.value()));
        let report = channel.map(|channel| channel.publish(message));
        self.metrics.record_publish(report);
    }

    fn topic_count(&self) -> usize {
        self.topics.len()
    }

    fn has_topic(
        &self,
        topic: &T,
    ) -> bool {
        self.topics.contains_key(topic)
    }

    fn stats(&self) -> BrokerStats {
        self.metrics.snapshot()
    }
}
