use std::{collections::HashMap, hash::Hash, marker::PhantomData, sync::Arc};

use ahash::RandomState;
use parking_lot::Mutex;

use crate::messaging::{
    channel::{Channel, ConcurrentChannel},
    Broker, BrokerMetrics, BrokerStats, Callback,
};

/// Количество сегментов по умолчанию.
pub const DEFAULT_SHARDS: usize = 16;

/// Брокер с фиксированным массивом сегментов `Mutex<HashMap<T, Arc<C>>>`.
///
/// Сегмент выбирается по хэшу темы, поэтому разные темы конкурируют за
/// блокировку только при попадании в один сегмент.
pub struct ShardedBroker<T, S, M, C = ConcurrentChannel<S, M>> {
    shards: Box<[Mutex<HashMap<T, Arc<C>>>]>,
    hasher: RandomState,
    metrics: BrokerMetrics,
    _marker: PhantomData<fn(&S, &M)>,
}

impl<T, S, M, C> ShardedBroker<T, S, M, C>
where
    T: Eq + Hash,
{
    /// Создаёт брокер с `shards` сегментами (минимум один).
    pub fn new(shards: usize) -> Self {
        let shards = (0..shards.max(1))
            .map(|_| Mutex::new(HashMap::new()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            shards,
            hasher: RandomState::new(),
            metrics: BrokerMetrics::default(),
            _marker: PhantomData,
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    fn shard(
        &self,
        topic: &T,
    ) -> &Mutex<HashMap<T, Arc<C>>> {
        let index = (self.hasher.hash_one(topic) as usize) % self.shards.len();
        &self.shards[index]
    }
}

impl<T, S, M, C> Default for ShardedBroker<T, S, M, C>
where
    T: Eq + Hash,
{
    fn default() -> Self {
        Self::new(DEFAULT_SHARDS)
    }
}

impl<T, S, M, C> Broker<T, S, M> for ShardedBroker<T, S, M, C>
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
        let mut shard = self.shard(topic).lock();
        shard
            .entry(topic.clone())
            .or_insert_with(|| Arc::new(C::default()))
            .subscribe(subscriber, callback);
    }

    fn unsubscribe(
        &self,
        topic: &T,
        subscriber: &S,
    ) {
        let mut shard = self.shard(topic).lock();
        let now_empty = match shard.get(topic) {
            Some(channel) => {
                channel.unsubscribe(subscriber);
                channel.is_empty()
            }
            None => false,
        };
        if now_empty {
            shard.remove(topic);
        }
    }

    fn publish(
        &self,
        topic: &T,
        message: &M,
    ) {
        let channel = self.shard(topic).lock().get(topic).cloned();
        let report = channel.map(|channel| channel.publish(message));
        self.metrics.record_publish(report);
    }

    fn topic_count(&self) -> usize {
        self.shards.iter().map(|shard| shard.lock().len()).sum()
    }

    fn has_topic(
        &self,
        topic: &T,
    ) -> bool {
        self.shard(topic).lock().contains_key(topic)
    }

    fn stats(&self) -> BrokerStats {
        self.metrics.snapshot()
    }
}
