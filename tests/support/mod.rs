//! Общие помощники интеграционных тестов.

#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use parking_lot::Mutex;
use regionbus::{Broker, BrokerStats, Callback, Policy, PolicyError};

/// Политика с явно заданным интересом каждого подписчика.
///
/// Издатель задаётся именем темы и публикует ровно в неё.
#[derive(Default)]
pub struct TablePolicy {
    interest: Mutex<HashMap<u32, HashSet<String>>>,
}

impl TablePolicy {
    pub fn set(
        &self,
        subscriber: u32,
        topics: &[&str],
    ) {
        self.interest.lock().insert(
            subscriber,
            topics.iter().map(|topic| topic.to_string()).collect(),
        );
    }
}

impl Policy<String, str, u32> for TablePolicy {
    fn compute_interest_set(
        &self,
        subscriber: &u32,
    ) -> HashSet<String> {
        self.interest
            .lock()
            .get(subscriber)
            .cloned()
            .unwrap_or_default()
    }

    fn select_targets(
        &self,
        publisher: &str,
    ) -> Result<Vec<String>, PolicyError> {
        Ok(vec![publisher.to_string()])
    }
}

/// Почтовый ящик подписчика: всё, что дошло до его callback'а.
#[derive(Clone, Default)]
pub struct Inbox {
    messages: Arc<Mutex<Vec<String>>>,
}

impl Inbox {
    pub fn callback(&self) -> impl Fn(&String) + Send + Sync + 'static {
        let messages = Arc::clone(&self.messages);
        move |message: &String| messages.lock().push(message.clone())
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.messages.lock())
    }

    pub fn count(
        &self,
        message: &str,
    ) -> usize {
        self.messages
            .lock()
            .iter()
            .filter(|m| m.as_str() == message)
            .count()
    }
}

/// Брокер-обёртка, считающий вызовы `subscribe` и `unsubscribe`.
pub struct CountingBroker {
    inner: Arc<dyn Broker<String, u32, String>>,
    subscribes: AtomicUsize,
    unsubscribes: AtomicUsize,
}

impl CountingBroker {
    pub fn new(inner: Arc<dyn Broker<String, u32, String>>) -> Self {
        Self {
            inner,
            subscribes: AtomicUsize::new(0),
            unsubscribes: AtomicUsize::new(0),
        }
    }

    /// Возвращает `(subscribe, unsubscribe)` с момента прошлого вызова.
    pub fn take_counts(&self) -> (usize, usize) {
        (
            self.subscribes.swap(0, Ordering::SeqCst),
            self.unsubscribes.swap(0, Ordering::SeqCst),
        )
    }
}

impl Broker<String, u32, String> for CountingBroker {
    fn subscribe(
        &self,
        topic: &String,
        subscriber: &u32,
        callback: Callback<String>,
    ) {
        self.subscribes.fetch_add(1, Ordering::SeqCst);
        self.inner.subscribe(topic, subscriber, callback);
    }

    fn unsubscribe(
        &self,
        topic: &String,
        subscriber: &u32,
    ) {
        self.unsubscribes.fetch_add(1, Ordering::SeqCst);
        self.inner.unsubscribe(topic, subscriber);
    }

    fn publish(
        &self,
        topic: &String,
        message: &String,
    ) {
        self.inner.publish(topic, message);
    }

    fn topic_count(&self) -> usize {
        self.inner.topic_count()
    }

    fn has_topic(
        &self,
        topic: &String,
    ) -> bool {
        self.inner.has_topic(topic)
    }

    fn stats(&self) -> BrokerStats {
        self.inner.stats()
    }
}
