//! Property-based тесты для `MessagingSystem`.
//!
//! Генерируют последовательности множеств интереса и проверяют, что
//! брокер получает только разницу и что доставка совпадает с последним
//! вычисленным интересом.

use std::{collections::HashSet, sync::Arc};

use proptest::prelude::*;
use regionbus::{
    new_in_process, AcceptAll, Broker, BrokerKind, ChannelKind, MessagingSystem, Policy,
};

mod support;
use support::{CountingBroker, Inbox, TablePolicy};

const PROPTEST_CASES: u32 = 200;
const TOPICS: [&str; 8] = ["t0", "t1", "t2", "t3", "t4", "t5", "t6", "t7"];

fn interest_set() -> impl Strategy<Value = Vec<&'static str>> {
    proptest::sample::subsequence(TOPICS.to_vec(), 0..=TOPICS.len())
}

fn broker_kind() -> impl Strategy<Value = BrokerKind> {
    prop_oneof![
        Just(BrokerKind::Concurrent),
        Just(BrokerKind::Sharded),
        Just(BrokerKind::ReadWrite),
    ]
}

fn channel_kind() -> impl Strategy<Value = ChannelKind> {
    prop_oneof![
        Just(ChannelKind::Concurrent),
        Just(ChannelKind::ReadWrite),
        Just(ChannelKind::Snapshot),
    ]
}

fn as_set(topics: &[&str]) -> HashSet<String> {
    topics.iter().map(|t| t.to_string()).collect()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: PROPTEST_CASES,
        ..ProptestConfig::default()
    })]

    /// Каждый `update` вызывает `subscribe` ровно для новых тем и
    /// `unsubscribe` ровно для исчезнувших.
    #[test]
    fn prop_update_sends_only_the_difference(
        steps in prop::collection::vec(interest_set(), 1..12),
        broker in broker_kind(),
        channel in channel_kind(),
    ) {
        let policy = Arc::new(TablePolicy::default());
        let inner = new_in_process(broker, channel, 4).unwrap();
        let counting = Arc::new(CountingBroker::new(inner));
        let system = MessagingSystem::new(
            Arc::clone(&policy) as Arc<dyn Policy<String, str, u32>>,
            Arc::clone(&counting) as Arc<dyn Broker<String, u32, String>>,
            Arc::new(AcceptAll),
        );
        let inbox = Inbox::default();

        let mut previous = HashSet::new();
        for step in &steps {
            let next = as_set(step);
            policy.set(1, step);
            system.update(&1, inbox.callback());

            let (subscribes, unsubscribes) = counting.take_counts();
            prop_assert_eq!(subscribes, next.difference(&previous).count());
            prop_assert_eq!(unsubscribes, previous.difference(&next).count());
            prop_assert_eq!(counting.topic_count(), next.len());
            previous = next;
        }
    }

    /// После любой последовательности обновлений подписчик получает ровно
    /// одну копию сообщения из каждой темы последнего интереса и ничего
    /// из остальных.
    #[test]
    fn prop_delivery_matches_latest_interest(
        steps in prop::collection::vec(interest_set(), 1..12),
        broker in broker_kind(),
        channel in channel_kind(),
    ) {
        let policy = Arc::new(TablePolicy::default());
        let system = MessagingSystem::new(
            Arc::clone(&policy) as Arc<dyn Policy<String, str, u32>>,
            new_in_process::<String, u32, String>(broker, channel, 4).unwrap(),
            Arc::new(AcceptAll),
        );
        let inbox = Inbox::default();

        for step in &steps {
            policy.set(9, step);
            system.update(&9, inbox.callback());
        }
        let last = as_set(steps.last().unwrap());

        for topic in TOPICS {
            system.broadcast(topic, &topic.to_string()).unwrap();
        }

        let received = inbox.take();
        let unique: HashSet<String> = received.iter().cloned().collect();
        prop_assert_eq!(received.len(), unique.len());
        prop_assert_eq!(unique, last.clone());
        prop_assert_eq!(system.broker().topic_count(), last.len());
    }
}
