use std::{collections::HashSet, sync::Arc};

use regionbus::{
    new_in_process, AcceptAll, Broker, BrokerKind, ChannelKind, ChunkKey, ChunkPolicy, Filter,
    Location, MessagingSystem, Policy, Source, Viewer, WorldId,
};
use rstest::rstest;

mod support;
use support::{Inbox, TablePolicy};

type System = MessagingSystem<String, str, u32, String>;

fn system_with(
    broker: BrokerKind,
    channel: ChannelKind,
    filter: Arc<dyn Filter<u32, String>>,
) -> (Arc<TablePolicy>, System) {
    let policy = Arc::new(TablePolicy::default());
    let broker: Arc<dyn Broker<String, u32, String>> =
        new_in_process(broker, channel, 4).expect("in-process broker");
    let system = MessagingSystem::new(
        Arc::clone(&policy) as Arc<dyn Policy<String, str, u32>>,
        broker,
        filter,
    );
    (policy, system)
}

fn publish(
    system: &System,
    topic: &str,
    message: &str,
) {
    system
        .broadcast(topic, &message.to_string())
        .expect("table policy accepts any topic");
}

/// Подписчик с интересом `{T1, T2}` получает сообщение, опубликованное в
/// `T1`, ровно один раз.
#[rstest]
fn test_update_then_broadcast_delivers_once(
    #[values(BrokerKind::Concurrent, BrokerKind::Sharded, BrokerKind::ReadWrite)]
    broker: BrokerKind,
    #[values(ChannelKind::Concurrent, ChannelKind::ReadWrite, ChannelKind::Snapshot)]
    channel: ChannelKind,
) {
    let (policy, system) = system_with(broker, channel, Arc::new(AcceptAll));
    let inbox = Inbox::default();

    policy.set(1, &["T1", "T2"]);
    system.update(&1, inbox.callback());
    publish(&system, "T1", "m1");

    assert_eq!(inbox.take(), vec!["m1".to_string()]);
    assert_eq!(system.broker().topic_count(), 2);
}

/// После смены интереса на `{T2, T3}` публикация в `T1` подписчику не
/// приходит, а в `T3` приходит.
#[rstest]
fn test_interest_change_moves_delivery(
    #[values(BrokerKind::Concurrent, BrokerKind::Sharded, BrokerKind::ReadWrite)]
    broker: BrokerKind,
    #[values(ChannelKind::Concurrent, ChannelKind::ReadWrite, ChannelKind::Snapshot)]
    channel: ChannelKind,
) {
    let (policy, system) = system_with(broker, channel, Arc::new(AcceptAll));
    let inbox = Inbox::default();

    policy.set(1, &["T1", "T2"]);
    system.update(&1, inbox.callback());
    policy.set(1, &["T2", "T3"]);
    system.update(&1, inbox.callback());

    publish(&system, "T1", "stale");
    publish(&system, "T3", "fresh");
    publish(&system, "T2", "kept");

    assert_eq!(inbox.take(), vec!["fresh".to_string(), "kept".to_string()]);
    assert!(!system.broker().has_topic(&"T1".to_string()));
    let expected: HashSet<String> = ["T2", "T3"].iter().map(|t| t.to_string()).collect();
    assert_eq!(system.interest_set(&1), Some(expected));
}

/// Два подписчика на `T1`; после того как первый теряет интерес, в `T1`
/// получает только второй.
#[rstest]
fn test_lost_interest_stops_delivery_to_that_subscriber_only(
    #[values(BrokerKind::Concurrent, BrokerKind::Sharded, BrokerKind::ReadWrite)]
    broker: BrokerKind,
    #[values(ChannelKind::Concurrent, ChannelKind::ReadWrite, ChannelKind::Snapshot)]
    channel: ChannelKind,
) {
    let (policy, system) = system_with(broker, channel, Arc::new(AcceptAll));
    let (first, second) = (Inbox::default(), Inbox::default());

    policy.set(1, &["T1"]);
    policy.set(2, &["T1"]);
    system.update(&1, first.callback());
    system.update(&2, second.callback());
    publish(&system, "T1", "both");

    policy.set(1, &[]);
    system.update(&1, first.callback());
    publish(&system, "T1", "second only");

    assert_eq!(first.take(), vec!["both".to_string()]);
    assert_eq!(
        second.take(),
        vec!["both".to_string(), "second only".to_string()]
    );
    assert_eq!(system.subscriber_count(), 1);
    assert_eq!(system.interest_set(&1), None);
}

#[rstest]
fn test_last_subscriber_leaving_removes_topics(
    #[values(BrokerKind::Concurrent, BrokerKind::Sharded, BrokerKind::ReadWrite)]
    broker: BrokerKind,
    #[values(ChannelKind::Concurrent, ChannelKind::ReadWrite, ChannelKind::Snapshot)]
    channel: ChannelKind,
) {
    let (policy, system) = system_with(broker, channel, Arc::new(AcceptAll));
    let inbox = Inbox::default();

    policy.set(7, &["A", "B", "C"]);
    system.update(&7, inbox.callback());
    assert_eq!(system.broker().topic_count(), 3);

    policy.set(7, &[]);
    system.update(&7, inbox.callback());
    assert_eq!(system.broker().topic_count(), 0);

    publish(&system, "A", "nobody");
    assert!(inbox.take().is_empty());
    assert_eq!(system.broker().stats().dropped, 1);
}

/// Фильтр решает для каждой пары (подписчик, сообщение) отдельно.
#[rstest]
fn test_filter_gates_each_subscriber(
    #[values(BrokerKind::Concurrent, BrokerKind::ReadWrite)] broker: BrokerKind,
    #[values(ChannelKind::Concurrent, ChannelKind::Snapshot)] channel: ChannelKind,
) {
    let muted = |subscriber: &u32, message: &String| *subscriber != 2 || !message.starts_with('!');
    let (policy, system) = system_with(broker, channel, Arc::new(muted));
    let (first, second) = (Inbox::default(), Inbox::default());

    policy.set(1, &["T"]);
    policy.set(2, &["T"]);
    system.update(&1, first.callback());
    system.update(&2, second.callback());

    publish(&system, "T", "!alert");
    publish(&system, "T", "hello");

    assert_eq!(first.count("!alert"), 1);
    assert_eq!(second.count("!alert"), 0);
    assert_eq!(second.count("hello"), 1);
}

/// Повторный `update` с тем же интересом не создаёт дубликатов.
#[test]
fn test_repeated_update_does_not_duplicate() {
    let (policy, system) = system_with(
        BrokerKind::Concurrent,
        ChannelKind::Concurrent,
        Arc::new(AcceptAll),
    );
    let inbox = Inbox::default();

    policy.set(3, &["T"]);
    for _ in 0..5 {
        system.update(&3, inbox.callback());
    }
    publish(&system, "T", "once");
    assert_eq!(inbox.count("once"), 1);
}

struct Spectator {
    location: Location,
    view_distance: u32,
}

impl Viewer for Spectator {
    fn location(&self) -> Location {
        self.location
    }

    fn view_distance(&self) -> u32 {
        self.view_distance
    }
}

/// Политика чанков с радиусом 2 вокруг (0, 0) даёт ровно 25 чанков
/// из `[-2, 2] × [-2, 2]`.
#[test]
fn test_chunk_policy_radius_two_yields_twenty_five_chunks() {
    let policy = ChunkPolicy::<Spectator>::new(WorldId(0), 2);
    let spectator = Spectator {
        location: Location::new(WorldId(0), 8.0, 70.0, 8.0),
        view_distance: 10,
    };

    let interest = policy.compute_interest_set(&spectator);

    let expected: HashSet<ChunkKey> = (-2..=2)
        .flat_map(|x| (-2..=2).map(move |z| ChunkKey::new(x, z)))
        .collect();
    assert_eq!(interest.len(), 25);
    assert_eq!(interest, expected);

    let targets = policy
        .select_targets(&ChunkKey::new(1, -1) as &dyn Source)
        .unwrap();
    assert_eq!(targets, vec![ChunkKey::new(1, -1)]);
}
