use std::sync::Arc;

use parking_lot::Mutex;
use regionbus::{
    messaging::{brokers::MiddlewareBroker, channel::SnapshotChannel},
    AcceptAll, Broker, BrokerError, Callback, JsonCodec, LoopbackConnector, MessagingSystem,
    Policy,
};
use serde::{Deserialize, Serialize};

mod support;
use support::{Inbox, TablePolicy};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Update {
    topic: String,
    seq: u32,
}

type Node = MiddlewareBroker<String, u32, Update>;

fn node(connector: &LoopbackConnector) -> Arc<Node> {
    Arc::new(
        MiddlewareBroker::connect(
            "loopback://cluster",
            connector,
            Arc::new(JsonCodec::<Update>::new()),
        )
        .unwrap(),
    )
}

fn recorder(sink: &Arc<Mutex<Vec<Update>>>) -> Callback<Update> {
    let sink = Arc::clone(sink);
    Arc::new(move |update: &Update| sink.lock().push(update.clone()))
}

/// Сообщение, опубликованное через один узел, приходит подписчикам
/// всех узлов, подключённых к тому же хабу.
#[test]
fn test_publish_fans_out_across_nodes() {
    let connector = LoopbackConnector::new();
    let (a, b) = (node(&connector), node(&connector));
    let (on_a, on_b) = (
        Arc::new(Mutex::new(Vec::new())),
        Arc::new(Mutex::new(Vec::new())),
    );

    let topic = "chunk:0:0".to_string();
    a.subscribe(&topic, &1, recorder(&on_a));
    b.subscribe(&topic, &2, recorder(&on_b));

    let update = Update {
        topic: topic.clone(),
        seq: 1,
    };
    a.publish(&topic, &update);
    a.flush().unwrap();

    assert_eq!(*on_a.lock(), vec![update.clone()]);
    assert_eq!(*on_b.lock(), vec![update]);
    assert_eq!(a.stats().published, 1);
    assert_eq!(b.stats().delivered, 1);
}

/// Узел, чей последний локальный подписчик ушёл, больше не получает
/// кадры темы, а остальные узлы получают.
#[test]
fn test_detached_node_stops_receiving() {
    let connector = LoopbackConnector::new();
    let (a, b) = (node(&connector), node(&connector));
    let (on_a, on_b) = (
        Arc::new(Mutex::new(Vec::new())),
        Arc::new(Mutex::new(Vec::new())),
    );
    let topic = "chunk:1:1".to_string();
    a.subscribe(&topic, &1, recorder(&on_a));
    b.subscribe(&topic, &2, recorder(&on_b));

    b.unsubscribe(&topic, &2);
    assert!(!b.has_topic(&topic));

    a.publish(&topic, &Update { topic: topic.clone(), seq: 7 });
    a.flush().unwrap();

    assert_eq!(on_a.lock().len(), 1);
    assert!(on_b.lock().is_empty());
    let hub = connector.hub("cluster").unwrap();
    assert_eq!(hub.topic_count(), 1);
}

#[test]
fn test_closed_node_drops_topics_and_routes() {
    let connector = LoopbackConnector::new();
    let a = node(&connector);
    let topic = "chunk:2:2".to_string();
    a.subscribe(&topic, &1, Arc::new(|_: &Update| {}));

    a.close().unwrap();
    a.close().unwrap();

    assert_eq!(a.topic_count(), 0);
    assert_eq!(connector.hub("cluster").unwrap().topic_count(), 0);
}

#[test]
fn test_unsupported_scheme_is_rejected() {
    let connector = LoopbackConnector::new();
    let result = Node::connect(
        "redis://localhost:6379",
        &connector,
        Arc::new(JsonCodec::<Update>::new()),
    );
    assert!(matches!(result, Err(BrokerError::UnsupportedScheme(_))));
}

/// `MessagingSystem` поверх middleware-брокера ведёт себя так же, как
/// поверх внутрипроцессного: доставка идёт только по текущему интересу.
#[test]
fn test_messaging_system_over_middleware() {
    let connector = LoopbackConnector::new();
    let broker: Arc<MiddlewareBroker<String, u32, String, SnapshotChannel<u32, String>>> =
        Arc::new(
            MiddlewareBroker::connect(
                "loopback://system",
                &connector,
                Arc::new(JsonCodec::<String>::new()),
            )
            .unwrap(),
        );
    let policy = Arc::new(TablePolicy::default());
    let system = MessagingSystem::new(
        Arc::clone(&policy) as Arc<dyn Policy<String, str, u32>>,
        Arc::clone(&broker) as Arc<dyn Broker<String, u32, String>>,
        Arc::new(AcceptAll),
    );
    let inbox = Inbox::default();

    policy.set(1, &["T1", "T2"]);
    system.update(&1, inbox.callback());
    policy.set(1, &["T2", "T3"]);
    system.update(&1, inbox.callback());

    for topic in ["T1", "T2", "T3"] {
        system.broadcast(topic, &format!("via {topic}")).unwrap();
    }
    broker.flush().unwrap();

    let mut received = inbox.take();
    received.sort();
    assert_eq!(received, vec!["via T2".to_string(), "via T3".to_string()]);
    system.close().unwrap();
}
