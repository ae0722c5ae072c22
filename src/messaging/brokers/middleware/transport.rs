use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        mpsc, Arc,
    },
    thread::{self, JoinHandle},
};

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::error::BrokerError;

/// Обработчик входящих кадров одной темы.
pub type FrameHandler = Arc<dyn Fn(Bytes) + Send + Sync>;

/// Соединение с внешним брокером сообщений.
///
/// `publish` не должен блокироваться на вводе-выводе: кадры буферизуются
/// и доставляются обработчикам асинхронно.
pub trait Transport: Send + Sync {
    fn subscribe(
        &self,
        topic: &str,
        handler: FrameHandler,
    ) -> Result<(), BrokerError>;

    fn unsubscribe(
        &self,
        topic: &str,
    ) -> Result<(), BrokerError>;

    fn publish(
        &self,
        topic: &str,
        frame: Bytes,
    ) -> Result<(), BrokerError>;

    /// Ждёт, пока все уже принятые кадры будут доставлены.
    fn flush(&self) -> Result<(), BrokerError> {
        Ok(())
    }

    fn close(&self) -> Result<(), BrokerError>;
}

/// Устанавливает соединения по URI.
pub trait Connector: Send + Sync {
    fn connect(
        &self,
        uri: &str,
    ) -> Result<Arc<dyn Transport>, BrokerError>;
}

pub const LOOPBACK_SCHEME: &str = "loopback://";

/// Внутрипроцессный «внешний» брокер с отдельным потоком доставки.
///
/// Каждое соединение получает свой идентификатор, так что несколько
/// брокеров могут подписаться на одну тему через один хаб.
pub struct LoopbackHub {
    name: String,
    routes: Arc<RwLock<Routes>>,
    sender: Mutex<Option<mpsc::Sender<Frame>>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    next_connection: AtomicU64,
}

type Routes = HashMap<String, HashMap<u64, FrameHandler>>;

enum Frame {
    Publish { topic: String, payload: Bytes },
    Flush(mpsc::Sender<()>),
}

/// Соединение с [`LoopbackHub`].
pub struct LoopbackTransport {
    hub: Arc<LoopbackHub>,
    id: u64,
}

/// Фабрика соединений для URI вида `loopback://<hub>`.
///
/// Соединения с одинаковым именем хаба, полученные от одного
/// коннектора, разделяют один хаб. Поток доставки хаба завершается,
/// когда закрыты все его соединения и сам коннектор.
#[derive(Default)]
pub struct LoopbackConnector {
    hubs: Mutex<HashMap<String, Arc<LoopbackHub>>>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl LoopbackHub {
    /// Создаёт хаб и запускает поток доставки.
    pub fn start(name: impl Into<String>) -> Result<Arc<Self>, BrokerError> {
        let name = name.into();
        let routes: Arc<RwLock<Routes>> = Arc::new(RwLock::new(HashMap::new()));
        let (tx, rx) = mpsc::channel::<Frame>();

        let dispatcher_routes = Arc::clone(&routes);
        let dispatcher = thread::Builder::new()
            .name(format!("loopback-{name}"))
            .spawn(move || dispatch_loop(rx, dispatcher_routes))
            .map_err(|err| BrokerError::Connection {
                uri: format!("{LOOPBACK_SCHEME}{name}"),
                reason: err.to_string(),
            })?;

        debug!(hub = %name, "Loopback hub started");
        Ok(Arc::new(Self {
            name,
            routes,
            sender: Mutex::new(Some(tx)),
            dispatcher: Mutex::new(Some(dispatcher)),
            next_connection: AtomicU64::new(0),
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Открывает новое соединение с хабом.
    pub fn connect(self: &Arc<Self>) -> LoopbackTransport {
        LoopbackTransport {
            hub: Arc::clone(self),
            id: self.next_connection.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Количество тем, на которые подписано хотя бы одно соединение.
    pub fn topic_count(&self) -> usize {
        self.routes.read().len()
    }

    /// Останавливает поток доставки. Недоставленные кадры доставляются
    /// до выхода потока.
    pub fn shutdown(&self) {
        self.sender.lock().take();
        if let Some(handle) = self.dispatcher.lock().take() {
            if handle.join().is_err() {
                warn!(hub = %self.name, "Loopback dispatcher panicked");
            }
        }
    }

    fn send(
        &self,
        frame: Frame,
    ) -> Result<(), BrokerError> {
        let sender = self.sender.lock();
        let sender = sender.as_ref().ok_or(BrokerError::Closed)?;
        sender.send(frame).map_err(|_| BrokerError::Closed)
    }
}

impl LoopbackConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Хаб с данным именем, если к нему уже подключались.
    pub fn hub(
        &self,
        name: &str,
    ) -> Option<Arc<LoopbackHub>> {
        self.hubs.lock().get(name).cloned()
    }
}

fn dispatch_loop(
    frames: mpsc::Receiver<Frame>,
    routes: Arc<RwLock<Routes>>,
) {
    for frame in frames {
        match frame {
            Frame::Publish { topic, payload } => {
                let handlers: Vec<FrameHandler> = routes
                    .read()
                    .get(&topic)
                    .map(|subs| subs.values().cloned().collect())
                    .unwrap_or_default();
                for handler in handlers {
                    handler(payload.clone());
                }
            }
            Frame::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Реализация трейтов
////////////////////////////////////////////////////////////////////////////////

impl Transport for LoopbackTransport {
    fn subscribe(
        &self,
        topic: &str,
        handler: FrameHandler,
    ) -> Result<(), BrokerError> {
        self.hub
            .routes
            .write()
            .entry(topic.to_string())
            .or_default()
            .insert(self.id, handler);
        Ok(())
    }

    fn unsubscribe(
        &self,
        topic: &str,
    ) -> Result<(), BrokerError> {
        let mut routes = self.hub.routes.write();
        if let Some(subs) = routes.get_mut(topic) {
            subs.remove(&self.id);
            if subs.is_empty() {
                routes.remove(topic);
            }
        }
        Ok(())
    }

    fn publish(
        &self,
        topic: &str,
        frame: Bytes,
    ) -> Result<(), BrokerError> {
        self.hub.send(Frame::Publish {
            topic: topic.to_string(),
            payload: frame,
        })
    }

    fn flush(&self) -> Result<(), BrokerError> {
        let (tx, rx) = mpsc::channel();
        self.hub.send(Frame::Flush(tx))?;
        rx.recv().map_err(|_| BrokerError::Closed)
    }

    fn close(&self) -> Result<(), BrokerError> {
        let mut routes = self.hub.routes.write();
        routes.retain(|_, subs| {
            subs.remove(&self.id);
            !subs.is_empty()
        });
        Ok(())
    }
}

impl Connector for LoopbackConnector {
    fn connect(
        &self,
        uri: &str,
    ) -> Result<Arc<dyn Transport>, BrokerError> {
        let name = uri
            .strip_prefix(LOOPBACK_SCHEME)
            .ok_or_else(|| BrokerError::UnsupportedScheme(uri.to_string()))?;
        if name.is_empty() || name.contains('/') {
            return Err(BrokerError::Connection {
                uri: uri.to_string(),
                reason: "hub name must be a single non-empty segment".to_string(),
            });
        }

        let mut hubs = self.hubs.lock();
        let hub = match hubs.get(name) {
            Some(hub) => Arc::clone(hub),
            None => {
                let hub = LoopbackHub::start(name)?;
                hubs.insert(name.to_string(), Arc::clone(&hub));
                hub
            }
        };
        Ok(Arc::new(hub.connect()))
    }
}
