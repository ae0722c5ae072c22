//! Брокер, делегирующий распределение внешнему транспорту.
//!
//! На каждую локально непустую тему приходится одна подписка транспорта.
//! Исходящие сообщения кодируются и передаются транспорту; входящие кадры
//! декодируются и публикуются в локальный канал темы.

pub mod codec;
pub mod transport;

use std::{
    fmt::Display,
    hash::Hash,
    marker::PhantomData,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use bytes::Bytes;
use dashmap::DashMap;
use tracing::{error, info, warn};

pub use codec::{JsonCodec, MessageCodec};
pub use transport::{
    Connector, FrameHandler, LoopbackConnector, LoopbackHub, LoopbackTransport, Transport,
    LOOPBACK_SCHEME,
};

use crate::{
    error::BrokerError,
    messaging::{
        channel::{Channel, ConcurrentChannel},
        Broker, BrokerMetrics, BrokerStats, Callback,
    },
};

pub struct MiddlewareBroker<T, S, M, C = ConcurrentChannel<S, M>> {
    uri: String,
    transport: Arc<dyn Transport>,
    codec: Arc<dyn MessageCodec<M>>,
    local: Arc<DashMap<T, Route<C>>>,
    metrics: Arc<BrokerMetrics>,
    closed: AtomicBool,
    _marker: PhantomData<fn(&S)>,
}

/// Локальный канал темы и признак подписки транспорта на неё.
///
/// Пока `attached == false`, подписка транспорта повторяется при каждом
/// `subscribe` и `publish` в тему.
struct Route<C> {
    channel: Arc<C>,
    attached: bool,
}

impl<T, S, M, C> MiddlewareBroker<T, S, M, C>
where
    T: Eq + Hash + Clone + Display + Send + Sync + 'static,
    M: 'static,
    C: Channel<S, M> + Default + 'static,
{
    /// Подключается к внешнему брокеру. Ошибка соединения возвращается
    /// сразу.
    pub fn connect(
        uri: &str,
        connector: &dyn Connector,
        codec: Arc<dyn MessageCodec<M>>,
    ) -> Result<Self, BrokerError> {
        let transport = connector.connect(uri)?;
        info!(%uri, "Middleware broker connected");
        Ok(Self {
            uri: uri.to_string(),
            transport,
            codec,
            local: Arc::new(DashMap::new()),
            metrics: Arc::new(BrokerMetrics::default()),
            closed: AtomicBool::new(false),
            _marker: PhantomData,
        })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Ждёт доставки всех уже отправленных кадров.
    pub fn flush(&self) -> Result<(), BrokerError> {
        self.transport.flush()
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Подписывает транспорт на тему, если это ещё не удалось.
    ///
    /// Вызывается под блокировкой записи темы.
    fn ensure_attached(
        &self,
        topic: &T,
        route: &mut Route<C>,
    ) {
        if route.attached {
            return;
        }
        let name = topic.to_string();
        match self.transport.subscribe(&name, self.inbound_handler(topic)) {
            Ok(()) => route.attached = true,
            Err(err) => {
                error!(topic = %name, %err, "Failed to subscribe transport, will retry");
            }
        }
    }

    fn inbound_handler(
        &self,
        topic: &T,
    ) -> FrameHandler {
        let topic = topic.clone();
        let local = Arc::clone(&self.local);
        let codec = Arc::clone(&self.codec);
        let metrics = Arc::clone(&self.metrics);

        Arc::new(move |frame: Bytes| {
            let message = match codec.decode(&frame) {
                Ok(message) => message,
                Err(err) => {
                    warn!(%topic, %err, "Dropping undecodable frame");
                    return;
                }
            };
            let channel = local
                .get(&topic)
                .map(|route| Arc::clone(&route.channel));
            if let Some(channel) = channel {
                metrics.record_delivery(channel.publish(&message));
            }
        })
    }
}

impl<T, S, M, C> Broker<T, S, M> for MiddlewareBroker<T, S, M, C>
where
    T: Eq + Hash + Clone + Display + Send + Sync + 'static,
    M: 'static,
    C: Channel<S, M> + Default + 'static,
{
    fn subscribe(
        &self,
        topic: &T,
        subscriber: &S,
        callback: Callback<M>,
    ) {
        if self.is_closed() {
            warn!(%topic, "Subscribe on closed middleware broker ignored");
            return;
        }

        let mut route = self.local.entry(topic.clone()).or_insert_with(|| Route {
            channel: Arc::new(C::default()),
            attached: false,
        });
        route.channel.subscribe(subscriber, callback);
        self.ensure_attached(topic, &mut route);
    }

    fn unsubscribe(
        &self,
        topic: &T,
        subscriber: &S,
    ) {
        self.local.remove_if(topic, |_, route| {
            route.channel.unsubscribe(subscriber);
            if !route.channel.is_empty() {
                return false;
            }
            // Отписка транспорта под той же блокировкой сегмента, чтобы
            // не снять маршрут, созданный параллельной подпиской.
            if route.attached {
                if let Err(err) = self.transport.unsubscribe(&topic.to_string()) {
                    warn!(%topic, %err, "Failed to unsubscribe transport");
                }
            }
            true
        });
    }

    fn publish(
        &self,
        topic: &T,
        message: &M,
    ) {
        if self.is_closed() {
            warn!(%topic, "Publish on closed middleware broker dropped");
            self.metrics.record_publish(None);
            return;
        }
        if let Some(mut route) = self.local.get_mut(topic) {
            self.ensure_attached(topic, &mut route);
        }

        let sent = self
            .codec
            .encode(message)
            .map_err(BrokerError::from)
            .and_then(|frame| self.transport.publish(&topic.to_string(), frame));
        match sent {
            Ok(()) => self.metrics.record_sent(),
            Err(err) => {
                warn!(%topic, %err, "Failed to publish through transport");
                self.metrics.record_publish(None);
            }
        }
    }

    fn close(&self) -> Result<(), BrokerError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.local.clear();
        self.transport.close()?;
        info!(uri = %self.uri, "Middleware broker closed");
        Ok(())
    }

    fn topic_count(&self) -> usize {
        self.local.len()
    }

    fn has_topic(
        &self,
        topic: &T,
    ) -> bool {
        self.local.contains_key(topic)
    }

    fn stats(&self) -> BrokerStats {
        self.metrics.snapshot()
    }
}
