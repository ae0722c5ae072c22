//! Реализации [`Broker`] и их выбор по имени.
//!
//! | Брокер       | Хранилище тем                                  |
//! |--------------|------------------------------------------------|
//! | `Concurrent` | `DashMap<T, Arc<C>>`                           |
//! | `Sharded`    | массив `Mutex<HashMap<T, Arc<C>>>` по хэшу темы |
//! | `ReadWrite`  | `RwLock<HashMap<T, C>>`                        |
//! | `Middleware` | внешний транспорт + локальные каналы           |
//!
//! Любой брокер сочетается с любым каналом из [`ChannelKind`].

pub mod concurrent;
pub mod middleware;
pub mod read_write;
pub mod sharded;

use std::{fmt, fmt::Display, hash::Hash, str::FromStr, sync::Arc};

pub use concurrent::ConcurrentBroker;
pub use middleware::{
    Connector, JsonCodec, LoopbackConnector, MessageCodec, MiddlewareBroker, Transport,
};
pub use read_write::ReadWriteBroker;
pub use sharded::{ShardedBroker, DEFAULT_SHARDS};

use super::{
    channel::{Channel, ConcurrentChannel, ReadWriteChannel, SnapshotChannel},
    Broker,
};
use crate::{
    config::BrokerSettings,
    error::{BrokerError, ConfigError},
};

/// Стратегия брокера.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrokerKind {
    Concurrent,
    Sharded,
    ReadWrite,
    Middleware,
}

/// Стратегия канала.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Concurrent,
    ReadWrite,
    Snapshot,
}

////////////////////////////////////////////////////////////////////////////////
// Фабрика
////////////////////////////////////////////////////////////////////////////////

/// Создаёт внутрипроцессный брокер.
///
/// `shards` используется только `Sharded`. Для `Middleware` нужен URI,
/// поэтому здесь он отклоняется; см. [`new_configured`].
pub fn new_in_process<T, S, M>(
    broker: BrokerKind,
    channel: ChannelKind,
    shards: usize,
) -> Result<Arc<dyn Broker<T, S, M>>, ConfigError>
where
    T: Eq + Hash + Clone + Send + Sync + 'static,
    S: Eq + Hash + Clone + Send + Sync + 'static,
    M: 'static,
{
    match channel {
        ChannelKind::Concurrent => with_channel::<T, S, M, ConcurrentChannel<S, M>>(broker, shards),
        ChannelKind::ReadWrite => with_channel::<T, S, M, ReadWriteChannel<S, M>>(broker, shards),
        ChannelKind::Snapshot => with_channel::<T, S, M, SnapshotChannel<S, M>>(broker, shards),
    }
}

/// Создаёт брокер по настройкам; `Middleware` подключается через
/// `connector` к `settings.uri` и кодирует сообщения `codec`.
pub fn new_configured<T, S, M>(
    settings: &BrokerSettings,
    connector: &dyn Connector,
    codec: Arc<dyn MessageCodec<M>>,
) -> Result<Arc<dyn Broker<T, S, M>>, BrokerError>
where
    T: Eq + Hash + Clone + Display + Send + Sync + 'static,
    S: Eq + Hash + Clone + Send + Sync + 'static,
    M: 'static,
{
    let broker: BrokerKind = settings.kind.parse()?;
    let channel: ChannelKind = settings.channel.parse()?;

    if broker != BrokerKind::Middleware {
        return Ok(new_in_process(broker, channel, settings.shards)?);
    }

    let uri = settings
        .uri
        .as_deref()
        .ok_or(ConfigError::MissingValue("broker.uri"))?;
    let broker: Arc<dyn Broker<T, S, M>> = match channel {
        ChannelKind::Concurrent => Arc::new(
            MiddlewareBroker::<T, S, M, ConcurrentChannel<S, M>>::connect(uri, connector, codec)?,
        ),
        ChannelKind::ReadWrite => Arc::new(
            MiddlewareBroker::<T, S, M, ReadWriteChannel<S, M>>::connect(uri, connector, codec)?,
        ),
        ChannelKind::Snapshot => Arc::new(
            MiddlewareBroker::<T, S, M, SnapshotChannel<S, M>>::connect(uri, connector, codec)?,
        ),
    };
    Ok(broker)
}

fn with_channel<T, S, M, C>(
    broker: BrokerKind,
    shards: usize,
) -> Result<Arc<dyn Broker<T, S, M>>, ConfigError>
where
    T: Eq + Hash + Clone + Send + Sync + 'static,
    S: 'static,
    M: 'static,
    C: Channel<S, M> + Default + 'static,
{
    let broker: Arc<dyn Broker<T, S, M>> = match broker {
        BrokerKind::Concurrent => Arc::new(ConcurrentBroker::<T, S, M, C>::new()),
        BrokerKind::Sharded => Arc::new(ShardedBroker::<T, S, M, C>::new(shards)),
        BrokerKind::ReadWrite => Arc::new(ReadWriteBroker::<T, S, M, C>::new()),
        BrokerKind::Middleware => return Err(ConfigError::MissingValue("broker.uri")),
    };
    Ok(broker)
}

////////////////////////////////////////////////////////////////////////////////
// Общие трейты
////////////////////////////////////////////////////////////////////////////////

impl BrokerKind {
    pub const ALL: [BrokerKind; 4] = [
        BrokerKind::Concurrent,
        BrokerKind::Sharded,
        BrokerKind::ReadWrite,
        BrokerKind::Middleware,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BrokerKind::Concurrent => "Concurrent",
            BrokerKind::Sharded => "Sharded",
            BrokerKind::ReadWrite => "ReadWrite",
            BrokerKind::Middleware => "Middleware",
        }
    }
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 3] = [
        ChannelKind::Concurrent,
        ChannelKind::ReadWrite,
        ChannelKind::Snapshot,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ChannelKind::Concurrent => "Concurrent",
            ChannelKind::ReadWrite => "ReadWrite",
            ChannelKind::Snapshot => "Snapshot",
        }
    }
}

/// Имена сравниваются без учёта регистра, `-` и `_`.
fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

impl FromStr for BrokerKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        BrokerKind::ALL
            .into_iter()
            .find(|kind| normalize(kind.name()) == wanted)
            .ok_or_else(|| ConfigError::UnknownBrokerType(s.to_string()))
    }
}

impl FromStr for ChannelKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        ChannelKind::ALL
            .into_iter()
            .find(|kind| normalize(kind.name()) == wanted)
            .ok_or_else(|| ConfigError::UnknownChannelType(s.to_string()))
    }
}

impl fmt::Display for BrokerKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}
