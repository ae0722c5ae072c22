//! regionbus: публикация/подписка с управлением интересом для серверов,
//! мир которых разбит на регионы, и приоритетный пул потоков для
//! фоновых вычислений, которые питают эти публикации.

/// Загрузка настроек (файл + переменные окружения).
pub mod config;
/// Типы ошибок по подсистемам.
pub mod error;
/// Сортируемая блокирующая очередь и приоритетный пул потоков.
pub mod executor;
/// Инициализация `tracing` (фильтры, форматы, файловый вывод).
pub mod logging;
/// Брокеры, каналы, политики интереса и фильтры.
pub mod messaging;
/// Чанки, позиции и трейты подписчиков и сообщений.
pub mod world;

// -----------------------------------------------------------------------------
//  Часто используемые публичные типы
// -----------------------------------------------------------------------------

pub use config::{BrokerSettings, ExecutorSettings, PolicySettings, Settings};
pub use error::{BrokerError, CodecError, ConfigError, ExecutorError, PolicyError};
pub use executor::{
    ExecutorStats, PriorityExecutor, PriorityTask, RankedJob, SortableBlockingQueue, TaskHandle,
    TaskState,
};
pub use logging::{init_logging, LoggingConfig, LoggingHandle};
pub use messaging::{
    brokers::{JsonCodec, LoopbackConnector},
    dyconit::{policy_from_str, DyconitPolicy, DyconitPolicyAdapter},
    new_configured, new_in_process,
    policies::ChunkPolicy,
    AcceptAll, Broker, BrokerKind, BrokerStats, Callback, ChannelKind, Filter, KindFilter,
    MessagingSystem, Policy, Source,
};
pub use world::{Block, ChunkKey, Classified, Entity, Location, Viewer, WorldId};
