use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{
    error::ConfigError,
    logging::LoggingConfig,
    messaging::{dyconit::validate_descriptor, BrokerKind, ChannelKind},
    world::WorldId,
};

/// Корневая конфигурация процесса.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub broker: BrokerSettings,
    pub policy: PolicySettings,
    pub executor: ExecutorSettings,
    pub logging: LoggingConfig,
}

/// Выбор реализации брокера и канала.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerSettings {
    /// `Concurrent`, `Sharded`, `ReadWrite` или `Middleware`.
    pub kind: String,
    /// `Concurrent`, `ReadWrite` или `Snapshot`.
    pub channel: String,
    /// Число шардов для `Sharded`.
    pub shards: usize,
    /// Адрес внешнего транспорта, обязателен для `Middleware`.
    pub uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySettings {
    pub world: u32,
    /// Дальность обзора сервера в чанках.
    pub view_distance: u32,
    /// Строка политики dyconit, например `quadratic` или `single;20;5`.
    pub dyconit: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorSettings {
    /// Число рабочих потоков; `None` означает число ядер.
    pub pool_size: Option<usize>,
}

pub const ENV_PREFIX: &str = "REGIONBUS";

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl Settings {
    /// Загружает настройки. Источники в порядке возрастания приоритета:
    /// значения по умолчанию, файл `path`, переменные окружения вида
    /// `REGIONBUS_BROKER__KIND`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let defaults = BrokerSettings::default();
        let mut builder = Config::builder()
            .set_default("broker.kind", defaults.kind)?
            .set_default("broker.channel", defaults.channel)?
            .set_default("broker.shards", defaults.shards as u64)?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let settings: Settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn broker_kind(&self) -> Result<BrokerKind, ConfigError> {
        self.broker.kind.parse()
    }

    pub fn channel_kind(&self) -> Result<ChannelKind, ConfigError> {
        self.broker.channel.parse()
    }

    pub fn world(&self) -> WorldId {
        WorldId(self.policy.world)
    }

    /// Проверяет согласованность значений, которые не ловит десериализация.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let kind = self.broker_kind()?;
        self.channel_kind()?;

        if self.broker.shards == 0 {
            return Err(ConfigError::invalid_parameter(
                "broker.shards",
                "0",
                "must be at least 1",
            ));
        }
        if kind == BrokerKind::Middleware && self.broker.uri.is_none() {
            return Err(ConfigError::MissingValue("broker.uri"));
        }
        if self.policy.view_distance == 0 {
            return Err(ConfigError::invalid_parameter(
                "policy.view_distance",
                "0",
                "must be at least 1",
            ));
        }
        if let Some(descriptor) = &self.policy.dyconit {
            validate_descriptor(descriptor)?;
        }
        if let Some(0) = self.executor.pool_size {
            return Err(ConfigError::invalid_parameter(
                "executor.pool_size",
                "0",
                "must be at least 1",
            ));
        }
        self.logging.validate()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие трейты
////////////////////////////////////////////////////////////////////////////////

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            kind: BrokerKind::Concurrent.name().to_string(),
            channel: ChannelKind::Concurrent.name().to_string(),
            shards: crate::messaging::brokers::DEFAULT_SHARDS,
            uri: None,
        }
    }
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            world: 0,
            view_distance: 8,
            dyconit: None,
        }
    }
}
