//! Загрузка настроек: значения по умолчанию, необязательный файл и
//! переменные окружения `REGIONBUS_*`.

pub mod settings;

pub use settings::{BrokerSettings, ExecutorSettings, PolicySettings, Settings};
