use thiserror::Error;

use super::ConfigError;

/// Ошибки брокеров и транспорта.
#[derive(Debug, Error)]
pub enum BrokerError {
    // ==== Транспорт ====
    #[error("Failed to connect to {uri}: {reason}")]
    Connection { uri: String, reason: String },

    #[error("Unsupported transport scheme in URI: {0}")]
    UnsupportedScheme(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Broker is closed")]
    Closed,

    // ==== Кодирование ====
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    // ==== Конфигурация ====
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Ошибки кодирования сообщений для внешнего брокера.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed frame: {0}")]
    Malformed(String),
}
