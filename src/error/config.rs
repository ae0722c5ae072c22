use thiserror::Error;

/// Ошибки конфигурации.
///
/// Все варианты означают ошибку развёртывания и возвращаются сразу,
/// без повторных попыток.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown broker type: {0}")]
    UnknownBrokerType(String),

    #[error("Unknown channel type: {0}")]
    UnknownChannelType(String),

    #[error("Invalid value '{value}' for parameter '{name}': {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration value: {0}")]
    MissingValue(&'static str),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

impl ConfigError {
    pub fn invalid_parameter(
        name: impl Into<String>,
        value: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        ConfigError::InvalidParameter {
            name: name.into(),
            value: value.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_type_display() {
        assert_eq!(
            ConfigError::UnknownBrokerType("Kafka".into()).to_string(),
            "Unknown broker type: Kafka"
        );
        assert_eq!(
            ConfigError::UnknownChannelType("Unsafe".into()).to_string(),
            "Unknown channel type: Unsafe"
        );
    }

    /// Тест проверяет, что в сообщении видны имя параметра, значение и причина.
    #[test]
    fn test_invalid_parameter_display() {
        let err = ConfigError::invalid_parameter("staleness", "ten", "not a number");
        assert_eq!(
            err.to_string(),
            "Invalid value 'ten' for parameter 'staleness': not a number"
        );
    }
}
