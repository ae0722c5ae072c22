use thiserror::Error;

/// Ошибки политик интересов.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// Политика не умеет сопоставить издателя такого типа с топиком.
    #[error("Cannot select target topic for type: {type_name}")]
    UnsupportedPublisher { type_name: &'static str },
}
