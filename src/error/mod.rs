//! Типы ошибок regionbus, по одному enum на подсистему.

pub mod broker;
pub mod config;
pub mod executor;
pub mod policy;

pub use broker::{BrokerError, CodecError};
pub use config::ConfigError;
pub use executor::ExecutorError;
pub use policy::PolicyError;
