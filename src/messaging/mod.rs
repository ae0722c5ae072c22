//! Обмен сообщениями с управлением интересом.
//!
//! - `system`: [`MessagingSystem`], связывающий политику, брокер и фильтр.
//! - `broker`, `brokers`: трейт [`Broker`] и его реализации.
//! - `channel`: подписчики одной темы.
//! - `policy`, `policies`, `dyconit`: кто на что подписан и куда
//!   публикуется сообщение.
//! - `filter`: проверка сообщения перед доставкой конкретному подписчику.

pub mod broker;
pub mod brokers;
pub mod channel;
pub mod dyconit;
pub mod filter;
pub mod policies;
pub mod policy;
pub mod system;

pub use broker::*;
pub use brokers::{new_configured, new_in_process, BrokerKind, ChannelKind};
pub use channel::{Channel, DeliveryReport};
pub use filter::*;
pub use policy::*;
pub use system::*;
