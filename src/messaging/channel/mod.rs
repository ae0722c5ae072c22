//! Каналы: отображение «подписчик → callback» внутри одной темы.
//!
//! - `concurrent`: шардированная конкурентная карта (`DashMap`).
//! - `read_write`: обычная карта под `RwLock`.
//! - `snapshot`: копирование при записи; публикация идёт по неизменяемому
//!   снимку без блокировок, поэтому callback может обращаться к тому же
//!   каналу.

pub mod concurrent;
pub mod read_write;
pub mod snapshot;

use std::panic::{self, AssertUnwindSafe};

use tracing::warn;

pub use concurrent::ConcurrentChannel;
pub use read_write::ReadWriteChannel;
pub use snapshot::SnapshotChannel;

use super::Callback;

/// Множество подписчиков одной темы.
///
/// Подписчик присутствует не более одного раза; `is_empty()` истинно
/// тогда и только тогда, когда подписчиков нет.
pub trait Channel<S, M>: Send + Sync {
    fn is_empty(&self) -> bool;

    fn len(&self) -> usize;

    fn is_subscribed(
        &self,
        subscriber: &S,
    ) -> bool;

    /// Возвращает `true`, если подписчик добавлен. Существующий callback
    /// никогда не перезаписывается.
    fn subscribe(
        &self,
        subscriber: &S,
        callback: Callback<M>,
    ) -> bool;

    /// Возвращает `true`, если подписчик был удалён.
    fn unsubscribe(
        &self,
        subscriber: &S,
    ) -> bool;

    /// Вызывает callback каждого подписчика. Паника одного callback'а не
    /// мешает доставке остальным.
    fn publish(
        &self,
        message: &M,
    ) -> DeliveryReport;
}

/// Итог доставки одного сообщения.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

impl DeliveryReport {
    fn record(
        &mut self,
        ok: bool,
    ) {
        if ok {
            self.delivered += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Вызывает все `callbacks`, изолируя панику каждого.
pub(crate) fn deliver_all<'a, M, I>(
    callbacks: I,
    message: &M,
) -> DeliveryReport
where
    M: 'a,
    I: IntoIterator<Item = &'a Callback<M>>,
{
    let mut report = DeliveryReport::default();
    for callback in callbacks {
        report.record(deliver(callback, message));
    }
    report
}

fn deliver<M>(
    callback: &Callback<M>,
    message: &M,
) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(|| callback(message))) {
        Ok(()) => true,
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            warn!(%reason, "Subscriber callback failed");
            false
        }
    }
}
