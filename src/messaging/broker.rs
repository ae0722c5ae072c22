use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use super::channel::DeliveryReport;
use crate::error::BrokerError;

/// Функция доставки сообщения одному подписчику.
pub type Callback<M> = Arc<dyn Fn(&M) + Send + Sync>;

/// Распределяет сообщения подписчикам по темам.
///
/// Темы создаются лениво при первой подписке и удаляются в момент, когда
/// у них не остаётся подписчиков. Изменения одной темы атомарны
/// относительно конкурентных `subscribe`/`unsubscribe`/`publish` той же
/// темы.
pub trait Broker<T, S, M>: Send + Sync {
    /// Регистрирует `callback` подписчика на теме. Повторная регистрация
    /// того же подписчика ничего не меняет: остаётся первый callback.
    fn subscribe(
        &self,
        topic: &T,
        subscriber: &S,
        callback: Callback<M>,
    );

    /// Снимает подписку. Если тема опустела, она удаляется.
    fn unsubscribe(
        &self,
        topic: &T,
        subscriber: &S,
    );

    /// Доставляет сообщение всем подписчикам темы. Тема без подписчиков
    /// молча пропускается.
    fn publish(
        &self,
        topic: &T,
        message: &M,
    );

    /// Освобождает внешние ресурсы брокера.
    fn close(&self) -> Result<(), BrokerError> {
        Ok(())
    }

    /// Количество тем, у которых есть хотя бы один подписчик.
    fn topic_count(&self) -> usize;

    fn has_topic(
        &self,
        topic: &T,
    ) -> bool;

    fn stats(&self) -> BrokerStats;
}

/// Снимок счётчиков брокера.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BrokerStats {
    /// Общее количество вызовов `publish`.
    pub published: u64,
    /// Публикации в тему без подписчиков.
    pub dropped: u64,
    /// Успешные вызовы callback'ов.
    pub delivered: u64,
    /// Callback'и, завершившиеся паникой.
    pub failed: u64,
}

/// Атомарные счётчики, общие для всех реализаций брокера.
#[derive(Debug, Default)]
pub struct BrokerMetrics {
    published: AtomicU64,
    dropped: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

impl BrokerMetrics {
    /// Учитывает одну публикацию; `None` означает, что темы нет.
    pub fn record_publish(
        &self,
        report: Option<DeliveryReport>,
    ) {
        self.published.fetch_add(1, Ordering::Relaxed);
        match report {
            Some(report) => self.record_delivery(report),
            None => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Публикация, переданная внешнему транспорту. Доставка будет учтена
    /// отдельно, когда кадр вернётся.
    pub fn record_sent(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    /// Учитывает доставку без новой публикации (входящие кадры middleware).
    pub fn record_delivery(
        &self,
        report: DeliveryReport,
    ) {
        self.delivered
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.failed.fetch_add(report.failed as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> BrokerStats {
        BrokerStats {
            published: self.published.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_count_dropped_and_delivered() {
        let metrics = BrokerMetrics::default();
        metrics.record_publish(None);
        metrics.record_publish(Some(DeliveryReport {
            delivered: 3,
            failed: 1,
        }));
        assert_eq!(
            metrics.snapshot(),
            BrokerStats {
                published: 2,
                dropped: 1,
                delivered: 3,
                failed: 1,
            }
        );
    }
}
