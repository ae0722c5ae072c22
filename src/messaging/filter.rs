use std::collections::HashSet;

use crate::world::Classified;

/// Проверка перед доставкой: `true`, если сообщение можно отправить
/// подписчику.
pub trait Filter<S, M>: Send + Sync {
    fn filter(
        &self,
        subscriber: &S,
        message: &M,
    ) -> bool;
}

/// Пропускает всё.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

/// Отсекает виды сообщений, которые клиент не умеет отобразить.
#[derive(Debug, Clone, Default)]
pub struct KindFilter {
    rejected: HashSet<String>,
}

/// Анимация разрушения блока не отправляется клиентам.
pub const BLOCK_BREAK_ANIMATION: &str = "block_break_animation";

impl KindFilter {
    pub fn new<I, K>(rejected: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            rejected: rejected.into_iter().map(Into::into).collect(),
        }
    }

    /// Фильтр для игровых клиентов.
    pub fn client_default() -> Self {
        Self::new([BLOCK_BREAK_ANIMATION])
    }

    pub fn reject(
        mut self,
        kind: impl Into<String>,
    ) -> Self {
        self.rejected.insert(kind.into());
        self
    }

    pub fn is_rejected(
        &self,
        kind: &str,
    ) -> bool {
        self.rejected.contains(kind)
    }
}

impl<S, M> Filter<S, M> for AcceptAll {
    fn filter(
        &self,
        _subscriber: &S,
        _message: &M,
    ) -> bool {
        true
    }
}

impl<S, M: Classified> Filter<S, M> for KindFilter {
    fn filter(
        &self,
        _subscriber: &S,
        message: &M,
    ) -> bool {
        !self.is_rejected(message.kind())
    }
}

impl<S, M, F> Filter<S, M> for F
where
    F: Fn(&S, &M) -> bool + Send + Sync,
{
    fn filter(
        &self,
        subscriber: &S,
        message: &M,
    ) -> bool {
        self(subscriber, message)
    }
}
