use std::{any::Any, collections::HashSet};

use crate::error::PolicyError;

/// Стратегия интереса: какие темы нужны подписчику и в какие темы
/// публикует издатель.
///
/// Издатель может быть безразмерным типом, обычно [`dyn Source`], чтобы
/// политика различала издателей по конкретному типу.
pub trait Policy<T, P: ?Sized, S>: Send + Sync {
    /// Множество тем, интересных подписчику прямо сейчас. Пустое, если
    /// интереса нет. При неизменном внешнем состоянии результат один и
    /// тот же.
    fn compute_interest_set(
        &self,
        subscriber: &S,
    ) -> HashSet<T>;

    /// Темы, в которые должно попасть сообщение издателя.
    fn select_targets(
        &self,
        publisher: &P,
    ) -> Result<Vec<T>, PolicyError>;
}

/// Любой владеемый потокобезопасный объект, который может выступать
/// издателем.
pub trait Source: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;

    /// Имя конкретного типа для сообщений об ошибках.
    fn type_label(&self) -> &'static str;
}

impl<T: Any + Send + Sync> Source for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_label(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

impl dyn Source {
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn unsupported(&self) -> PolicyError {
        PolicyError::UnsupportedPublisher {
            type_name: self.type_label(),
        }
    }
}
