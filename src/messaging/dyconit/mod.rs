//! Политики с ограниченной несогласованностью (dyconit).
//!
//! Dyconit: именованная группа согласованности с бюджетом устаревания
//! (в тиках) и бюджетом численного отклонения. Сам механизм буферизации
//! живёт во внешней библиотеке; здесь только политики, которые решают,
//! на какие dyconit'ы подписан зритель и с какими границами, и адаптер,
//! превращающий такую политику в обычную [`Policy`] с темами-именами.

pub mod factory;
pub mod policies;

use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::Arc,
};

use parking_lot::RwLock;
use tracing::info;

pub use factory::{policy_from_str, validate_descriptor};
pub use policies::{
    ChunkDyconitPolicy, InfiniteBoundsPolicy, QuadraticGradientStalenessAoI, SingleDyconitPolicy,
    ZeroBoundsPolicy,
};

use super::{Policy, Source};
use crate::error::PolicyError;

/// Границы несогласованности одного dyconit'а.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bounds {
    /// Сколько тиков обновление может ждать в буфере.
    pub staleness: u32,
    /// Суммарный вес буферизованных обновлений до принудительной отправки.
    pub numerical: u32,
}

/// Команда, которую политика выдаёт для подписчика.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DyconitCommand {
    Subscribe { dyconit: String, bounds: Bounds },
    Unsubscribe { dyconit: String },
}

/// Политика, распределяющая подписчиков по dyconit'ам.
pub trait DyconitPolicy<S, M>: Send + Sync {
    /// Имя для логов и выбора по строке.
    fn name(&self) -> &'static str;

    /// Dyconit, в который попадает сообщение издателя.
    fn compute_affected_dyconit(
        &self,
        publisher: &dyn Source,
    ) -> Result<String, PolicyError>;

    /// Полный набор команд для текущего состояния подписчика. Команды
    /// применяются по порядку; итог задаёт набор подписок.
    fn update(
        &self,
        subscriber: &S,
    ) -> Vec<DyconitCommand>;

    /// Вес сообщения в численном бюджете.
    fn weigh(
        &self,
        _message: &M,
    ) -> u32 {
        1
    }
}

/// Представляет [`DyconitPolicy`] как [`Policy`], где тема это имя
/// dyconit'а.
///
/// Политику можно заменить на лету через [`set_policy`](Self::set_policy);
/// новые подписки вступят в силу при следующем обновлении каждого
/// подписчика.
pub struct DyconitPolicyAdapter<S, M> {
    policy: RwLock<Arc<dyn DyconitPolicy<S, M>>>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl Bounds {
    pub const ZERO: Bounds = Bounds::new(0, 0);
    pub const INFINITE: Bounds = Bounds::new(u32::MAX, u32::MAX);

    pub const fn new(
        staleness: u32,
        numerical: u32,
    ) -> Self {
        Self {
            staleness,
            numerical,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Bounds::ZERO
    }
}

impl DyconitCommand {
    pub fn subscribe(
        dyconit: impl Into<String>,
        bounds: Bounds,
    ) -> Self {
        DyconitCommand::Subscribe {
            dyconit: dyconit.into(),
            bounds,
        }
    }

    pub fn dyconit(&self) -> &str {
        match self {
            DyconitCommand::Subscribe { dyconit, .. } | DyconitCommand::Unsubscribe { dyconit } => {
                dyconit
            }
        }
    }
}

impl<S, M> DyconitPolicyAdapter<S, M> {
    pub fn new(policy: Arc<dyn DyconitPolicy<S, M>>) -> Self {
        Self {
            policy: RwLock::new(policy),
        }
    }

    pub fn policy(&self) -> Arc<dyn DyconitPolicy<S, M>> {
        Arc::clone(&self.policy.read())
    }

    /// Заменяет активную политику и возвращает прежнюю.
    pub fn set_policy(
        &self,
        policy: Arc<dyn DyconitPolicy<S, M>>,
    ) -> Arc<dyn DyconitPolicy<S, M>> {
        let mut current = self.policy.write();
        info!(from = current.name(), to = policy.name(), "Dyconit policy switched");
        std::mem::replace(&mut *current, policy)
    }

    /// Итоговые подписки подписчика с их границами.
    pub fn bounds(
        &self,
        subscriber: &S,
    ) -> HashMap<String, Bounds> {
        let commands = self.policy().update(subscriber);
        let mut bounds = HashMap::with_capacity(commands.len());
        for command in commands {
            match command {
                DyconitCommand::Subscribe { dyconit, bounds: b } => {
                    bounds.insert(dyconit, b);
                }
                DyconitCommand::Unsubscribe { dyconit } => {
                    bounds.remove(&dyconit);
                }
            }
        }
        bounds
    }

    pub fn weigh(
        &self,
        message: &M,
    ) -> u32 {
        self.policy().weigh(message)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Реализация трейтов
////////////////////////////////////////////////////////////////////////////////

impl<S, M> Policy<String, dyn Source, S> for DyconitPolicyAdapter<S, M> {
    fn compute_interest_set(
        &self,
        subscriber: &S,
    ) -> HashSet<String> {
        self.bounds(subscriber).into_keys().collect()
    }

    fn select_targets(
        &self,
        publisher: &dyn Source,
    ) -> Result<Vec<String>, PolicyError> {
        self.policy()
            .compute_affected_dyconit(publisher)
            .map(|dyconit| vec![dyconit])
    }
}

impl<S, M> fmt::Debug for DyconitPolicyAdapter<S, M> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("DyconitPolicyAdapter")
            .field("policy", &self.policy.read().name())
            .finish()
    }
}
