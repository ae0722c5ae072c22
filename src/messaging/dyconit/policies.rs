use crate::{
    error::PolicyError,
    messaging::{policies::chunk::chunk_of, Source},
    world::{ChunkKey, Viewer},
};

use super::{Bounds, DyconitCommand, DyconitPolicy};

/// Имя общего dyconit'а политик без пространственного деления.
pub const CATCH_ALL: &str = "catch-all";

/// Один dyconit на каждый видимый чанк, с нулевыми границами.
#[derive(Debug, Clone, Copy)]
pub struct ChunkDyconitPolicy {
    view_distance: u32,
}

/// Все подписчики в одном dyconit'е с нулевыми границами: каждое
/// обновление отправляется сразу.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroBoundsPolicy;

/// Все подписчики в одном dyconit'е без ограничений.
#[derive(Debug, Clone, Copy, Default)]
pub struct InfiniteBoundsPolicy;

/// Все подписчики в dyconit'е `single` с заданными границами.
#[derive(Debug, Clone, Copy)]
pub struct SingleDyconitPolicy {
    bounds: Bounds,
}

/// Dyconit на каждый видимый чанк; допустимое устаревание растёт как
/// квадрат расстояния до чанка зрителя.
///
/// Численная граница не ограничена, так что дальние чанки обновляются
/// только по времени.
#[derive(Debug, Clone, Copy)]
pub struct QuadraticGradientStalenessAoI {
    view_distance: u32,
}

fn chunk_dyconit(chunk: ChunkKey) -> String {
    chunk.to_string()
}

fn visible_chunks<S: Viewer>(
    subscriber: &S,
    view_distance: u32,
) -> (ChunkKey, impl Iterator<Item = ChunkKey>) {
    let center = subscriber.location().chunk();
    let radius = view_distance.min(subscriber.view_distance());
    (center, center.square(radius))
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl ChunkDyconitPolicy {
    pub fn new(view_distance: u32) -> Self {
        Self { view_distance }
    }
}

impl SingleDyconitPolicy {
    pub const DYCONIT: &'static str = "single";

    pub fn new(
        staleness: u32,
        numerical: u32,
    ) -> Self {
        Self {
            bounds: Bounds::new(staleness, numerical),
        }
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }
}

impl QuadraticGradientStalenessAoI {
    pub fn new(view_distance: u32) -> Self {
        Self { view_distance }
    }

    /// Граница для чанка на расстоянии `distance` от зрителя.
    pub fn bounds_at(distance: u32) -> Bounds {
        Bounds::new(
            distance.saturating_mul(distance),
            Bounds::INFINITE.numerical,
        )
    }
}

////////////////////////////////////////////////////////////////////////////////
// Реализация трейтов
////////////////////////////////////////////////////////////////////////////////

impl<S: Viewer, M> DyconitPolicy<S, M> for ChunkDyconitPolicy {
    fn name(&self) -> &'static str {
        "ChunkDyconitPolicy"
    }

    fn compute_affected_dyconit(
        &self,
        publisher: &dyn Source,
    ) -> Result<String, PolicyError> {
        chunk_of(publisher).map(chunk_dyconit)
    }

    fn update(
        &self,
        subscriber: &S,
    ) -> Vec<DyconitCommand> {
        let (_, chunks) = visible_chunks(subscriber, self.view_distance);
        chunks
            .map(|chunk| DyconitCommand::subscribe(chunk_dyconit(chunk), Bounds::ZERO))
            .collect()
    }
}

impl<S, M> DyconitPolicy<S, M> for ZeroBoundsPolicy {
    fn name(&self) -> &'static str {
        "ZeroBoundsPolicy"
    }

    fn compute_affected_dyconit(
        &self,
        _publisher: &dyn Source,
    ) -> Result<String, PolicyError> {
        Ok(CATCH_ALL.to_string())
    }

    fn update(
        &self,
        _subscriber: &S,
    ) -> Vec<DyconitCommand> {
        vec![DyconitCommand::subscribe(CATCH_ALL, Bounds::ZERO)]
    }
}

impl<S, M> DyconitPolicy<S, M> for InfiniteBoundsPolicy {
    fn name(&self) -> &'static str {
        "InfiniteBoundsPolicy"
    }

    fn compute_affected_dyconit(
        &self,
        _publisher: &dyn Source,
    ) -> Result<String, PolicyError> {
        Ok(CATCH_ALL.to_string())
    }

    fn update(
        &self,
        _subscriber: &S,
    ) -> Vec<DyconitCommand> {
        vec![DyconitCommand::subscribe(CATCH_ALL, Bounds::INFINITE)]
    }
}

impl<S, M> DyconitPolicy<S, M> for SingleDyconitPolicy {
    fn name(&self) -> &'static str {
        "SingleDyconitPolicy"
    }

    fn compute_affected_dyconit(
        &self,
        _publisher: &dyn Source,
    ) -> Result<String, PolicyError> {
        Ok(Self::DYCONIT.to_string())
    }

    fn update(
        &self,
        _subscriber: &S,
    ) -> Vec<DyconitCommand> {
        vec![DyconitCommand::subscribe(Self::DYCONIT, self.bounds)]
    }
}

impl<S: Viewer, M> DyconitPolicy<S, M> for QuadraticGradientStalenessAoI {
    fn name(&self) -> &'static str {
        "QuadraticGradientStalenessAoI"
    }

    fn compute_affected_dyconit(
        &self,
        publisher: &dyn Source,
    ) -> Result<String, PolicyError> {
        chunk_of(publisher).map(chunk_dyconit)
    }

    fn update(
        &self,
        subscriber: &S,
    ) -> Vec<DyconitCommand> {
        let (center, chunks) = visible_chunks(subscriber, self.view_distance);
        chunks
            .map(|chunk| {
                DyconitCommand::subscribe(
                    chunk_dyconit(chunk),
                    Self::bounds_at(center.distance(&chunk)),
                )
            })
            .collect()
    }
}
