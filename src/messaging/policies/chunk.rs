use std::{collections::HashSet, marker::PhantomData};

use crate::{
    error::PolicyError,
    messaging::{Policy, Source},
    world::{Block, ChunkKey, Entity, Viewer, WorldId},
};

/// Политика «зрители → чанки вокруг них».
///
/// Интерес зрителя: квадрат `(2r+1)×(2r+1)` чанков вокруг его чанка, где
/// `r = min(максимальная дальность, дальность зрителя)`. Зритель в другом
/// мире ничего не получает.
///
/// Издатели: [`ChunkKey`] (сам чанк), [`Block`] и [`Entity`] (чанк, в
/// котором они находятся).
pub struct ChunkPolicy<S> {
    world: WorldId,
    view_distance: u32,
    _marker: PhantomData<fn(&S)>,
}

impl<S> ChunkPolicy<S> {
    pub fn new(
        world: WorldId,
        view_distance: u32,
    ) -> Self {
        Self {
            world,
            view_distance,
            _marker: PhantomData,
        }
    }

    pub fn world(&self) -> WorldId {
        self.world
    }

    pub fn view_distance(&self) -> u32 {
        self.view_distance
    }
}

/// Чанк, в котором находится издатель, если его тип известен.
pub fn chunk_of(publisher: &dyn Source) -> Result<ChunkKey, PolicyError> {
    if let Some(chunk) = publisher.downcast_ref::<ChunkKey>() {
        return Ok(*chunk);
    }
    if let Some(block) = publisher.downcast_ref::<Block>() {
        return Ok(block.chunk());
    }
    if let Some(entity) = publisher.downcast_ref::<Entity>() {
        return Ok(entity.chunk());
    }
    Err(publisher.unsupported())
}

impl<S: Viewer> Policy<ChunkKey, dyn Source, S> for ChunkPolicy<S> {
    fn compute_interest_set(
        &self,
        subscriber: &S,
    ) -> HashSet<ChunkKey> {
        let location = subscriber.location();
        if location.world != self.world {
            return HashSet::new();
        }
        let radius = self.view_distance.min(subscriber.view_distance());
        location.chunk().square(radius).collect()
    }

    fn select_targets(
        &self,
        publisher: &dyn Source,
    ) -> Result<Vec<ChunkKey>, PolicyError> {
        chunk_of(publisher).map(|chunk| vec![chunk])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Location;

    struct TestViewer {
        location: Location,
        view_distance: u32,
    }

    impl Viewer for TestViewer {
        fn location(&self) -> Location {
            self.location
        }

        fn view_distance(&self) -> u32 {
            self.view_distance
        }
    }

    fn viewer(
        world: u32,
        x: f64,
        z: f64,
        view_distance: u32,
    ) -> TestViewer {
        TestViewer {
            location: Location::new(WorldId(world), x, 64.0, z),
            view_distance,
        }
    }

    /// Тест проверяет, что радиус 2 вокруг (0,0) даёт ровно 25 чанков
    /// в квадрате [-2,2]×[-2,2].
    #[test]
    fn test_radius_two_square() {
        let policy = ChunkPolicy::new(WorldId(0), 2);
        let interest = policy.compute_interest_set(&viewer(0, 8.0, 8.0, 10));
        assert_eq!(interest.len(), 25);
        for x in -2..=2 {
            for z in -2..=2 {
                assert!(interest.contains(&ChunkKey::new(x, z)));
            }
        }
    }

    #[test]
    fn test_viewer_distance_caps_radius() {
        let policy = ChunkPolicy::new(WorldId(0), 8);
        let interest = policy.compute_interest_set(&viewer(0, 0.0, 0.0, 1));
        assert_eq!(interest.len(), 9);
    }

    #[test]
    fn test_other_world_is_empty() {
        let policy = ChunkPolicy::new(WorldId(0), 4);
        assert!(policy
            .compute_interest_set(&viewer(1, 0.0, 0.0, 4))
            .is_empty());
    }

    #[test]
    fn test_select_targets_by_publisher_type() {
        let policy: ChunkPolicy<TestViewer> = ChunkPolicy::new(WorldId(0), 4);

        let chunk = ChunkKey::new(3, -1);
        assert_eq!(policy.select_targets(&chunk).unwrap(), vec![chunk]);

        let block = Block {
            world: WorldId(0),
            x: -1,
            y: 70,
            z: 17,
        };
        assert_eq!(
            policy.select_targets(&block).unwrap(),
            vec![ChunkKey::new(-1, 1)]
        );

        let entity = Entity {
            id: 9,
            location: Location::new(WorldId(0), 33.5, 64.0, -0.5),
        };
        assert_eq!(
            policy.select_targets(&entity).unwrap(),
            vec![ChunkKey::new(2, -1)]
        );
    }

    #[test]
    fn test_unknown_publisher_is_rejected() {
        let policy: ChunkPolicy<TestViewer> = ChunkPolicy::new(WorldId(0), 4);
        let err = policy.select_targets(&"weather").unwrap_err();
        assert!(matches!(
            err,
            PolicyError::UnsupportedPublisher { type_name } if type_name == "&str"
        ));
    }
}
