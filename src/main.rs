//! Демонстрация: несколько игроков бродят по миру, получают события
//! своих чанков, а генерация чанков идёт в приоритетном пуле.

use std::{
    fmt::Display,
    hash::{Hash, Hasher},
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::Parser;
use parking_lot::RwLock;
use regionbus::{
    init_logging, messaging::filter::BLOCK_BREAK_ANIMATION, new_configured, policy_from_str, Block,
    ChunkKey, ChunkPolicy, Classified, DyconitPolicyAdapter, JsonCodec, KindFilter, Location,
    MessagingSystem, Policy, PriorityExecutor, RankedJob, Settings, Source, Viewer, WorldId,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "regionbus")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Interest-managed pub/sub demo over a chunked world", long_about = None)]
struct Args {
    /// Файл настроек (toml, json, yaml)
    #[arg(short, long, env = "REGIONBUS_CONFIG")]
    config: Option<PathBuf>,

    /// Число шагов симуляции
    #[arg(short, long, default_value_t = 5)]
    ticks: u32,

    /// Число игроков
    #[arg(short, long, default_value_t = 4)]
    viewers: u64,
}

#[derive(Debug, Clone)]
struct Player {
    id: u64,
    location: Location,
    view_distance: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WorldEvent {
    BlockChange { x: i32, y: i32, z: i32 },
    BlockBreakAnimation { x: i32, y: i32, z: i32, stage: u8 },
    ChunkGenerated { x: i32, z: i32 },
}

type ChunkJob = RankedJob<ChunkKey, u32>;

fn main() -> Result<()> {
    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref()).context("failed to load settings")?;
    let logging = init_logging(settings.logging.clone())
        .map_err(|err| anyhow::anyhow!(err))
        .context("failed to initialize logging")?;

    info!(
        broker = %settings.broker.kind,
        channel = %settings.broker.channel,
        dyconit = ?settings.policy.dyconit,
        "Starting regionbus demo"
    );

    let broker_settings = settings.broker.clone();
    let connector = regionbus::LoopbackConnector::default();

    match settings.policy.dyconit.as_deref() {
        Some(descriptor) => {
            let view_distance = settings.policy.view_distance;
            let policy = policy_from_str::<Player, WorldEvent>(descriptor, view_distance)?
                .with_context(|| format!("no dyconit policy matches '{descriptor}'"))?;
            let adapter: Arc<dyn Policy<String, dyn Source, Player>> =
                Arc::new(DyconitPolicyAdapter::new(policy));
            let broker = new_configured::<String, Player, WorldEvent>(
                &broker_settings,
                &connector,
                Arc::new(JsonCodec::<WorldEvent>::new()),
            )?;
            run(&settings, &args, adapter, broker)?;
        }
        None => {
            let policy: Arc<dyn Policy<ChunkKey, dyn Source, Player>> = Arc::new(
                ChunkPolicy::new(settings.world(), settings.policy.view_distance),
            );
            let broker = new_configured::<ChunkKey, Player, WorldEvent>(
                &broker_settings,
                &connector,
                Arc::new(JsonCodec::<WorldEvent>::new()),
            )?;
            run(&settings, &args, policy, broker)?;
        }
    }

    logging.shutdown();
    Ok(())
}

fn run<T>(
    settings: &Settings,
    args: &Args,
    policy: Arc<dyn Policy<T, dyn Source, Player>>,
    broker: Arc<dyn regionbus::Broker<T, Player, WorldEvent>>,
) -> Result<()>
where
    T: Eq + Hash + Clone + Display + Send + Sync + 'static,
{
    let system = Arc::new(MessagingSystem::new(
        policy,
        broker,
        Arc::new(KindFilter::client_default()),
    ));
    let world = settings.world();
    let view_distance = settings.policy.view_distance;

    let mut players: Vec<Player> = (0..args.viewers)
        .map(|id| Player {
            id,
            location: Location::new(world, (id as f64) * 40.0, 64.0, 0.0),
            view_distance,
        })
        .collect();
    let received: Vec<Arc<AtomicUsize>> = players
        .iter()
        .map(|_| Arc::new(AtomicUsize::new(0)))
        .collect();

    let positions = Arc::new(RwLock::new(
        players.iter().map(|p| p.location.chunk()).collect::<Vec<_>>(),
    ));
    let ranker = {
        let positions = Arc::clone(&positions);
        Arc::new(move |chunk: &ChunkKey| {
            positions
                .read()
                .iter()
                .map(|p| p.distance(chunk))
                .min()
                .unwrap_or(u32::MAX)
        }) as Arc<dyn Fn(&ChunkKey) -> u32 + Send + Sync>
    };

    let executor: PriorityExecutor<ChunkJob> = match settings.executor.pool_size {
        Some(size) => PriorityExecutor::new(size)?,
        None => PriorityExecutor::with_available_parallelism()?,
    };

    for tick in 0..args.ticks {
        for (player, counter) in players.iter_mut().zip(&received) {
            player.location.x += 16.0;
            let counter = Arc::clone(counter);
            let id = player.id;
            system.update(player, move |event: &WorldEvent| {
                counter.fetch_add(1, Ordering::Relaxed);
                debug!(player = id, kind = event.kind(), "Event delivered");
            });
        }
        *positions.write() = players.iter().map(|p| p.location.chunk()).collect();

        let jobs = players.iter().flat_map(|player| {
            player
                .location
                .chunk()
                .square(1)
                .map(|chunk| chunk_job(chunk, world, &ranker, &system))
                .collect::<Vec<_>>()
        });
        let cancelled = executor.execute_and_cancel(jobs, |job: &ChunkJob| {
            let chunk = *job.key();
            positions
                .read()
                .iter()
                .all(|p| p.distance(&chunk) > view_distance)
        })?;

        for player in &players {
            let chunk = player.location.chunk();
            let block = Block {
                world,
                x: chunk.x << 4,
                y: 64,
                z: chunk.z << 4,
            };
            let events = [
                WorldEvent::BlockChange {
                    x: block.x,
                    y: block.y,
                    z: block.z,
                },
                WorldEvent::BlockBreakAnimation {
                    x: block.x,
                    y: block.y,
                    z: block.z,
                    stage: 3,
                },
            ];
            for event in &events {
                if let Err(err) = system.broadcast(&block as &dyn Source, event) {
                    warn!(%err, "Broadcast rejected");
                }
            }
        }

        info!(
            tick,
            cancelled = cancelled.len(),
            queued = executor.queued(),
            "Tick finished"
        );
        thread::sleep(Duration::from_millis(50));
    }

    executor.shutdown();
    executor.await_termination();
    thread::sleep(Duration::from_millis(50));

    for (player, counter) in players.iter().zip(&received) {
        info!(
            player = player.id,
            topics = system.interest_set(player).map_or(0, |t| t.len()),
            received = counter.load(Ordering::Relaxed),
            "Player summary"
        );
    }
    let stats = system.broker().stats();
    info!(
        published = stats.published,
        delivered = stats.delivered,
        dropped = stats.dropped,
        failed = stats.failed,
        executor = ?executor.stats(),
        "Demo finished"
    );

    system.close()?;
    Ok(())
}

fn chunk_job<T>(
    chunk: ChunkKey,
    world: WorldId,
    ranker: &Arc<dyn Fn(&ChunkKey) -> u32 + Send + Sync>,
    system: &Arc<MessagingSystem<T, dyn Source, Player, WorldEvent>>,
) -> ChunkJob
where
    T: Eq + Hash + Clone + Send + Sync + 'static,
{
    let system = Arc::clone(system);
    RankedJob::with_shared_ranker(chunk, Arc::clone(ranker), move |chunk: &ChunkKey| {
        let block = Block {
            world,
            x: chunk.x << 4,
            y: 0,
            z: chunk.z << 4,
        };
        let event = WorldEvent::ChunkGenerated {
            x: chunk.x,
            z: chunk.z,
        };
        if let Err(err) = system.broadcast(&block as &dyn Source, &event) {
            warn!(%err, "Chunk broadcast rejected");
        }
    })
}

impl Viewer for Player {
    fn location(&self) -> Location {
        self.location
    }

    fn view_distance(&self) -> u32 {
        self.view_distance
    }
}

impl PartialEq for Player {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.id == other.id
    }
}

impl Eq for Player {}

impl Hash for Player {
    fn hash<H: Hasher>(
        &self,
        state: &mut H,
    ) {
        self.id.hash(state);
    }
}

impl Classified for WorldEvent {
    fn kind(&self) -> &str {
        match self {
            WorldEvent::BlockChange { .. } => "block_change",
            WorldEvent::BlockBreakAnimation { .. } => BLOCK_BREAK_ANIMATION,
            WorldEvent::ChunkGenerated { .. } => "chunk_generated",
        }
    }
}
