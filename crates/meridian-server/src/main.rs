//! Headless meditation demo.
//!
//! Spawns a handful of entities with partial mana, starts them meditating,
//! and runs the tick loop. Every tick the outgoing diffs and console
//! notifications are flushed into channels read by a stand-in transport
//! thread, which prints each payload as one JSON line on stdout.
//!
//! ```text
//! RUST_LOG=meridian_server=debug meridian-server --ticks 600 --entities 4 --seed 7
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::{never, select, unbounded, Receiver, RecvError};
use meridian_server::prelude::*;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless meridian server demo", long_about = None)]
struct Args {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of simulation ticks to run
    #[arg(long, default_value_t = 600)]
    ticks: u64,
    /// Number of meditating entities to spawn
    #[arg(long, default_value_t = 4)]
    entities: usize,
    /// Seed for spawning and for recovery rolls. Unseeded runs use the
    /// thread-local generator.
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ServerConfig::default(),
    };

    let mut world = World::new();
    register_components(&mut world);
    let mut spawner = Pcg32::seed_from_u64(args.seed.unwrap_or(0));
    let players: Vec<EntityId> = (0..args.entities)
        .map(|_| {
            let max = spawner.gen_range(50..=200);
            world.spawn_with(Mana::new(spawner.gen_range(0..max), max))
        })
        .collect();

    let rng: Box<dyn RandomSource> = match args.seed {
        Some(seed) => Box::new(SeededRandom::new(seed)),
        None => Box::new(LocalRandom),
    };
    let (presentation, presentation_rx) = ChannelPresentation::new();
    let ctx = ServerContext::new(world)
        .with_effects(Box::new(presentation.clone()))
        .with_sounds(Box::new(presentation))
        .with_rng(rng);

    let meditate = Arc::new(MeditateSystem::new(config.meditation.clone())?);
    let mut tick_loop = TickLoop::new(ctx, TickConfig::from_rate(config.tick_rate_hz));
    tick_loop.add_system(meditate.clone(), meditate.interval_secs())?;

    let (update_tx, update_rx) = unbounded::<ScopedUpdate>();
    let (notify_tx, notify_rx) = unbounded::<Notification>();
    let transport = thread::spawn(move || run_transport(update_rx, notify_rx, presentation_rx));

    for &player in &players {
        let outcome = meditate.toggle(player, tick_loop.context_mut())?;
        info!(entity = ?player, ?outcome, "toggle requested");
    }

    info!(
        ticks = args.ticks,
        entities = players.len(),
        tick_rate_hz = config.tick_rate_hz,
        "meridian demo running"
    );

    for _ in 0..args.ticks {
        tick_loop.tick();
        let ctx = tick_loop.context_mut();
        ctx.updates
            .flush(&update_tx)
            .context("update transport closed")?;
        ctx.messages
            .flush(&notify_tx)
            .context("notification transport closed")?;
    }

    let still_meditating = players
        .iter()
        .filter(|p| tick_loop.context().world.has_component::<Meditating>(**p))
        .count();
    let stats = tick_loop.context().updates.stats();
    info!(
        sim_time = tick_loop.sim_time(),
        still_meditating,
        updates_flushed = stats.flushed,
        empty_updates_dropped = stats.dropped_empty,
        "meridian demo finished"
    );

    // Closing the channels lets the transport thread drain and exit.
    drop(update_tx);
    drop(notify_tx);
    drop(tick_loop);
    let printed = transport
        .join()
        .map_err(|_| anyhow::anyhow!("transport thread panicked"))?;
    info!(printed, "transport drained");
    Ok(())
}

/// One payload, or a channel that just closed.
enum Inbound {
    Update(Result<ScopedUpdate, RecvError>),
    Notification(Result<Notification, RecvError>),
    Presentation(Result<PresentationEvent, RecvError>),
}

/// Print every payload as a JSON line until all three channels close.
fn run_transport(
    mut updates: Receiver<ScopedUpdate>,
    mut notifications: Receiver<Notification>,
    mut presentation: Receiver<PresentationEvent>,
) -> usize {
    let mut open = 3;
    let mut printed = 0;

    while open > 0 {
        let inbound = select! {
            recv(updates) -> msg => Inbound::Update(msg),
            recv(notifications) -> msg => Inbound::Notification(msg),
            recv(presentation) -> msg => Inbound::Presentation(msg),
        };
        let line = match inbound {
            Inbound::Update(Ok(update)) => serde_json::to_string(&update),
            Inbound::Notification(Ok(notification)) => serde_json::to_string(&notification),
            Inbound::Presentation(Ok(event)) => serde_json::to_string(&event),
            Inbound::Update(Err(_)) => {
                updates = never();
                open -= 1;
                continue;
            }
            Inbound::Notification(Err(_)) => {
                notifications = never();
                open -= 1;
                continue;
            }
            Inbound::Presentation(Err(_)) => {
                presentation = never();
                open -= 1;
                continue;
            }
        };
        match line {
            Ok(line) => {
                println!("{line}");
                printed += 1;
            }
            Err(e) => warn!(error = %e, "failed to encode payload"),
        }
    }
    printed
}
