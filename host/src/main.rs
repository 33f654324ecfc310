use clap::Parser;
use host::network::HostSession;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::protocol::{self, GameMessage};
use shared::{
    Bounds, Direction, EventKind, GameConfig, LocalRelay, LocalTransport, NullRenderer,
    ParticipantId, SessionCode, SessionError, Snapshot, Transport,
};
use std::time::Duration;
use tokio::sync::mpsc;

/// Headless snake host: runs a session over the in-process relay with
/// simple bot participants
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Grid columns
    #[arg(long, default_value = "40")]
    cols: i32,

    /// Grid rows
    #[arg(long, default_value = "25")]
    rows: i32,

    /// Milliseconds between simulation ticks
    #[arg(short = 't', long, default_value = "120")]
    tick_ms: u64,

    /// Number of bot clients joining the session
    #[arg(short = 'b', long, default_value = "1")]
    bots: usize,

    /// Maximum participants, host included
    #[arg(short = 'm', long, default_value = "8")]
    max_participants: usize,

    /// Probability that the relay loses a game payload
    #[arg(long, default_value = "0.0")]
    drop_rate: f64,

    /// Evict participants silent for this many milliseconds
    #[arg(long)]
    idle_timeout_ms: Option<u64>,

    /// Stop after this many seconds even if snakes are alive
    #[arg(short = 'd', long, default_value = "60")]
    duration_secs: u64,

    /// Seed for food placement and bot behaviour
    #[arg(short = 's', long)]
    seed: Option<u64>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let config = GameConfig {
        bounds: Bounds::new(args.cols, args.rows),
        tick_interval: Duration::from_millis(args.tick_ms),
        min_participants: (args.bots + 1).min(args.max_participants),
        max_participants: args.max_participants,
        idle_timeout: args.idle_timeout_ms.map(Duration::from_millis),
        seed: args.seed,
        ..GameConfig::default()
    };
    config.validate()?;

    let relay = match args.seed {
        Some(seed) => LocalRelay::seeded(seed),
        None => LocalRelay::new(),
    }
    .with_drop_rate(args.drop_rate);

    let mut session = HostSession::new(relay.connect(), Box::new(NullRenderer), config.clone());
    let code = session.host().await?;
    info!("Session code: {}", code);

    for bot in 0..args.bots {
        let transport = relay.connect();
        let code = code.clone();
        let bounds = config.bounds;
        tokio::spawn(async move {
            if let Err(e) = run_bot(transport, code, bounds).await {
                warn!("Bot {} stopped: {}", bot, e);
            }
        });
    }

    let (intents_tx, intents_rx) = mpsc::unbounded_channel();
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let tick = config.tick_interval;
    tokio::spawn(async move {
        // the host player wanders, turning now and then
        let mut turns = tokio::time::interval(tick * 3);
        loop {
            turns.tick().await;
            let direction = Direction::ALL[rng.gen_range(0..Direction::ALL.len())];
            if intents_tx.send(direction).is_err() {
                break;
            }
        }
    });

    let limit = Duration::from_secs(args.duration_secs);
    let outcome = tokio::time::timeout(limit, session.run(intents_rx)).await;
    match outcome {
        Ok(result) => result?,
        Err(_) => {
            info!("Time limit of {:?} reached", limit);
            session.stop().await;
        }
    }

    if let Some(game) = session.game() {
        info!("Session ended after {} ticks", game.tick());
        for (id, score) in game.scoreboard().scores() {
            info!("  {}: {}", id, score);
        }
    }

    Ok(())
}

/// Joins `code` and steers greedily toward the food on every snapshot
async fn run_bot(
    mut transport: LocalTransport,
    code: SessionCode,
    bounds: Bounds,
) -> Result<(), SessionError> {
    let id = transport.join(&code).await?;
    info!("Bot {} joined {}", id, code);

    while let Some(event) = transport.next_event().await {
        match event.kind {
            EventKind::Left => break,
            EventKind::Joined => {}
            EventKind::Game => {
                let Ok(GameMessage::State(snapshot)) = protocol::decode(&event.payload) else {
                    continue;
                };
                if let Some(direction) = steer(&snapshot, &id, bounds) {
                    transport.transmit(protocol::encode(&GameMessage::Input { direction })?)?;
                }
            }
        }
    }

    transport.leave().await;
    Ok(())
}

/// Picks the safe non-reversing direction that gets closest to the food
fn steer(snapshot: &Snapshot, id: &ParticipantId, bounds: Bounds) -> Option<Direction> {
    let snake = snapshot.snakes.get(id).filter(|snake| snake.alive)?;
    let head = *snake.body.first()?;
    let target = snapshot.food.position;
    let blocked = |cell| {
        !bounds.contains(cell)
            || snapshot
                .snakes
                .values()
                .any(|other| other.body.contains(&cell))
    };

    Direction::ALL
        .into_iter()
        .filter(|direction| *direction != snake.direction.reverse())
        .filter(|direction| !blocked(head.step(*direction)))
        .min_by_key(|direction| {
            let next = head.step(*direction);
            (next.x - target.x).abs() + (next.y - target.y).abs()
        })
}
