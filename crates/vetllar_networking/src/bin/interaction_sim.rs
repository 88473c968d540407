//! # Interaction Simulation
//!
//! Runs one server and two clients over loopback links and walks player 0
//! through every interaction kind:
//!
//! 1. Lever: instant, completes inside the start request
//! 2. Chest: timed, completes on its own
//! 3. Door: hold, released early and cancelled
//!
//! Player 1 watches. Both clients print the events they replay from
//! replicated state.
//!
//! ```bash
//! RUST_LOG=vetllar_interaction=debug cargo run --bin interaction_sim -- --seconds 3
//! ```

use vetllar_core::{EntityId, TargetRef, Vec3};
use vetllar_interaction::{ConfigLibrary, EventBus, EventReceiver, InteractorSettings};
use vetllar_networking::{Scene, Session, TICK_RATE};

const LEVEL: &str = r#"
[interactive.lever]
action_name = "Pull"

[interactive.chest]
action_name = "Open"
interaction_time = 1.0

[interactive.door]
action_name = "Force"
interaction_time = 2.0
hold = true

[interactor.player]
scan_interval = 0.1
"#;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let seconds = parse_seconds(std::env::args().skip(1));

    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║         VETLLAR - INTERACTION REPLICATION SIMULATION             ║");
    println!("║         1 server, 2 clients, loopback transport                  ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();

    let library = match ConfigLibrary::from_toml_str(LEVEL) {
        Ok(library) => library,
        Err(err) => {
            eprintln!("   ✗ FATAL: {err}");
            std::process::exit(1);
        }
    };
    let settings = library
        .interactor("player")
        .cloned()
        .unwrap_or_else(InteractorSettings::default);

    let mut scene = Scene::new();
    scene.add_interactable(Vec3::new(1.0, 0.0, 0.0), library.interactive("lever"));
    scene.add_interactable(Vec3::new(0.0, 0.0, 2.0), library.interactive("chest"));
    scene.add_interactable(Vec3::new(-3.0, 0.0, 0.0), library.interactive("door"));
    scene.add_player(Vec3::ZERO, settings.clone());
    scene.add_player(Vec3::new(0.0, 0.0, -4.0), settings);

    let mut session = match Session::new(&scene) {
        Ok(session) => session,
        Err(err) => {
            eprintln!("   ✗ FATAL: {err}");
            std::process::exit(1);
        }
    };

    let mut watchers = Vec::new();
    for index in 0..session.client_count() {
        let (sender, receiver) = EventBus::create_pair(256);
        session.client_mut(index).world_mut().subscribe(Box::new(sender));
        watchers.push(receiver);
    }

    println!("┌─ CONFIGURATION ─────────────────────────────────────────────────┐");
    println!("│ Tick Rate:          {TICK_RATE} Hz");
    println!("│ Phase Length:       {seconds} s");
    println!("│ Players:            {:?}", session.players());
    println!("│ Interactables:      {:?}", session.interactables());
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();

    let [lever, chest, door] = [0, 1, 2].map(|i| session.interactables()[i]);

    phase(&mut session, &watchers, "LEVER (instant)", lever, seconds, |session| {
        report(session.client_mut(0).start_interaction());
    });

    phase(&mut session, &watchers, "CHEST (timed)", chest, seconds, |session| {
        report(session.client_mut(0).start_interaction());
    });

    phase(&mut session, &watchers, "DOOR (hold, released early)", door, seconds, |session| {
        report(session.client_mut(0).start_interaction());
        session.run(0.5);
        report(session.client_mut(0).stop_interaction());
    });

    println!("═══════════════════════════════════════════════════════════════════");
    println!("  Server ticks:       {}", session.server().tick_count());
    println!("  Connections:        {}", session.server().connection_count());
    println!("═══════════════════════════════════════════════════════════════════");
}

fn parse_seconds(mut args: impl Iterator<Item = String>) -> f32 {
    const DEFAULT: f32 = 2.5;
    while let Some(arg) = args.next() {
        if arg == "--seconds" {
            return args
                .next()
                .and_then(|value| value.parse().ok())
                .filter(|value: &f32| value.is_finite() && *value > 0.0)
                .unwrap_or(DEFAULT);
        }
    }
    DEFAULT
}

fn phase(
    session: &mut Session,
    watchers: &[EventReceiver],
    title: &str,
    target: EntityId,
    seconds: f32,
    act: impl FnOnce(&mut Session),
) {
    println!("▶ {title}");
    session.set_sweep_hits_everywhere(vec![TargetRef::root(target)]);
    // Let both sides scan before acting.
    session.run(0.5);
    act(session);
    session.run(seconds);

    for (index, watcher) in watchers.iter().enumerate() {
        for event in watcher.drain() {
            println!("   [client {index}] {event:?}");
        }
    }
    let player = session.players()[0];
    let interacting = session
        .server()
        .world()
        .interactor(player)
        .is_some_and(|controller| controller.is_interacting());
    println!("   server: player interacting = {interacting}");
    println!();
}

fn report(outcome: vetllar_interaction::InteractionOutcome<()>) {
    if let Err(err) = outcome {
        println!("   ✗ {err}");
    }
}
