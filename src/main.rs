//! Huellas - NPC behaviour core of the Irache monastery tour
//!
//! Runs a scripted headless visit: the player walks up to the monk, talks to
//! him, walks away, then plays the jug-throwing minigame.

mod headless;
mod session;
mod settings;

use std::collections::HashSet;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use anyhow::Result;
use glam::Vec3;
use huellas_audio::{AudioBackend, KiraBackend, SilentBackend};
use huellas_core::events::NpcSpeech;
use huellas_core::{AudioClip, Transform};
use huellas_game::{
    NpcController, NpcKind, NpcProfile, NpcStateKind, ProfileLibrary, ScoreTarget, TargetConfig,
    VoiceHandler,
};
use huellas_integration::{Conversation, IntegrationClient};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::headless::{FlatFloor, SimulatedAgent, TracingAnimator};
use crate::session::Session;
use crate::settings::GameSettings;

/// Simulation rate of the headset
const FRAME_TIME: f32 = 1.0 / 90.0;
/// Radius of the walkable courtyard
const COURTYARD_RADIUS: f32 = 20.0;
/// How far an idle NPC strolls before waiting again
const STROLL_DISTANCE: f32 = 3.0;

/// Command-line options
struct Options {
    silent: bool,
    question: Option<String>,
    seconds: f32,
    settings: Option<PathBuf>,
}

impl Options {
    fn parse() -> Result<Self> {
        let mut options = Options {
            silent: false,
            question: None,
            seconds: 30.0,
            settings: None,
        };
        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--silent" => options.silent = true,
                "--ask" => options.question = args.next(),
                "--seconds" => {
                    let Some(value) = args.next() else {
                        anyhow::bail!("--seconds needs a value");
                    };
                    options.seconds = value.parse()?;
                }
                "--settings" => options.settings = args.next().map(PathBuf::from),
                other => anyhow::bail!("Unknown argument: {}", other),
            }
        }
        Ok(options)
    }
}

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Huellas...");

    let options = Options::parse()?;
    let settings = match &options.settings {
        Some(path) => GameSettings::load_from(path),
        None => GameSettings::load(),
    };

    let profiles = match ProfileLibrary::load_dir(&settings.gameplay.profiles_dir) {
        Ok(library) => library,
        Err(e) => {
            warn!("Could not load NPC profiles: {}, using the default monk", e);
            let mut library = ProfileLibrary::new();
            library.insert(NpcProfile::default());
            library
        }
    };

    if options.silent {
        return run(&settings, &profiles, SilentBackend::default(), &options);
    }
    match KiraBackend::new() {
        Ok(backend) => run(&settings, &profiles, backend, &options),
        Err(e) => {
            warn!("Audio unavailable: {}, continuing silently", e);
            run(&settings, &profiles, SilentBackend::default(), &options)
        }
    }
}

/// Play the scripted visit on the given audio backend.
fn run<B: AudioBackend + 'static>(
    settings: &GameSettings,
    profiles: &ProfileLibrary,
    backend: B,
    options: &Options,
) -> Result<()> {
    let mut session = Session::new(settings, backend);
    let mut rng = match settings.gameplay.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    spawn_npcs(&mut session, settings, profiles, &mut rng);
    spawn_targets(&mut session);

    session.events().npc_speech.subscribe(|speech: &NpcSpeech| {
        info!("[{}] {}", speech.npc_name, speech.text);
    });

    let (client, mut conversation) = match &options.question {
        Some(_) => match IntegrationClient::new(&settings.chat) {
            Ok(client) => (Some(client), Some(Conversation::new(&settings.chat))),
            Err(e) => {
                warn!("Chat disabled: {}", e);
                (None, None)
            }
        },
        None => (None, None),
    };

    let total_frames = (options.seconds / FRAME_TIME).ceil() as u64;
    let mut interacted = false;
    let mut asked = false;
    let mut minigame_started = false;
    let mut next_throw = 0.0_f32;
    let mut next_target = 0;
    let mut strolling: HashSet<String> = HashSet::new();

    for frame in 0..total_frames {
        let t = frame as f32 * FRAME_TIME;
        let player = player_position(t);
        session.set_listener(player, -Vec3::Z, Vec3::Y);
        session.tick(FRAME_TIME, Some(player));

        // Idle NPCs stroll somewhere nearby once their wait is over,
        // then idle again on arrival
        for timeout in session.drain_idle_timeouts() {
            let offset = Vec3::new(
                rng.gen_range(-STROLL_DISTANCE..STROLL_DISTANCE),
                0.0,
                rng.gen_range(-STROLL_DISTANCE..STROLL_DISTANCE),
            );
            if let Some(npc) = session.npc_by_name_mut(&timeout.npc_name) {
                if npc.move_to(timeout.position + offset) {
                    strolling.insert(timeout.npc_name);
                }
            }
        }
        strolling.retain(|name| match session.npc_by_name_mut(name) {
            Some(npc) if npc.state_kind() != NpcStateKind::Idle => false,
            Some(npc) if npc.locomotion().remaining_distance() <= 0.0 => {
                npc.stop_interaction();
                false
            }
            Some(_) => true,
            None => false,
        });

        if !interacted && t >= 4.0 {
            interacted = true;
            if let Some(monk) = session.npc_mut(0) {
                if monk.detects(player) {
                    monk.interact();
                    monk.start_explanation();
                }
            }
        }

        if !asked && t >= 5.0 {
            asked = true;
            if let (Some(client), Some(conversation), Some(question)) =
                (&client, conversation.as_mut(), &options.question)
            {
                if let Some(monk) = session.npc_mut(0) {
                    monk.start_listening();
                    monk.process_speech(question);
                    monk.stop_listening();
                }
                conversation.submit(client, question);
            }
        }

        if let Some(line) = conversation.as_mut().and_then(|c| c.poll()) {
            if let Some(client) = &client {
                if !client.is_online() {
                    warn!("Chat endpoint unreachable, the monk falls silent");
                }
            }
            let npc_name = session
                .npc(0)
                .map(|npc| npc.display_name().to_string())
                .unwrap_or_default();
            session.events().npc_speech.publish(&NpcSpeech {
                npc_name,
                text: line,
            });
            if let Some(monk) = session.npc_mut(0) {
                monk.stop_explanation();
            }
        }

        if !minigame_started && t >= 12.0 {
            minigame_started = true;
            session.start_minigame();
            next_throw = t + 1.0;
        }

        if minigame_started && t >= next_throw && next_target < session.targets().len() {
            let speed = rng.gen_range(1.0..6.0);
            let scored = session.hit_target(next_target, speed);
            info!(target_index = next_target, speed, scored, "Throw");
            if scored {
                next_target += 1;
            }
            next_throw = t + 0.75;
        }
    }

    if let Some(conversation) = conversation.as_mut() {
        if let Some(line) = conversation.wait() {
            info!("Late reply: {}", line);
        }
    }

    let minigame = session.minigame().borrow();
    info!(
        score = minigame.score(),
        rounds = minigame.round(),
        game_over = minigame.is_game_over(),
        "Visit finished"
    );
    drop(minigame);

    session.end();
    Ok(())
}

/// Scripted player path: approach the monk, linger, leave toward the targets.
fn player_position(t: f32) -> Vec3 {
    let far = Vec3::new(0.0, 1.7, 10.0);
    let near = Vec3::new(0.0, 1.7, 2.0);
    let range = Vec3::new(3.0, 1.7, 6.0);
    match t {
        t if t < 3.0 => far.lerp(near, t / 3.0),
        t if t < 9.0 => near,
        t if t < 12.0 => near.lerp(range, (t - 9.0) / 3.0),
        _ => range,
    }
}

fn spawn_npcs<B: AudioBackend + 'static>(
    session: &mut Session<B>,
    settings: &GameSettings,
    profiles: &ProfileLibrary,
    rng: &mut StdRng,
) {
    let mut names: Vec<&str> = profiles.names().collect();
    names.sort_unstable();
    // The monk leads the tour
    names.sort_by_key(|name| {
        profiles
            .get(name)
            .map(|p| p.kind != NpcKind::Human)
            .unwrap_or(true)
    });

    for (i, name) in names.into_iter().enumerate() {
        let Some(profile) = profiles.get(name) else {
            continue;
        };
        let position = Vec3::new(i as f32 * 4.0, 0.0, 0.0);
        let npc = NpcController::builder(name)
            .profile(Arc::clone(&profile))
            .locomotion(SimulatedAgent::new(COURTYARD_RADIUS))
            .animator(TracingAnimator::default())
            .ground_probe(FlatFloor::default())
            .config(settings.npc)
            .position(position)
            .seed(rng.gen())
            .build(Rc::clone(session.events()));
        session.add_npc(npc);
    }
}

fn spawn_targets<B: AudioBackend + 'static>(session: &mut Session<B>) {
    let config = TargetConfig {
        hit_sound: Some(AudioClip::new("clang", "assets/audio/clang.ogg", 0.4)),
        ..TargetConfig::default()
    };
    for i in 0..5 {
        let position = Vec3::new(i as f32 * 0.4 + 2.2, 1.0, 3.0);
        session.add_target(ScoreTarget::new(
            format!("jug-{}", i),
            config.clone(),
            Transform::from_position(position),
        ));
    }
}
