//! The simulation root: owns the event bus and every manager of a tour session.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use glam::Vec3;
use huellas_audio::{AudioBackend, AudioManager, AudioSubscriptions};
use huellas_core::events::IdleTimeout;
use huellas_core::{EventBus, GameTime, SubscriptionId};
use huellas_game::{MinigameManager, NpcController, ScoreTarget};
use tracing::{debug, info};

use crate::settings::GameSettings;

/// One running tour: NPCs, minigame targets, audio and the clock.
pub struct Session<B: AudioBackend + 'static> {
    events: Rc<EventBus>,
    time: GameTime,
    audio: Rc<RefCell<AudioManager<B>>>,
    audio_subscriptions: Option<AudioSubscriptions>,
    minigame: Rc<RefCell<MinigameManager>>,
    minigame_subscription: Option<SubscriptionId>,
    npcs: Vec<NpcController>,
    targets: Vec<ScoreTarget>,
    idle_timeouts: Rc<RefCell<VecDeque<IdleTimeout>>>,
    celebrate: Rc<Cell<bool>>,
}

impl<B: AudioBackend + 'static> Session<B> {
    pub fn new(settings: &GameSettings, backend: B) -> Self {
        let events = Rc::new(EventBus::new());

        let audio = Rc::new(RefCell::new(AudioManager::new(
            settings.audio.clone(),
            backend,
        )));
        let audio_subscriptions = AudioManager::subscribe(&audio, &events);

        let minigame = Rc::new(RefCell::new(MinigameManager::new(
            settings.minigame,
            Rc::clone(&events),
        )));
        let minigame_subscription = MinigameManager::subscribe(&minigame);

        let idle_timeouts = Rc::new(RefCell::new(VecDeque::new()));
        {
            let queue = Rc::clone(&idle_timeouts);
            events
                .idle_timeout
                .subscribe(move |timeout: &IdleTimeout| queue.borrow_mut().push_back(timeout.clone()));
        }

        let celebrate = Rc::new(Cell::new(false));
        {
            let celebrate = Rc::clone(&celebrate);
            events.minigame_ended.subscribe(move |won| {
                if *won {
                    celebrate.set(true);
                }
            });
        }

        info!("Session started");

        Self {
            events,
            time: GameTime::new(settings.time_config()),
            audio,
            audio_subscriptions: Some(audio_subscriptions),
            minigame,
            minigame_subscription: Some(minigame_subscription),
            npcs: Vec::new(),
            targets: Vec::new(),
            idle_timeouts,
            celebrate,
        }
    }

    /// The bus every component of this session publishes on
    pub fn events(&self) -> &Rc<EventBus> {
        &self.events
    }

    pub fn add_npc(&mut self, npc: NpcController) -> usize {
        self.npcs.push(npc);
        self.npcs.len() - 1
    }

    pub fn npc(&self, index: usize) -> Option<&NpcController> {
        self.npcs.get(index)
    }

    pub fn npc_mut(&mut self, index: usize) -> Option<&mut NpcController> {
        self.npcs.get_mut(index)
    }

    /// Look an NPC up by the name it publishes events under
    pub fn npc_by_name_mut(&mut self, name: &str) -> Option<&mut NpcController> {
        self.npcs.iter_mut().find(|npc| npc.display_name() == name)
    }

    pub fn npcs(&self) -> &[NpcController] {
        &self.npcs
    }

    pub fn add_target(&mut self, target: ScoreTarget) -> usize {
        self.targets.push(target);
        self.targets.len() - 1
    }

    pub fn targets(&self) -> &[ScoreTarget] {
        &self.targets
    }

    /// A thrown object struck a target. Returns true if it scored.
    pub fn hit_target(&mut self, index: usize, relative_speed: f32) -> bool {
        match self.targets.get_mut(index) {
            Some(target) => target.on_collision(relative_speed, &self.events),
            None => false,
        }
    }

    /// Start a minigame round and put every target back in place.
    pub fn start_minigame(&mut self) -> bool {
        let started = self.minigame.borrow_mut().start_game();
        if started {
            for target in &mut self.targets {
                target.reset();
            }
        }
        started
    }

    pub fn minigame(&self) -> &Rc<RefCell<MinigameManager>> {
        &self.minigame
    }

    pub fn audio(&self) -> &Rc<RefCell<AudioManager<B>>> {
        &self.audio
    }

    pub fn time(&self) -> &GameTime {
        &self.time
    }

    /// Place the listener (the player's head).
    pub fn set_listener(&mut self, position: Vec3, forward: Vec3, up: Vec3) {
        self.audio.borrow_mut().set_listener(position, forward, up);
    }

    /// Advance the whole session by one frame.
    pub fn tick(&mut self, raw_delta: f32, player_position: Option<Vec3>) {
        self.time.update(raw_delta);
        let delta = self.time.delta_time;

        for npc in &mut self.npcs {
            npc.tick(delta, player_position);
        }
        for target in &mut self.targets {
            target.tick(delta);
        }
        self.minigame.borrow_mut().tick(delta);
        self.audio.borrow_mut().update(delta);

        if self.celebrate.replace(false) {
            debug!("Minigame won, NPCs celebrate");
            for npc in &mut self.npcs {
                npc.celebrate();
            }
        }
    }

    /// Idle NPCs whose wait ran out since the last call, oldest first.
    pub fn drain_idle_timeouts(&mut self) -> Vec<IdleTimeout> {
        self.idle_timeouts.borrow_mut().drain(..).collect()
    }

    /// Tear the session down: silence audio and drop every subscriber.
    pub fn end(&mut self) {
        self.audio.borrow_mut().stop_all_audio();
        if let Some(subscriptions) = self.audio_subscriptions.take() {
            subscriptions.unsubscribe(&self.events);
        }
        if let Some(id) = self.minigame_subscription.take() {
            self.events.target_hit.unsubscribe(id);
        }
        self.events.unsubscribe_all();
        info!(frames = self.time.frame_count, "Session ended");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use huellas_audio::SilentBackend;
    use huellas_core::{AudioClip, Transform};
    use huellas_game::{AnimationDriver, NpcProfile, NpcStateKind, TargetConfig};

    use super::*;
    use crate::headless::SimulatedAgent;

    /// Records triggers so tests can see one-shot animations.
    #[derive(Clone, Default)]
    struct TriggerLog(Rc<RefCell<Vec<String>>>);

    impl AnimationDriver for TriggerLog {
        fn set_bool(&mut self, _name: &str, _value: bool) {}
        fn set_float(&mut self, _name: &str, _value: f32) {}
        fn set_float_damped(&mut self, _name: &str, _value: f32, _damp: f32, _delta: f32) {}
        fn set_trigger(&mut self, name: &str) {
            self.0.borrow_mut().push(name.to_string());
        }
    }

    fn session() -> Session<SilentBackend> {
        Session::new(&GameSettings::default(), SilentBackend::default())
    }

    fn monk(session: &Session<SilentBackend>, animator: TriggerLog) -> NpcController {
        let profile = NpcProfile {
            interaction_sound: Some(AudioClip::new("greeting", "audio/greeting.ogg", 1.0)),
            ..NpcProfile::default()
        };
        NpcController::builder("Monk")
            .profile(Arc::new(profile))
            .locomotion(SimulatedAgent::new(20.0))
            .animator(animator)
            .seed(1)
            .build(Rc::clone(session.events()))
    }

    #[test]
    fn test_interaction_plays_pooled_audio() {
        let mut session = session();
        let npc = monk(&session, TriggerLog::default());
        let index = session.add_npc(npc);

        session.npc_mut(index).unwrap().interact();
        assert_eq!(session.audio().borrow().active_count(), 1);

        for _ in 0..12 {
            session.tick(0.1, Some(Vec3::new(0.0, 0.0, 2.0)));
        }
        assert_eq!(session.audio().borrow().active_count(), 0);
        assert_eq!(session.npc(index).unwrap().state_kind(), NpcStateKind::Interaction);
    }

    #[test]
    fn test_idle_timeouts_are_queued() {
        let mut session = session();
        let npc = monk(&session, TriggerLog::default());
        session.add_npc(npc);

        // Idle waits are drawn below 5 s
        for _ in 0..60 {
            session.tick(0.1, None);
        }
        let timeouts = session.drain_idle_timeouts();
        assert_eq!(timeouts.len(), 1);
        assert_eq!(timeouts[0].npc_name, "Hermano Iratxe");
        assert!(session.drain_idle_timeouts().is_empty());
    }

    #[test]
    fn test_winning_minigame_makes_npcs_celebrate() {
        let mut session = session();
        let triggers = TriggerLog::default();
        let npc = monk(&session, triggers.clone());
        session.add_npc(npc);
        for i in 0..5 {
            session.add_target(ScoreTarget::new(
                format!("jug-{}", i),
                TargetConfig::default(),
                Transform::from_position(Vec3::new(i as f32, 1.0, -4.0)),
            ));
        }

        assert!(session.start_minigame());
        for i in 0..5 {
            assert!(session.hit_target(i, 3.0));
        }
        assert_eq!(session.minigame().borrow().score(), 50);
        assert!(session.minigame().borrow().is_game_over());

        session.tick(0.1, None);
        assert!(triggers.0.borrow().contains(&"Celebrate".to_string()));
    }

    #[test]
    fn test_end_drops_all_subscribers() {
        let mut session = session();
        let npc = monk(&session, TriggerLog::default());
        let index = session.add_npc(npc);
        session.npc_mut(index).unwrap().interact();

        session.end();
        assert_eq!(session.events().subscriber_count(), 0);
        assert_eq!(session.audio().borrow().active_count(), 0);

        // Nothing listens any more
        session.npc_mut(index).unwrap().interact();
        assert_eq!(session.audio().borrow().active_count(), 0);
    }
}
