//! The NPC controller: owns the active state and drives it every tick.

use std::rc::Rc;
use std::sync::Arc;

use glam::Vec3;
use huellas_core::events::{NpcInteracted, NpcStateChanged, SpatialAudioRequest};
use huellas_core::{EventBus, Transform};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::drivers::{
    params, AnimationDriver, DetachedAnimator, DetachedLocomotion, GroundProbe, LocomotionDriver,
};
use super::state::{IdleState, InteractionState, NpcState, NpcStateKind, StateContext};
use super::NpcProfile;

/// Height above the actor the ground probe starts from
const PROBE_HEIGHT: f32 = 0.5;
/// How far down the ground probe reaches
const PROBE_DISTANCE: f32 = 2.0;
/// Ground mismatch below this is left alone
const GROUND_TOLERANCE: f32 = 0.01;
/// Smoothing time of the locomotion speed parameter
const SPEED_DAMP_TIME: f32 = 0.1;
/// Squared speed above which the NPC counts as walking
const MOVING_SPEED_SQ: f32 = 0.1;

/// Per-scene NPC tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NpcConfig {
    /// Extra height keeping the model from sinking into the ground
    pub ground_offset: f32,
    /// How fast the NPC turns to face the player
    pub turn_speed: f32,
}

impl Default for NpcConfig {
    fn default() -> Self {
        Self {
            ground_offset: 0.05,
            turn_speed: 5.0,
        }
    }
}

/// Builder for [`NpcController`].
pub struct NpcControllerBuilder {
    name: String,
    profile: Option<Arc<NpcProfile>>,
    locomotion: Option<Box<dyn LocomotionDriver>>,
    animator: Option<Box<dyn AnimationDriver>>,
    ground: Option<Box<dyn GroundProbe>>,
    config: NpcConfig,
    transform: Transform,
    seed: Option<u64>,
}

impl NpcControllerBuilder {
    pub fn profile(mut self, profile: Arc<NpcProfile>) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn locomotion(mut self, locomotion: impl LocomotionDriver + 'static) -> Self {
        self.locomotion = Some(Box::new(locomotion));
        self
    }

    pub fn animator(mut self, animator: impl AnimationDriver + 'static) -> Self {
        self.animator = Some(Box::new(animator));
        self
    }

    pub fn ground_probe(mut self, probe: impl GroundProbe + 'static) -> Self {
        self.ground = Some(Box::new(probe));
        self
    }

    pub fn config(mut self, config: NpcConfig) -> Self {
        self.config = config;
        self
    }

    pub fn position(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Seed the idle wait draws, for reproducible runs
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Build the controller and enter Idle.
    ///
    /// Missing drivers or profile are configuration errors: they are logged
    /// and replaced by inert defaults.
    pub fn build(self, events: Rc<EventBus>) -> NpcController {
        let mut actor_name = self.name;

        let mut locomotion = self.locomotion.unwrap_or_else(|| {
            error!("[NPC] {} has no locomotion driver, it will not move", actor_name);
            Box::new(DetachedLocomotion::default())
        });
        let animator = self.animator.unwrap_or_else(|| {
            error!("[NPC] {} has no animation driver, it will not animate", actor_name);
            Box::new(DetachedAnimator)
        });

        match &self.profile {
            Some(profile) => {
                locomotion.set_speed(profile.walk_speed);
                actor_name = format!("NPC_{}", profile.name);
            }
            None => error!(
                "[NPC] {} has no profile assigned, using default values",
                actor_name
            ),
        }

        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut controller = NpcController {
            actor_name,
            profile: self.profile,
            config: self.config,
            transform: self.transform,
            state: NpcState::Idle(IdleState::new()),
            locomotion,
            animator,
            ground: self.ground,
            events,
            rng,
            player_position: None,
            listening: false,
        };

        {
            let (state, mut ctx) = controller.split(0.0);
            state.enter(&mut ctx);
        }

        if let Some(profile) = &controller.profile {
            controller.events.npc_state_changed.publish(&NpcStateChanged {
                npc_name: profile.name.clone(),
                state: "initialized".to_string(),
            });
        }
        info!(npc = %controller.actor_name, "NPC ready");

        controller
    }
}

/// A non-player character driven by a two-state behaviour machine.
pub struct NpcController {
    actor_name: String,
    profile: Option<Arc<NpcProfile>>,
    config: NpcConfig,
    transform: Transform,
    state: NpcState,
    locomotion: Box<dyn LocomotionDriver>,
    animator: Box<dyn AnimationDriver>,
    ground: Option<Box<dyn GroundProbe>>,
    events: Rc<EventBus>,
    rng: StdRng,
    player_position: Option<Vec3>,
    pub(super) listening: bool,
}

impl NpcController {
    pub fn builder(name: impl Into<String>) -> NpcControllerBuilder {
        NpcControllerBuilder {
            name: name.into(),
            profile: None,
            locomotion: None,
            animator: None,
            ground: None,
            config: NpcConfig::default(),
            transform: Transform::default(),
            seed: None,
        }
    }

    /// Lend the active state a context over the rest of the controller.
    fn split(&mut self, delta: f32) -> (&mut NpcState, StateContext<'_>) {
        let Self {
            actor_name,
            profile,
            config,
            transform,
            state,
            locomotion,
            animator,
            events,
            rng,
            player_position,
            ..
        } = self;

        let npc_name = profile
            .as_deref()
            .map(|p| p.name.as_str())
            .unwrap_or(actor_name.as_str());

        let ctx = StateContext {
            transform,
            locomotion: &mut **locomotion,
            animator: &mut **animator,
            events: &**events,
            npc_name,
            player_position: *player_position,
            rng,
            turn_speed: config.turn_speed,
            delta,
        };
        (state, ctx)
    }

    /// Exit the active state, then enter `next`.
    pub fn change_state(&mut self, next: NpcState) {
        let kind = next.kind();
        {
            let (state, mut ctx) = self.split(0.0);
            state.exit(&mut ctx);
            *state = next;
            state.enter(&mut ctx);
        }
        debug!(npc = %self.actor_name, state = %kind, "State changed");
        self.events.npc_state_changed.publish(&NpcStateChanged {
            npc_name: self.display_name().to_string(),
            state: kind.to_string(),
        });
    }

    /// Per-frame update. The state runs before the animation and ground pass.
    pub fn tick(&mut self, delta: f32, player_position: Option<Vec3>) {
        self.player_position = player_position;

        let transition = {
            let (state, mut ctx) = self.split(delta);
            state.update(&mut ctx)
        };
        if let Some(transition) = transition {
            self.change_state(transition.into());
        }

        self.transform.position = self.locomotion.step(self.transform.position, delta);
        self.update_animation(delta);
        self.apply_ground_fix();
    }

    /// Drop whatever the NPC is doing and idle.
    pub fn stop_interaction(&mut self) {
        self.change_state(NpcState::Idle(IdleState::new()));
    }

    /// Walk toward `target`. Only possible while on the navigable surface.
    ///
    /// During a conversation the destination is recorded but the agent stays
    /// halted until the NPC is idle again.
    pub fn move_to(&mut self, target: Vec3) -> bool {
        if !self.locomotion.is_on_nav_surface() {
            debug!(npc = %self.actor_name, "Not on nav surface, ignoring move");
            return false;
        }
        if self.state.kind() == NpcStateKind::Idle {
            self.locomotion.set_stopped(false);
        }
        self.locomotion.set_destination(target)
    }

    /// The player engaged with this NPC (click, voice, proximity).
    pub fn interact(&mut self) {
        if let Some(transition) = self.state.on_interact() {
            self.change_state(transition.into());
        }

        if let Some(profile) = &self.profile {
            if let Some(clip) = &profile.interaction_sound {
                self.events.spatial_audio_requested.publish(&SpatialAudioRequest {
                    clip: clip.clone(),
                    position: self.transform.position,
                    pitch: profile.pitch,
                });
            }
        }

        self.events.npc_interacted.publish(&NpcInteracted {
            npc_name: self.display_name().to_string(),
            position: self.transform.position,
        });
    }

    /// One-shot celebration (minigame won). Does not change state.
    pub fn celebrate(&mut self) {
        self.animator.set_trigger(params::CELEBRATE);
    }

    pub fn start_explanation(&mut self) {
        self.change_state(NpcState::Interaction(InteractionState::new()));
        self.animator.set_bool(params::EXPLAINING, true);
    }

    pub fn stop_explanation(&mut self) {
        self.animator.set_bool(params::EXPLAINING, false);
        self.stop_interaction();
    }

    fn update_animation(&mut self, delta: f32) {
        let walk_speed = self.locomotion.speed();
        let normalized = if walk_speed > f32::EPSILON {
            self.locomotion.velocity().length() / walk_speed
        } else {
            0.0
        };
        self.animator
            .set_float_damped(params::SPEED, normalized, SPEED_DAMP_TIME, delta);
    }

    /// Keep the agent from floating above or sinking below the real ground.
    fn apply_ground_fix(&mut self) {
        if !self.locomotion.is_enabled() {
            return;
        }
        let Some(ground) = &self.ground else {
            return;
        };

        let origin = self.transform.position + Vec3::Y * PROBE_HEIGHT;
        if let Some(hit) = ground.cast_down(origin, PROBE_DISTANCE) {
            let distance_to_ground = hit - PROBE_HEIGHT;
            if distance_to_ground.abs() > GROUND_TOLERANCE {
                self.locomotion
                    .set_base_offset(-distance_to_ground + self.config.ground_offset);
            }
        }
    }

    pub fn is_moving(&self) -> bool {
        self.locomotion.velocity().length_squared() > MOVING_SPEED_SQ
            && self.state.kind() != NpcStateKind::Interaction
    }

    pub fn state(&self) -> &NpcState {
        &self.state
    }

    pub fn state_kind(&self) -> NpcStateKind {
        self.state.kind()
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Teleport the NPC.
    pub fn set_position(&mut self, position: Vec3) {
        self.transform.position = position;
    }

    /// Name used in events: the profile name, or the actor name without one.
    pub fn display_name(&self) -> &str {
        self.profile
            .as_deref()
            .map(|p| p.name.as_str())
            .unwrap_or(&self.actor_name)
    }

    /// Scene name of the actor (`NPC_<profile name>` once a profile is applied)
    pub fn actor_name(&self) -> &str {
        &self.actor_name
    }

    pub fn profile(&self) -> Option<&Arc<NpcProfile>> {
        self.profile.as_ref()
    }

    pub fn config(&self) -> &NpcConfig {
        &self.config
    }

    /// Whether `point` is within the profile's detection radius.
    pub fn detects(&self, point: Vec3) -> bool {
        let radius = self
            .profile
            .as_deref()
            .map(|p| p.detection_radius)
            .unwrap_or_else(|| NpcProfile::default().detection_radius);
        self.transform.distance_to(point) <= radius
    }

    pub fn locomotion(&self) -> &dyn LocomotionDriver {
        self.locomotion.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use huellas_core::AudioClip;

    use super::*;
    use crate::npc::testing::{AnimCall, FlatGround, MockLocomotion, RecordingAnimator};

    struct Fixture {
        npc: NpcController,
        agent: Rc<RefCell<MockLocomotion>>,
        animator: RecordingAnimator,
        events: Rc<EventBus>,
    }

    fn profile() -> Arc<NpcProfile> {
        Arc::new(NpcProfile {
            interaction_sound: Some(AudioClip::new("greeting", "audio/greeting.ogg", 1.2)),
            ..NpcProfile::default()
        })
    }

    fn fixture_with(ground: Option<f32>) -> Fixture {
        let events = Rc::new(EventBus::new());
        let agent = Rc::new(RefCell::new(MockLocomotion::default()));
        let animator = RecordingAnimator::default();
        let npc = NpcController::builder("Monk")
            .profile(profile())
            .locomotion(Rc::clone(&agent))
            .animator(animator.clone())
            .ground_probe(FlatGround(ground))
            .seed(42)
            .build(Rc::clone(&events));
        animator.clear();
        Fixture {
            npc,
            agent,
            animator,
            events,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(None)
    }

    #[test]
    fn test_build_enters_idle_and_applies_profile() {
        let events = Rc::new(EventBus::new());
        let changes = Rc::new(RefCell::new(Vec::new()));
        {
            let changes = Rc::clone(&changes);
            events
                .npc_state_changed
                .subscribe(move |e: &NpcStateChanged| changes.borrow_mut().push(e.clone()));
        }
        let agent = Rc::new(RefCell::new(MockLocomotion::default()));
        let npc = NpcController::builder("Monk")
            .profile(profile())
            .locomotion(Rc::clone(&agent))
            .animator(RecordingAnimator::default())
            .build(Rc::clone(&events));

        assert_eq!(npc.state_kind(), NpcStateKind::Idle);
        assert_eq!(npc.actor_name(), "NPC_Hermano Iratxe");
        assert_eq!(npc.display_name(), "Hermano Iratxe");
        assert_eq!(agent.borrow().speed, 2.0);
        assert!(agent.borrow().stopped);
        assert_eq!(
            *changes.borrow(),
            vec![NpcStateChanged {
                npc_name: "Hermano Iratxe".into(),
                state: "initialized".into(),
            }]
        );
    }

    #[test]
    fn test_missing_drivers_fall_back() {
        let events = Rc::new(EventBus::new());
        let published = Rc::new(RefCell::new(Vec::new()));
        {
            let published = Rc::clone(&published);
            events
                .npc_state_changed
                .subscribe(move |e: &NpcStateChanged| published.borrow_mut().push(e.state.clone()));
        }
        let mut npc = NpcController::builder("Stray").build(Rc::clone(&events));

        // No profile, no initialized event
        assert!(published.borrow().is_empty());
        assert_eq!(npc.state_kind(), NpcStateKind::Idle);
        assert_eq!(npc.display_name(), "Stray");
        assert!(!npc.move_to(Vec3::new(1.0, 0.0, 1.0)));
        npc.tick(0.1, Some(Vec3::ZERO));
        npc.interact();
        assert_eq!(npc.state_kind(), NpcStateKind::Interaction);
        assert_eq!(*published.borrow(), vec!["Interaction"]);
    }

    #[test]
    fn test_change_state_exits_before_entering() {
        let mut f = fixture();
        f.npc.change_state(NpcState::Interaction(InteractionState::new()));
        f.animator.clear();

        f.npc.change_state(NpcState::Idle(IdleState::new()));
        assert_eq!(
            f.animator.calls(),
            vec![
                AnimCall::Bool(params::EXPLAINING.into(), false),
                AnimCall::Float(params::SPEED.into(), 0.0),
            ]
        );
    }

    #[test]
    fn test_interact_from_idle_starts_conversation() {
        let mut f = fixture();
        let order = Rc::new(RefCell::new(Vec::new()));
        {
            let order = Rc::clone(&order);
            f.events
                .spatial_audio_requested
                .subscribe(move |req: &SpatialAudioRequest| {
                    order
                        .borrow_mut()
                        .push(format!("audio:{}@{}", req.clip.name, req.pitch))
                });
        }
        {
            let order = Rc::clone(&order);
            f.events
                .npc_interacted
                .subscribe(move |e: &NpcInteracted| {
                    order.borrow_mut().push(format!("interacted:{}", e.npc_name))
                });
        }

        f.npc.interact();

        assert_eq!(f.npc.state_kind(), NpcStateKind::Interaction);
        assert_eq!(
            f.animator.calls(),
            vec![AnimCall::Trigger(params::TALK.into())]
        );
        assert_eq!(
            *order.borrow(),
            vec!["audio:greeting@0.85", "interacted:Hermano Iratxe"]
        );
    }

    #[test]
    fn test_interact_again_stays_in_conversation() {
        let mut f = fixture();
        f.npc.interact();
        f.npc.tick(1.0, Some(Vec3::new(1.0, 0.0, 0.0)));
        f.animator.clear();

        f.npc.interact();
        assert_eq!(f.npc.state_kind(), NpcStateKind::Interaction);
        match f.npc.state() {
            NpcState::Interaction(s) => assert_eq!(s.since_last_interaction(), 0.0),
            other => panic!("expected Interaction, got {:?}", other.kind()),
        }
        assert!(!f
            .animator
            .calls()
            .contains(&AnimCall::Trigger(params::TALK.into())));
    }

    #[test]
    fn test_player_walking_away_ends_conversation() {
        let mut f = fixture();
        f.npc.interact();

        f.npc.tick(0.1, Some(Vec3::new(0.0, 0.0, 4.0)));
        assert_eq!(f.npc.state_kind(), NpcStateKind::Interaction);

        f.npc.tick(0.1, Some(Vec3::new(0.0, 0.0, 6.0)));
        assert_eq!(f.npc.state_kind(), NpcStateKind::Idle);
    }

    #[test]
    fn test_state_changes_are_published() {
        let mut f = fixture();
        let states = Rc::new(RefCell::new(Vec::new()));
        {
            let states = Rc::clone(&states);
            f.events
                .npc_state_changed
                .subscribe(move |e: &NpcStateChanged| states.borrow_mut().push(e.state.clone()));
        }
        f.npc.interact();
        f.npc.stop_interaction();
        assert_eq!(*states.borrow(), vec!["Interaction", "Idle"]);
    }

    #[test]
    fn test_animation_speed_is_normalized() {
        let mut f = fixture();
        f.agent.borrow_mut().velocity = Vec3::new(1.0, 0.0, 0.0);
        f.npc.tick(0.016, None);
        assert_eq!(
            f.animator.calls().last(),
            Some(&AnimCall::FloatDamped(params::SPEED.into(), 0.5))
        );
        assert!(f.npc.is_moving());
    }

    #[test]
    fn test_not_moving_while_talking() {
        let mut f = fixture();
        f.npc.interact();
        f.agent.borrow_mut().velocity = Vec3::new(1.0, 0.0, 0.0);
        assert!(!f.npc.is_moving());
    }

    #[test]
    fn test_ground_fix_adjusts_offset() {
        let mut f = fixture_with(Some(0.7));
        f.npc.tick(0.016, None);
        assert!((f.agent.borrow().base_offset - (-0.2 + 0.05)).abs() < 1e-5);
    }

    #[test]
    fn test_ground_fix_ignores_small_mismatch() {
        let mut f = fixture_with(Some(0.505));
        f.npc.tick(0.016, None);
        assert_eq!(f.agent.borrow().base_offset, 0.0);
    }

    #[test]
    fn test_move_to_requires_nav_surface() {
        let mut f = fixture();
        let target = Vec3::new(3.0, 0.0, 3.0);
        assert!(f.npc.move_to(target));
        assert_eq!(f.agent.borrow().destination, Some(target));
        assert!(!f.agent.borrow().stopped);

        f.agent.borrow_mut().on_nav_surface = false;
        f.agent.borrow_mut().destination = None;
        assert!(!f.npc.move_to(target));
        assert_eq!(f.agent.borrow().destination, None);
    }

    #[test]
    fn test_move_to_keeps_agent_halted_while_talking() {
        let mut f = fixture();
        f.npc.interact();
        assert_eq!(f.npc.state_kind(), NpcStateKind::Interaction);

        let target = Vec3::new(10.0, 0.0, 0.0);
        assert!(f.npc.move_to(target));
        assert!(f.agent.borrow().stopped);
        assert_eq!(f.agent.borrow().destination, Some(target));
        assert_eq!(f.npc.state_kind(), NpcStateKind::Interaction);
    }

    #[test]
    fn test_explanation_toggles_pose() {
        let mut f = fixture();
        f.npc.start_explanation();
        assert_eq!(f.npc.state_kind(), NpcStateKind::Interaction);
        assert_eq!(
            f.animator.calls().last(),
            Some(&AnimCall::Bool(params::EXPLAINING.into(), true))
        );

        f.npc.stop_explanation();
        assert_eq!(f.npc.state_kind(), NpcStateKind::Idle);
    }

    #[test]
    fn test_celebrate_keeps_state() {
        let mut f = fixture();
        f.npc.celebrate();
        assert_eq!(f.npc.state_kind(), NpcStateKind::Idle);
        assert_eq!(
            f.animator.calls(),
            vec![AnimCall::Trigger(params::CELEBRATE.into())]
        );
    }

    #[test]
    fn test_detects_within_radius() {
        let f = fixture();
        assert!(f.npc.detects(Vec3::new(3.0, 0.0, 4.0)));
        assert!(!f.npc.detects(Vec3::new(3.0, 0.0, 4.1)));
    }
}
