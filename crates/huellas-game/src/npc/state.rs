//! NPC behaviour states.
//!
//! States are plain data. They see the world only through a [`StateContext`]
//! lent to them for one call, and ask for a transition by returning it; the
//! controller performs the swap.

use std::fmt;

use glam::Vec3;
use huellas_core::events::IdleTimeout;
use huellas_core::{EventBus, Transform};
use rand::rngs::StdRng;
use rand::Rng;
use tracing::debug;

use super::drivers::{params, AnimationDriver, LocomotionDriver};

/// Lower bound of the randomized idle wait, in seconds
pub const IDLE_WAIT_MIN: f32 = 2.0;
/// Upper bound (exclusive) of the randomized idle wait, in seconds
pub const IDLE_WAIT_MAX: f32 = 5.0;
/// Beyond this distance the player is considered to have walked away
pub const CONVERSATION_RADIUS: f32 = 5.0;

/// A state change requested by the active state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Idle,
    Interaction,
}

/// Discriminant of [`NpcState`], for queries and events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NpcStateKind {
    Idle,
    Interaction,
}

impl fmt::Display for NpcStateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NpcStateKind::Idle => write!(f, "Idle"),
            NpcStateKind::Interaction => write!(f, "Interaction"),
        }
    }
}

/// Everything a state may touch during one call.
pub struct StateContext<'a> {
    pub transform: &'a mut Transform,
    pub locomotion: &'a mut dyn LocomotionDriver,
    pub animator: &'a mut dyn AnimationDriver,
    pub events: &'a EventBus,
    pub npc_name: &'a str,
    pub player_position: Option<Vec3>,
    pub rng: &'a mut StdRng,
    pub turn_speed: f32,
    pub delta: f32,
}

/// Standing still for a randomized while.
#[derive(Debug, Clone, Default)]
pub struct IdleState {
    time_in_state: f32,
    wait_duration: f32,
    fixed_wait: Option<f32>,
    timeout_reported: bool,
}

impl IdleState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idle with a predetermined wait instead of a random draw.
    pub fn with_wait(wait: f32) -> Self {
        Self {
            fixed_wait: Some(wait.max(0.0)),
            ..Self::default()
        }
    }

    pub fn elapsed(&self) -> f32 {
        self.time_in_state
    }

    pub fn wait_duration(&self) -> f32 {
        self.wait_duration
    }

    pub fn is_wait_over(&self) -> bool {
        self.time_in_state >= self.wait_duration
    }

    fn enter(&mut self, ctx: &mut StateContext<'_>) {
        ctx.locomotion.set_stopped(true);
        ctx.animator.set_float(params::SPEED, 0.0);
        self.wait_duration = match self.fixed_wait {
            Some(wait) => wait,
            None => ctx.rng.gen_range(IDLE_WAIT_MIN..IDLE_WAIT_MAX),
        };
        self.time_in_state = 0.0;
        self.timeout_reported = false;
        debug!(npc = ctx.npc_name, wait = self.wait_duration, "Entered Idle");
    }

    fn update(&mut self, ctx: &mut StateContext<'_>) -> Option<Transition> {
        self.time_in_state += ctx.delta;
        if self.is_wait_over() && !self.timeout_reported {
            self.timeout_reported = true;
            debug!(npc = ctx.npc_name, waited = self.time_in_state, "Idle wait over");
            ctx.events.idle_timeout.publish(&IdleTimeout {
                npc_name: ctx.npc_name.to_string(),
                position: ctx.transform.position,
                waited: self.time_in_state,
            });
        }
        None
    }
}

/// Talking with the player.
#[derive(Debug, Clone, Default)]
pub struct InteractionState {
    since_last_interaction: f32,
}

impl InteractionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds since the player last engaged
    pub fn since_last_interaction(&self) -> f32 {
        self.since_last_interaction
    }

    fn enter(&mut self, ctx: &mut StateContext<'_>) {
        ctx.locomotion.set_stopped(true);
        ctx.animator.set_trigger(params::TALK);
        self.since_last_interaction = 0.0;
        debug!(npc = ctx.npc_name, "Entered Interaction");
    }

    fn update(&mut self, ctx: &mut StateContext<'_>) -> Option<Transition> {
        self.since_last_interaction += ctx.delta;

        let player = ctx.player_position?;
        ctx.transform
            .turn_towards(player, ctx.delta * ctx.turn_speed);

        if ctx.transform.distance_to(player) > CONVERSATION_RADIUS {
            debug!(npc = ctx.npc_name, "Player walked away");
            return Some(Transition::Idle);
        }
        None
    }

    fn exit(&mut self, ctx: &mut StateContext<'_>) {
        ctx.animator.set_bool(params::EXPLAINING, false);
    }
}

/// The active behaviour of an NPC.
#[derive(Debug, Clone)]
pub enum NpcState {
    Idle(IdleState),
    Interaction(InteractionState),
}

impl NpcState {
    pub fn kind(&self) -> NpcStateKind {
        match self {
            NpcState::Idle(_) => NpcStateKind::Idle,
            NpcState::Interaction(_) => NpcStateKind::Interaction,
        }
    }

    pub fn enter(&mut self, ctx: &mut StateContext<'_>) {
        match self {
            NpcState::Idle(s) => s.enter(ctx),
            NpcState::Interaction(s) => s.enter(ctx),
        }
    }

    pub fn update(&mut self, ctx: &mut StateContext<'_>) -> Option<Transition> {
        match self {
            NpcState::Idle(s) => s.update(ctx),
            NpcState::Interaction(s) => s.update(ctx),
        }
    }

    pub fn exit(&mut self, ctx: &mut StateContext<'_>) {
        match self {
            NpcState::Idle(_) => {}
            NpcState::Interaction(s) => s.exit(ctx),
        }
    }

    /// The player engaged with the NPC.
    pub fn on_interact(&mut self) -> Option<Transition> {
        match self {
            NpcState::Idle(_) => Some(Transition::Interaction),
            NpcState::Interaction(s) => {
                s.since_last_interaction = 0.0;
                None
            }
        }
    }
}

impl From<Transition> for NpcState {
    fn from(transition: Transition) -> Self {
        match transition {
            Transition::Idle => NpcState::Idle(IdleState::new()),
            Transition::Interaction => NpcState::Interaction(InteractionState::new()),
        }
    }
}
