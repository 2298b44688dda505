//! Event bus for decoupled communication between simulation systems.
//!
//! Publishers and subscribers never reference each other: both only see the
//! [`EventBus`] handed to them by the session that owns it. Every channel is
//! single-threaded; publishing runs subscribers synchronously on the caller's
//! thread, in registration order.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use glam::Vec3;
use tracing::{trace, warn};

use crate::types::AudioClip;

/// Handle returned by [`Channel::subscribe`], used to unsubscribe later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<T> = Rc<RefCell<dyn FnMut(&T)>>;

/// A named event channel carrying payloads of type `T`.
pub struct Channel<T> {
    name: &'static str,
    subscribers: RefCell<Vec<(SubscriptionId, Callback<T>)>>,
    next_id: Cell<u64>,
}

impl<T: 'static> Channel<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            subscribers: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
        }
    }

    /// Channel name, used in logs
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Register a subscriber. It is invoked after every subscriber registered before it.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: FnMut(&T) + 'static,
    {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        let callback: Callback<T> = Rc::new(RefCell::new(callback));
        self.subscribers.borrow_mut().push((id, callback));
        id
    }

    /// Remove a subscriber. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|(sub, _)| *sub != id);
        subscribers.len() != before
    }

    /// Invoke every subscriber registered at the time of the call.
    ///
    /// Returns how many subscribers ran. Subscribers that already ran are not
    /// affected by anything later subscribers do. A subscriber that publishes
    /// back into itself is skipped rather than re-entered.
    pub fn publish(&self, payload: &T) -> usize {
        let snapshot: Vec<Callback<T>> = self
            .subscribers
            .borrow()
            .iter()
            .map(|(_, callback)| Rc::clone(callback))
            .collect();

        let mut notified = 0;
        for callback in snapshot {
            match callback.try_borrow_mut() {
                Ok(mut f) => {
                    f(payload);
                    notified += 1;
                }
                Err(_) => warn!(channel = self.name, "Skipping re-entrant subscriber"),
            }
        }
        trace!(channel = self.name, notified, "Event published");
        notified
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    /// Remove every subscriber
    pub fn clear(&self) {
        self.subscribers.borrow_mut().clear();
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("subscribers", &self.subscribers.borrow().len())
            .finish()
    }
}

/// An NPC was interacted with.
#[derive(Debug, Clone, PartialEq)]
pub struct NpcInteracted {
    pub npc_name: String,
    pub position: Vec3,
}

/// An NPC changed behaviour state.
#[derive(Debug, Clone, PartialEq)]
pub struct NpcStateChanged {
    pub npc_name: String,
    pub state: String,
}

/// An NPC said something (NPC name, speech text).
#[derive(Debug, Clone, PartialEq)]
pub struct NpcSpeech {
    pub npc_name: String,
    pub text: String,
}

/// An idle NPC finished its randomized wait.
///
/// Nothing inside the NPC acts on this; whoever composes the scene decides
/// what the NPC does next.
#[derive(Debug, Clone, PartialEq)]
pub struct IdleTimeout {
    pub npc_name: String,
    pub position: Vec3,
    /// How long the NPC waited, in seconds
    pub waited: f32,
}

/// Request to play a clip at a world position.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialAudioRequest {
    pub clip: AudioClip,
    pub position: Vec3,
    /// Playback pitch multiplier, 1.0 plays the clip as recorded
    pub pitch: f32,
}

/// All channels of a session.
#[derive(Debug)]
pub struct EventBus {
    // NPC events
    pub npc_interacted: Channel<NpcInteracted>,
    pub npc_state_changed: Channel<NpcStateChanged>,
    pub npc_speech: Channel<NpcSpeech>,
    pub idle_timeout: Channel<IdleTimeout>,

    // Minigame events
    pub minigame_started: Channel<()>,
    /// Payload: whether the round was won
    pub minigame_ended: Channel<bool>,
    pub score_changed: Channel<i32>,
    /// Payload: points awarded by the target
    pub target_hit: Channel<i32>,

    // Audio events
    pub spatial_audio_requested: Channel<SpatialAudioRequest>,
    pub global_audio_requested: Channel<AudioClip>,

    // VR comfort events
    pub vignette_toggled: Channel<bool>,
    /// Payload: degrees
    pub snap_turn_requested: Channel<f32>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            npc_interacted: Channel::new("npc_interacted"),
            npc_state_changed: Channel::new("npc_state_changed"),
            npc_speech: Channel::new("npc_speech"),
            idle_timeout: Channel::new("idle_timeout"),
            minigame_started: Channel::new("minigame_started"),
            minigame_ended: Channel::new("minigame_ended"),
            score_changed: Channel::new("score_changed"),
            target_hit: Channel::new("target_hit"),
            spatial_audio_requested: Channel::new("spatial_audio_requested"),
            global_audio_requested: Channel::new("global_audio_requested"),
            vignette_toggled: Channel::new("vignette_toggled"),
            snap_turn_requested: Channel::new("snap_turn_requested"),
        }
    }

    /// Remove every subscriber from every channel (scene teardown).
    pub fn unsubscribe_all(&self) {
        self.npc_interacted.clear();
        self.npc_state_changed.clear();
        self.npc_speech.clear();
        self.idle_timeout.clear();
        self.minigame_started.clear();
        self.minigame_ended.clear();
        self.score_changed.clear();
        self.target_hit.clear();
        self.spatial_audio_requested.clear();
        self.global_audio_requested.clear();
        self.vignette_toggled.clear();
        self.snap_turn_requested.clear();
    }

    /// Total subscribers across all channels
    pub fn subscriber_count(&self) -> usize {
        self.npc_interacted.subscriber_count()
            + self.npc_state_changed.subscriber_count()
            + self.npc_speech.subscriber_count()
            + self.idle_timeout.subscriber_count()
            + self.minigame_started.subscriber_count()
            + self.minigame_ended.subscriber_count()
            + self.score_changed.subscriber_count()
            + self.target_hit.subscriber_count()
            + self.spatial_audio_requested.subscriber_count()
            + self.global_audio_requested.subscriber_count()
            + self.vignette_toggled.subscriber_count()
            + self.snap_turn_requested.subscriber_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
