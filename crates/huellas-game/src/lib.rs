//! Huellas Game - NPC behaviour and minigame logic
//!
//! Provides the NPC state machine and controller, NPC profiles, and the
//! target-throwing minigame. Everything engine-specific (navigation, animation,
//! ground probing) is reached through the driver traits in [`npc::drivers`].

pub mod minigame;
pub mod npc;

pub use minigame::{MinigameConfig, MinigameManager, ScoreTarget, TargetConfig};
pub use npc::controller::{NpcConfig, NpcController, NpcControllerBuilder};
pub use npc::drivers::{AnimationDriver, GroundProbe, LocomotionDriver};
pub use npc::state::{NpcState, NpcStateKind, Transition};
pub use npc::voice::VoiceHandler;
pub use npc::{NpcKind, NpcProfile, ProfileError, ProfileLibrary};
