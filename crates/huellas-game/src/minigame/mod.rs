//! Target-throwing minigame
//!
//! Targets and the manager never reference each other: targets publish
//! `target_hit`, the manager listens for it.

mod manager;
mod target;

pub use manager::{MinigameConfig, MinigameManager};
pub use target::{ScoreTarget, TargetConfig};
