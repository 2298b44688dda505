//! Huellas Audio - Pooled audio playback using kira
//!
//! Plays spatial and global one-shot sounds through a fixed pool of emitters,
//! returning each emitter to the pool once its clip has finished.

mod backend;
mod config;
mod emitter;
mod error;
mod manager;
mod spatial;

pub use backend::{AudioBackend, KiraBackend, PlaybackId, SilentBackend};
pub use config::AudioConfig;
pub use emitter::{Emitter, EmitterId};
pub use error::AudioError;
pub use manager::{AudioManager, AudioSubscriptions};
pub use spatial::{compute_spatial, Listener, SpatialParams};
