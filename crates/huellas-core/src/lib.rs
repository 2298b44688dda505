//! Huellas Core - Core types and utilities shared by every Huellas crate
//!
//! This crate provides the foundational pieces the rest of the workspace builds on:
//! - Mathematical primitives (re-exported from glam)
//! - Transform and audio clip handles
//! - Game time with clamped, scalable delta
//! - The event bus that decouples publishers from subscribers
//! - A generic object pool for expensive-to-create resources

pub mod events;
pub mod pool;
pub mod time;
pub mod types;

pub use events::{Channel, EventBus, SubscriptionId};
pub use glam::{Quat, Vec3};
pub use pool::{ObjectPool, PoolConfig, PoolError, Poolable};
pub use time::{GameTime, TimeConfig};
pub use types::{AudioClip, Transform};
