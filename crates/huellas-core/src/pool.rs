//! Generic object pool for resources that are expensive to construct.
//!
//! Instances are built up front (pre-warm) and recycled instead of being
//! created and dropped at runtime. When the pool runs dry it grows on demand,
//! warning once per extra instance, up to a hard cap.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Hooks invoked when an instance leaves or re-enters the pool.
pub trait Poolable {
    /// Called when the instance is handed out by [`ObjectPool::get`].
    fn on_acquire(&mut self) {}

    /// Called when the instance is handed back via [`ObjectPool::release`].
    fn on_release(&mut self) {}
}

/// Sizing for an [`ObjectPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Instances constructed up front
    pub capacity: usize,
    /// Upper bound on live instances, including growth past `capacity`
    pub max_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            max_size: 32,
        }
    }
}

/// Errors returned by an [`ObjectPool`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("pool '{label}' exhausted: all {max_size} instances are in use")]
    Exhausted { label: String, max_size: usize },
}

/// Fixed-capacity FIFO pool of reusable instances.
pub struct ObjectPool<T> {
    label: String,
    idle: VecDeque<T>,
    factory: Box<dyn FnMut(usize) -> T>,
    config: PoolConfig,
    /// Instances constructed and not yet dropped by `clear`
    live: usize,
    total_created: usize,
    exhaustion_warnings: usize,
}

impl<T: Poolable> ObjectPool<T> {
    /// Create a pool and pre-warm it with `config.capacity` instances.
    ///
    /// The factory receives the running construction index, handy for naming.
    pub fn new<F>(label: impl Into<String>, config: PoolConfig, factory: F) -> Self
    where
        F: FnMut(usize) -> T + 'static,
    {
        let config = PoolConfig {
            capacity: config.capacity,
            max_size: config.max_size.max(config.capacity),
        };
        let mut pool = Self {
            label: label.into(),
            idle: VecDeque::with_capacity(config.capacity),
            factory: Box::new(factory),
            config,
            live: 0,
            total_created: 0,
            exhaustion_warnings: 0,
        };

        for _ in 0..config.capacity {
            let mut instance = pool.construct();
            instance.on_release();
            pool.idle.push_back(instance);
        }
        debug!(pool = %pool.label, capacity = config.capacity, "Pool pre-warmed");
        pool
    }

    fn construct(&mut self) -> T {
        let instance = (self.factory)(self.total_created);
        self.total_created += 1;
        self.live += 1;
        instance
    }

    /// Take an idle instance, constructing one if the pool is empty.
    pub fn get(&mut self) -> Result<T, PoolError> {
        let mut instance = match self.idle.pop_front() {
            Some(instance) => instance,
            None => {
                if self.live >= self.config.max_size {
                    warn!(
                        pool = %self.label,
                        max_size = self.config.max_size,
                        "Pool exhausted at its cap, refusing to grow"
                    );
                    return Err(PoolError::Exhausted {
                        label: self.label.clone(),
                        max_size: self.config.max_size,
                    });
                }
                warn!(pool = %self.label, live = self.live + 1, "Pool exhausted, creating new instance");
                self.exhaustion_warnings += 1;
                self.construct()
            }
        };

        instance.on_acquire();
        Ok(instance)
    }

    /// Return an instance to the back of the queue.
    ///
    /// Releasing an instance that is already pooled is a caller error and is
    /// not detected.
    pub fn release(&mut self, mut instance: T) {
        instance.on_release();
        self.idle.push_back(instance);
    }

    /// Drop every idle instance. Instances currently handed out are unaffected.
    pub fn clear(&mut self) {
        let dropped = self.idle.len();
        self.idle.clear();
        self.live = self.live.saturating_sub(dropped);
        debug!(pool = %self.label, dropped, "Pool cleared");
    }

    /// Idle instances ready to be handed out
    pub fn available(&self) -> usize {
        self.idle.len()
    }

    /// Instances alive, idle or handed out
    pub fn live(&self) -> usize {
        self.live
    }

    /// Instances constructed over the pool's lifetime
    pub fn total_created(&self) -> usize {
        self.total_created
    }

    /// Times `get` had to grow the pool
    pub fn exhaustion_warnings(&self) -> usize {
        self.exhaustion_warnings
    }

    pub fn config(&self) -> PoolConfig {
        self.config
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl<T> fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPool")
            .field("label", &self.label)
            .field("idle", &self.idle.len())
            .field("live", &self.live)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Widget {
        id: usize,
        active: bool,
    }

    impl Poolable for Widget {
        fn on_acquire(&mut self) {
            self.active = true;
        }

        fn on_release(&mut self) {
            self.active = false;
        }
    }

    fn widget_pool(capacity: usize, max_size: usize) -> ObjectPool<Widget> {
        ObjectPool::new("widgets", PoolConfig { capacity, max_size }, |id| Widget { id, active: true })
    }

    #[test]
    fn prewarm_builds_capacity_inactive_instances() {
        let mut pool = widget_pool(4, 8);
        assert_eq!(pool.available(), 4);
        assert_eq!(pool.total_created(), 4);

        let widget = pool.get().unwrap();
        assert!(widget.active);
        pool.release(widget);
    }

    #[test]
    fn get_is_fifo() {
        let mut pool = widget_pool(3, 3);
        let first = pool.get().unwrap();
        assert_eq!(first.id, 0);
        pool.release(first);

        // The released instance goes to the back of the queue
        assert_eq!(pool.get().unwrap().id, 1);
        assert_eq!(pool.get().unwrap().id, 2);
        assert_eq!(pool.get().unwrap().id, 0);
    }

    #[test]
    fn get_release_cycles_never_grow_the_pool() {
        let mut pool = widget_pool(5, 10);
        for _ in 0..5 {
            let widget = pool.get().unwrap();
            pool.release(widget);
        }
        for _ in 0..100 {
            let widget = pool.get().unwrap();
            pool.release(widget);
        }
        assert_eq!(pool.total_created(), 5);
        assert_eq!(pool.exhaustion_warnings(), 0);
    }

    #[test]
    fn exhaustion_grows_with_one_warning_per_excess_request() {
        let mut pool = widget_pool(3, 10);
        let mut held: Vec<Widget> = (0..3).map(|_| pool.get().unwrap()).collect();
        assert_eq!(pool.exhaustion_warnings(), 0);

        let extra = pool.get().unwrap();
        assert!(extra.active);
        assert_eq!(extra.id, 3);
        assert_eq!(pool.exhaustion_warnings(), 1);
        held.push(extra);

        held.push(pool.get().unwrap());
        assert_eq!(pool.exhaustion_warnings(), 2);
        assert_eq!(pool.live(), 5);
    }

    #[test]
    fn growth_stops_at_max_size() {
        let mut pool = widget_pool(2, 3);
        let _held: Vec<Widget> = (0..3).map(|_| pool.get().unwrap()).collect();

        let err = pool.get().unwrap_err();
        assert_eq!(
            err,
            PoolError::Exhausted {
                label: "widgets".into(),
                max_size: 3
            }
        );
        assert_eq!(pool.total_created(), 3);
    }

    #[test]
    fn max_size_is_at_least_capacity() {
        let pool = widget_pool(6, 2);
        assert_eq!(pool.config().max_size, 6);
    }

    #[test]
    fn clear_drops_only_idle_instances() {
        let mut pool = widget_pool(4, 4);
        let held = pool.get().unwrap();
        pool.clear();
        assert_eq!(pool.available(), 0);
        assert_eq!(pool.live(), 1);

        // Room to grow again now that the idle instances are gone
        pool.release(held);
        let _a = pool.get().unwrap();
        let _b = pool.get().unwrap();
        assert_eq!(pool.live(), 2);
    }
}
