//! Render synchronization: mirrors strand state into GPU-facing resources.
//!
//! Two interchangeable strategies share one `sync` contract:
//! - **Instanced**: a fixed-capacity per-instance transform buffer sized
//!   to the population cap
//! - **Merged**: one combined tube mesh rebuilt from scratch
//!
//! Resources are created and destroyed through a [`RenderHost`]. Every
//! rebuild and every strategy switch releases what was allocated before
//! allocating a replacement. Strand `i` always maps to instance slot `i`;
//! nothing here keeps references back into the simulation.

pub mod instanced;
pub mod merged;
pub mod spline;

use groom_config::{GroomSettings, RenderStrategyKind};
use tracing::debug;

use crate::types::Strand;
pub use instanced::{InstanceTransform, InstancedStrands};
pub use merged::{MergedStrands, StrandMesh};

/// Opaque host-side identifier for an allocated render resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderHandle(pub u64);

/// Render resource allocation and scene-graph attachment, provided by the host.
pub trait RenderHost {
    /// Allocate an instance buffer with room for `capacity` instances.
    fn create_instance_buffer(&mut self, capacity: usize) -> RenderHandle;
    /// Overwrite an instance buffer's contents.
    fn write_instances(&mut self, handle: RenderHandle, instances: &[InstanceTransform]);
    /// Upload a merged mesh.
    fn create_mesh(&mut self, mesh: &StrandMesh) -> RenderHandle;
    /// Insert a resource into the scene.
    fn attach(&mut self, handle: RenderHandle);
    /// Remove a resource from the scene.
    fn detach(&mut self, handle: RenderHandle);
    /// Free a resource. The handle is invalid afterwards.
    fn release(&mut self, handle: RenderHandle);
}

/// Render tuning.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Curve samples per segment span (default: 4)
    pub samples_per_segment: usize,
    /// Vertices around each tube ring (default: 6)
    pub tube_sides: usize,
    /// Tip radius as a fraction of the root radius (default: 0.2)
    pub tip_radius_scale: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            samples_per_segment: 4,
            tube_sides: 6,
            tip_radius_scale: 0.2,
        }
    }
}

/// Resource counters, cumulative over the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Merged mesh rebuilds
    pub rebuilds: u64,
    /// Buffer writes and mesh uploads
    pub uploads: u64,
    pub allocations: u64,
    pub releases: u64,
}

impl RenderStats {
    /// Resources currently alive.
    pub fn live(&self) -> u64 {
        self.allocations.saturating_sub(self.releases)
    }
}

/// The active representation.
#[derive(Debug)]
pub enum RenderStrategy {
    Instanced(InstancedStrands),
    Merged(MergedStrands),
}

impl RenderStrategy {
    fn empty(kind: RenderStrategyKind) -> Self {
        match kind {
            RenderStrategyKind::Instanced => Self::Instanced(InstancedStrands::new()),
            RenderStrategyKind::Merged => Self::Merged(MergedStrands::new()),
        }
    }

    pub fn kind(&self) -> RenderStrategyKind {
        match self {
            Self::Instanced(_) => RenderStrategyKind::Instanced,
            Self::Merged(_) => RenderStrategyKind::Merged,
        }
    }
}

/// Owns the render resources for one groom.
#[derive(Debug)]
pub struct RenderSync {
    pub config: RenderConfig,
    strategy: RenderStrategy,
    stats: RenderStats,
}

impl RenderSync {
    /// Start with `kind`. Nothing is allocated until the first sync.
    pub fn new(kind: RenderStrategyKind, config: RenderConfig) -> Self {
        Self {
            config,
            strategy: RenderStrategy::empty(kind),
            stats: RenderStats::default(),
        }
    }

    pub fn kind(&self) -> RenderStrategyKind {
        self.strategy.kind()
    }

    pub fn strategy(&self) -> &RenderStrategy {
        &self.strategy
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    /// Switch representation, releasing the current one first.
    ///
    /// Returns `false` if `kind` is already active. The new representation
    /// is allocated on the next sync.
    pub fn set_strategy(&mut self, kind: RenderStrategyKind, host: &mut dyn RenderHost) -> bool {
        if self.kind() == kind {
            return false;
        }
        self.release(host);
        debug!("render: switching strategy {:?} -> {:?}", self.kind(), kind);
        self.strategy = RenderStrategy::empty(kind);
        true
    }

    /// Mirror `strands` into the active representation.
    pub fn sync(&mut self, strands: &[Strand], settings: &GroomSettings, host: &mut dyn RenderHost) {
        match &mut self.strategy {
            RenderStrategy::Instanced(instanced) => {
                instanced.sync(strands, settings, &self.config, host, &mut self.stats)
            }
            RenderStrategy::Merged(merged) => {
                merged.sync(strands, settings, &self.config, host, &mut self.stats)
            }
        }
    }

    /// Release every resource held by the active representation.
    pub fn release(&mut self, host: &mut dyn RenderHost) {
        match &mut self.strategy {
            RenderStrategy::Instanced(instanced) => instanced.release(host, &mut self.stats),
            RenderStrategy::Merged(merged) => merged.release(host, &mut self.stats),
        }
    }

    /// Instance data, when the instanced strategy is active.
    pub fn instances(&self) -> Option<&[InstanceTransform]> {
        match &self.strategy {
            RenderStrategy::Instanced(instanced) => Some(instanced.instances()),
            RenderStrategy::Merged(_) => None,
        }
    }

    /// Merged geometry, when the merged strategy is active.
    pub fn mesh(&self) -> Option<&StrandMesh> {
        match &self.strategy {
            RenderStrategy::Merged(merged) => Some(merged.mesh()),
            RenderStrategy::Instanced(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Tracks live handles and rejects double frees.
    #[derive(Default)]
    struct LeakCheckHost {
        next: u64,
        live: HashSet<u64>,
        attached: HashSet<u64>,
    }

    impl LeakCheckHost {
        fn alloc(&mut self) -> RenderHandle {
            self.next += 1;
            self.live.insert(self.next);
            RenderHandle(self.next)
        }
    }

    impl RenderHost for LeakCheckHost {
        fn create_instance_buffer(&mut self, _capacity: usize) -> RenderHandle {
            self.alloc()
        }
        fn write_instances(&mut self, handle: RenderHandle, _instances: &[InstanceTransform]) {
            assert!(self.live.contains(&handle.0));
        }
        fn create_mesh(&mut self, _mesh: &StrandMesh) -> RenderHandle {
            self.alloc()
        }
        fn attach(&mut self, handle: RenderHandle) {
            assert!(self.attached.insert(handle.0));
        }
        fn detach(&mut self, handle: RenderHandle) {
            assert!(self.attached.remove(&handle.0));
        }
        fn release(&mut self, handle: RenderHandle) {
            assert!(!self.attached.contains(&handle.0));
            assert!(self.live.remove(&handle.0), "double release of {:?}", handle);
        }
    }

    #[test]
    fn test_nothing_allocated_before_sync() {
        let sync = RenderSync::new(RenderStrategyKind::Instanced, RenderConfig::default());
        assert_eq!(sync.stats().allocations, 0);
        assert_eq!(sync.instances(), Some(&[][..]));
        assert!(sync.mesh().is_none());
    }

    #[test]
    fn test_instanced_buffer_reused_until_capacity_changes() {
        let mut host = LeakCheckHost::default();
        let mut settings = GroomSettings::default();
        settings.max_strands = 16;
        let mut sync = RenderSync::new(RenderStrategyKind::Instanced, RenderConfig::default());

        sync.sync(&[], &settings, &mut host);
        sync.sync(&[], &settings, &mut host);
        assert_eq!(sync.stats().allocations, 1);
        assert_eq!(sync.instances().map(|i| i.len()), Some(16));

        settings.max_strands = 32;
        sync.sync(&[], &settings, &mut host);
        assert_eq!(sync.stats().allocations, 2);
        assert_eq!(sync.stats().releases, 1);
        assert_eq!(host.live.len(), 1);
    }

    #[test]
    fn test_switch_releases_once() {
        let mut host = LeakCheckHost::default();
        let settings = GroomSettings::default();
        let mut sync = RenderSync::new(RenderStrategyKind::Instanced, RenderConfig::default());
        sync.sync(&[], &settings, &mut host);

        assert!(sync.set_strategy(RenderStrategyKind::Merged, &mut host));
        assert!(!sync.set_strategy(RenderStrategyKind::Merged, &mut host));
        assert_eq!(sync.stats().releases, 1);
        assert!(host.live.is_empty());

        sync.release(&mut host);
        assert_eq!(sync.stats().releases, 1);
    }
}
