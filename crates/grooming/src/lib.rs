//! Procedural strand grooming for Pentimento.
//!
//! This crate grows hair/fur strands on a surface and keeps them moving:
//! - Brush strokes sample root placements on the target surface
//! - Strands are mass-point chains with a regenerable rest pose
//! - A constraint solver advances strands under gravity, wind and shape memory
//! - A scheduler bounds per-frame physics and render work
//! - Render sync mirrors strands into instances or one merged mesh
//!
//! # Architecture
//!
//! The host owns the main loop and the collaborators the groom needs:
//! ray casting ([`SurfaceRaycast`]), the camera ([`Viewpoint`]) and render
//! resources ([`RenderHost`]). Everything else lives in a [`GroomState`]
//! passed explicitly to each entry point.
//!
//! ## Key Components
//!
//! - **Sampler**: pointer ray → accepted root placements
//! - **Factory**: root placement → strand chain and rest pose
//! - **Solver**: one strand, one time step
//! - **Scheduler**: rotating physics window and render throttle
//! - **Render**: instanced or merged representation behind one `sync`
//! - **Snapshot**: versioned JSON state for undo/redo

pub mod brush;
pub mod factory;
pub mod raycast;
pub mod render;
pub mod sampler;
pub mod scheduler;
pub mod snapshot;
pub mod solver;
pub mod state;
pub mod types;

#[cfg(feature = "bevy")]
pub mod bevy_mesh;

pub use brush::{BrushParams, GroomBrush, PointerEvent, StrokePhase};
pub use factory::{StrandFactory, ideal_chain};
pub use raycast::{PerspectiveViewpoint, TriangleSurface};
pub use render::{
    InstanceTransform, RenderConfig, RenderHandle, RenderHost, RenderStats, RenderStrategy,
    RenderSync, StrandMesh,
};
pub use sampler::{Ray, RootPlacement, SurfaceHit, SurfaceRaycast, SurfaceSampler, Viewpoint};
pub use scheduler::{PhysicsTick, UpdateScheduler};
pub use snapshot::{GroomSnapshot, SnapshotError, StrandSnapshot};
pub use solver::{AnchorBody, ConstraintSolver, Environment, SolverConfig};
pub use state::GroomState;
pub use types::{RestPose, Segment, Strand, StrandId};

pub use groom_config::{GroomParameter, GroomSettings, RenderStrategyKind};
