//! Groom state: the context every host entry point runs against.
//!
//! One `GroomState` per groom. The host forwards pointer events, calls
//! [`GroomState::simulate`] and [`GroomState::render_sync`] once per frame,
//! and sets parameters whenever the user changes them. Randomness comes
//! from a generator owned by the state so a fixed seed reproduces a
//! session exactly.

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use groom_config::{GroomParameter, GroomSettings, RenderStrategyKind};

use crate::brush::{BrushParams, GroomBrush, PointerEvent, StrokePhase};
use crate::factory::StrandFactory;
use crate::render::{RenderConfig, RenderHost, RenderSync};
use crate::sampler::{SurfaceHit, SurfaceRaycast, SurfaceSampler, Viewpoint};
use crate::scheduler::{PhysicsTick, UpdateScheduler};
use crate::snapshot::{GroomSnapshot, SnapshotError};
use crate::solver::{AnchorBody, ConstraintSolver, Environment, SolverConfig};
use crate::types::Strand;

/// Live groom: settings, strand population, scheduling and render state.
#[derive(Debug)]
pub struct GroomState {
    settings: GroomSettings,
    pub solver: ConstraintSolver,
    pub sampler: SurfaceSampler,
    strands: Vec<Strand>,
    factory: StrandFactory,
    brush: GroomBrush,
    scheduler: UpdateScheduler,
    render: RenderSync,
    /// Body of the groomed surface, taken from the last surface stroked
    anchor: Option<AnchorBody>,
    rng: StdRng,
    /// Cumulative host time in seconds
    elapsed: f32,
    /// A physics tick moved something since the last render
    physics_changed: bool,
    /// The population changed since the last render
    force_render: bool,
}

impl GroomState {
    /// Create an empty groom with an entropy-seeded generator.
    pub fn new(settings: GroomSettings) -> Self {
        Self::with_rng(settings, StdRng::from_entropy())
    }

    /// Create an empty groom whose randomness is fully determined by `seed`.
    pub fn with_seed(settings: GroomSettings, seed: u64) -> Self {
        Self::with_rng(settings, StdRng::seed_from_u64(seed))
    }

    fn with_rng(settings: GroomSettings, rng: StdRng) -> Self {
        let settings = settings.sanitized();
        let render = RenderSync::new(settings.render_strategy, RenderConfig::default());
        Self {
            settings,
            solver: ConstraintSolver::new(SolverConfig::default()),
            sampler: SurfaceSampler::default(),
            strands: Vec::new(),
            factory: StrandFactory::new(),
            brush: GroomBrush::new(),
            scheduler: UpdateScheduler::new(),
            render,
            anchor: None,
            rng,
            elapsed: 0.0,
            physics_changed: false,
            force_render: true,
        }
    }

    pub fn settings(&self) -> &GroomSettings {
        &self.settings
    }

    /// Number of live strands.
    pub fn strand_count(&self) -> usize {
        self.strands.len()
    }

    pub fn strands(&self) -> &[Strand] {
        &self.strands
    }

    pub fn render(&self) -> &RenderSync {
        &self.render
    }

    pub fn scheduler(&self) -> &UpdateScheduler {
        &self.scheduler
    }

    /// Body used by the anchor-proximity rule, if any.
    pub fn anchor(&self) -> Option<AnchorBody> {
        self.anchor
    }

    /// Replace the anchor body, for hosts that call [`GroomState::groom_at`]
    /// directly instead of forwarding pointer events.
    pub fn set_anchor(&mut self, anchor: Option<AnchorBody>) {
        self.anchor = anchor;
    }

    /// Cumulative host time seen by [`GroomState::simulate`].
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Whether a stroke is in progress.
    pub fn is_grooming(&self) -> bool {
        self.brush.is_stroking()
    }

    /// Change one parameter.
    ///
    /// Invalid values are logged and ignored. Returns `true` if stored.
    /// Shape parameters apply to strands grown afterwards; a render
    /// strategy change takes effect on the next render sync.
    pub fn set_parameter(&mut self, parameter: GroomParameter) -> bool {
        let stored = self.settings.apply(parameter);
        if stored {
            match parameter {
                GroomParameter::SimulationEnabled(enabled) => {
                    info!("Strand simulation {}", if enabled { "enabled" } else { "disabled" });
                }
                GroomParameter::RenderStrategy(_)
                | GroomParameter::MaxStrands(_)
                | GroomParameter::Thickness(_)
                | GroomParameter::RootColor(_)
                | GroomParameter::TipColor(_) => self.force_render = true,
                _ => {}
            }
        }
        stored
    }

    /// Forward a pointer event.
    ///
    /// While the primary button is held, each event casts a ray from the
    /// viewpoint and grows strands around the hit. A hit also makes the
    /// surface's bounding sphere the anchor body. Returns how many strands
    /// were added.
    pub fn handle_pointer(
        &mut self,
        event: PointerEvent,
        viewpoint: &dyn Viewpoint,
        surface: &dyn SurfaceRaycast,
    ) -> usize {
        let stroke = self.brush.active_stroke();
        let phase = self.brush.update(event);
        match phase {
            StrokePhase::Begin => debug!("Stroke {:?} began", self.brush.active_stroke()),
            StrokePhase::End => debug!("Stroke {:?} ended", stroke),
            StrokePhase::Drag | StrokePhase::Idle => {}
        }
        if !phase.samples() {
            return 0;
        }

        let ray = viewpoint.ray_through(event.ndc);
        let Some(hit) = surface.cast(&ray) else {
            return 0;
        };
        let anchor = surface.anchor_body();
        if anchor != self.anchor {
            debug!("Anchor body is now {:?}", anchor);
            self.anchor = anchor;
        }
        self.groom_at(&hit)
    }

    /// Grow strands in the brush disk around a surface hit.
    ///
    /// Capacity is clamped silently. Any growth forces the next render
    /// sync. Returns how many strands were added.
    pub fn groom_at(&mut self, hit: &SurfaceHit) -> usize {
        let params = BrushParams::from_settings(&self.settings, self.strands.len());
        let placements = self
            .sampler
            .sample_at_hit(hit, &params, &self.strands, &mut self.rng);

        for placement in &placements {
            let strand = self.factory.build(placement, &self.settings, &mut self.rng);
            self.strands.push(strand);
        }

        if !placements.is_empty() {
            self.force_render = true;
            debug!(
                "groom_at: added {} strands at {:?}, population {}",
                placements.len(),
                hit.point,
                self.strands.len()
            );
        }
        placements.len()
    }

    /// Advance host time by `dt` and run one physics tick.
    ///
    /// Returns `None` when simulation is disabled or `dt` is unusable;
    /// the population is left exactly as it was.
    pub fn simulate(&mut self, dt: f32) -> Option<PhysicsTick> {
        if !dt.is_finite() || dt <= 0.0 {
            return None;
        }
        self.elapsed += dt;
        if !self.settings.simulation_enabled {
            return None;
        }

        let env =
            Environment::from_settings(&self.settings, self.elapsed).with_anchor(self.anchor);
        let tick = self.scheduler.physics_tick(
            &mut self.strands,
            dt,
            &env,
            &self.solver,
            self.settings.batch_size as usize,
            &mut self.rng,
        );
        self.physics_changed |= tick.changed;
        Some(tick)
    }

    /// Mirror strands into render resources if a rebuild is due.
    ///
    /// A rebuild is due when the update interval elapsed, or immediately
    /// while grooming or after the population changed. Physics movement
    /// forces an instance upload right away; merged geometry picks it up
    /// at the next interval. Returns `true` if a rebuild happened.
    pub fn render_sync(&mut self, host: &mut dyn RenderHost) -> bool {
        if self.render.set_strategy(self.settings.render_strategy, host) {
            self.force_render = true;
        }

        let physics_forced =
            self.physics_changed && self.render.kind() == RenderStrategyKind::Instanced;
        let forced = self.force_render || physics_forced || self.brush.is_stroking();
        if !self
            .scheduler
            .should_render(self.elapsed, self.settings.update_interval, forced)
        {
            return false;
        }

        self.render.sync(&self.strands, &self.settings, host);
        self.scheduler.mark_rendered(self.elapsed);
        self.force_render = false;
        self.physics_changed = false;
        true
    }

    /// Release every render resource, e.g. when the groom is closed.
    pub fn release_render(&mut self, host: &mut dyn RenderHost) {
        self.render.release(host);
        self.force_render = true;
    }

    /// Drop every strand.
    pub fn clear(&mut self) {
        let removed = self.strands.len();
        self.strands.clear();
        self.brush.cancel();
        self.force_render = true;
        info!("Cleared groom ({} strands)", removed);
    }

    /// Capture the full strand state.
    pub fn snapshot(&self) -> GroomSnapshot {
        GroomSnapshot::capture(&self.strands, self.factory.next_id())
    }

    /// Replace the population with a snapshot.
    ///
    /// On error the live population is untouched. Strands beyond the
    /// population cap are dropped with a warning.
    pub fn restore(&mut self, snapshot: &GroomSnapshot) -> Result<(), SnapshotError> {
        let mut strands = snapshot.restore_strands()?;

        let cap = self.settings.max_strands as usize;
        if strands.len() > cap {
            warn!(
                "Snapshot holds {} strands, keeping the first {} allowed by max_strands",
                strands.len(),
                cap
            );
            strands.truncate(cap);
        }

        let after_restored = snapshot
            .strands
            .iter()
            .map(|s| s.id.0 + 1)
            .max()
            .unwrap_or(0);
        self.factory
            .set_next_id(snapshot.next_strand_id.max(after_restored));

        self.strands = strands;
        self.brush.cancel();
        self.force_render = true;
        debug!("restore: {} strands", self.strands.len());
        Ok(())
    }

    /// Decode a JSON snapshot and restore it.
    pub fn restore_json(&mut self, json: &str) -> Result<(), SnapshotError> {
        let snapshot = GroomSnapshot::from_json(json).inspect_err(|e| {
            warn!("Failed to decode groom snapshot: {}", e);
        })?;
        self.restore(&snapshot)
    }
}
