//! Groom brush: pointer events to stroke phases and sampling parameters.

use glam::Vec2;
use groom_config::GroomSettings;

/// Pointer input forwarded by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    /// Pointer position in normalized device coordinates (-1..1, +Y up)
    pub ndc: Vec2,
    /// Whether the primary button is held
    pub primary_held: bool,
}

impl PointerEvent {
    pub fn new(ndc: Vec2, primary_held: bool) -> Self {
        Self { ndc, primary_held }
    }
}

/// Where a pointer event falls in the stroke lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrokePhase {
    /// Button not held, no stroke in progress
    Idle,
    /// Button just pressed
    Begin,
    /// Button still held
    Drag,
    /// Button just released
    End,
}

impl StrokePhase {
    /// Whether roots should be sampled for this event.
    pub fn samples(&self) -> bool {
        matches!(self, StrokePhase::Begin | StrokePhase::Drag)
    }
}

/// Sampling parameters for one stroke event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrushParams {
    /// Disk radius in world units
    pub radius: f32,
    /// Target strands per unit area
    pub density: f32,
    pub max_per_stroke: usize,
    /// Free slots left under the population cap
    pub remaining_capacity: usize,
    /// Minimum distance between two roots
    pub min_spacing: f32,
    /// Root direction jitter
    pub randomness: f32,
}

impl BrushParams {
    /// Derive parameters from the current settings and population.
    pub fn from_settings(settings: &GroomSettings, population: usize) -> Self {
        Self {
            radius: settings.brush_radius,
            density: settings.density,
            max_per_stroke: settings.max_strands_per_stroke as usize,
            remaining_capacity: (settings.max_strands as usize).saturating_sub(population),
            min_spacing: settings.min_root_spacing,
            randomness: settings.randomness,
        }
    }
}

/// Tracks the active groom stroke.
#[derive(Debug, Default)]
pub struct GroomBrush {
    active_stroke: Option<u64>,
    next_stroke_id: u64,
}

impl GroomBrush {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the stroke lifecycle with a pointer event.
    pub fn update(&mut self, event: PointerEvent) -> StrokePhase {
        match (self.active_stroke.is_some(), event.primary_held) {
            (false, true) => {
                self.active_stroke = Some(self.next_stroke_id);
                self.next_stroke_id += 1;
                StrokePhase::Begin
            }
            (true, true) => StrokePhase::Drag,
            (true, false) => {
                self.active_stroke = None;
                StrokePhase::End
            }
            (false, false) => StrokePhase::Idle,
        }
    }

    /// Whether the user is actively grooming.
    pub fn is_stroking(&self) -> bool {
        self.active_stroke.is_some()
    }

    pub fn active_stroke(&self) -> Option<u64> {
        self.active_stroke
    }

    /// Drop the active stroke without a release event.
    pub fn cancel(&mut self) {
        self.active_stroke = None;
    }
}
