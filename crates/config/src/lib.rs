//! Shared configuration for strand grooming
//!
//! This crate provides the single source of truth for every tunable
//! grooming parameter: strand shape, physics coefficients, brush sampling,
//! scheduling budgets and the render strategy. Values can be replaced as a
//! whole document (JSON) or one parameter at a time from the UI.

use serde::{Deserialize, Serialize};
use tracing::warn;

#[cfg(feature = "bevy")]
use bevy::prelude::Resource;

mod parameter;

pub use parameter::{GroomParameter, ParameterError};

/// Default number of mass points per strand (root included)
pub const DEFAULT_SEGMENT_COUNT: u32 = 8;

/// Default rest length between adjacent mass points
pub const DEFAULT_SEGMENT_LENGTH: f32 = 0.05;

/// Default population cap (also the instance buffer capacity)
pub const DEFAULT_MAX_STRANDS: u32 = 5000;

/// Default number of strands advanced per physics tick
pub const DEFAULT_BATCH_SIZE: u32 = 256;

/// Upper bound on mass points per strand
pub const MAX_SEGMENT_COUNT: u32 = 64;

/// Upper bound on `max_strands`; the instance buffer is sized from it up front
pub const MAX_STRAND_CAPACITY: u32 = 1_000_000;

/// How strands are mirrored into GPU-facing resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStrategyKind {
    /// One shared strand geometry plus a per-strand transform
    #[default]
    Instanced,
    /// One combined tube mesh rebuilt from every strand
    Merged,
}

/// Every tunable grooming parameter.
///
/// Missing fields in a serialized document take their default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "bevy", derive(Resource))]
#[serde(default)]
pub struct GroomSettings {
    /// Mass points per strand, root included
    pub segment_count: u32,
    /// Rest length between adjacent mass points
    pub segment_length: f32,
    /// Shape spring gain (0.0 - 1.0)
    pub stiffness: f32,
    /// Gravity magnitude, applied along -Y
    pub gravity: f32,
    pub wind_strength: f32,
    pub turbulence: f32,
    /// Per-step velocity damping (0.0 - 1.0)
    pub damping: f32,
    /// Coupling between wind and strands (0.0 - 1.0)
    pub air_resistance: f32,
    /// Strand radius used by both render strategies
    pub thickness: f32,
    /// Target strands per unit of surface area
    pub density: f32,
    pub curl: f32,
    /// Jitter applied to each root's growth direction
    pub randomness: f32,
    /// Pull of strand tips toward the stroke normal (0.0 - 1.0)
    pub clump_size: f32,
    pub frizz: f32,
    pub wave: f32,
    /// Hard cap on the strand population
    pub max_strands: u32,
    pub max_strands_per_stroke: u32,
    /// Brush disk radius in world units
    pub brush_radius: f32,
    /// Minimum distance between two accepted roots
    pub min_root_spacing: f32,
    /// Root color as RGBA (0.0-1.0)
    pub root_color: [f32; 4],
    /// Tip color as RGBA (0.0-1.0)
    pub tip_color: [f32; 4],
    /// Strands advanced per physics tick
    pub batch_size: u32,
    /// Seconds between throttled render rebuilds
    pub update_interval: f32,
    pub render_strategy: RenderStrategyKind,
    pub simulation_enabled: bool,
}

impl Default for GroomSettings {
    fn default() -> Self {
        Self {
            segment_count: DEFAULT_SEGMENT_COUNT,
            segment_length: DEFAULT_SEGMENT_LENGTH,
            stiffness: 0.5,
            gravity: 9.81,
            wind_strength: 0.0,
            turbulence: 0.2,
            damping: 0.05,
            air_resistance: 0.3,
            thickness: 0.004,
            density: 400.0,
            curl: 0.0,
            randomness: 0.15,
            clump_size: 0.0,
            frizz: 0.05,
            wave: 0.0,
            max_strands: DEFAULT_MAX_STRANDS,
            max_strands_per_stroke: 64,
            brush_radius: 0.25,
            min_root_spacing: 0.01,
            // Dark brown roots fading to a lighter tip
            root_color: [0.18, 0.11, 0.06, 1.0],
            tip_color: [0.55, 0.40, 0.25, 1.0],
            batch_size: DEFAULT_BATCH_SIZE,
            update_interval: 0.1,
            render_strategy: RenderStrategyKind::Instanced,
            simulation_enabled: true,
        }
    }
}

impl GroomSettings {
    /// Parse settings from JSON.
    ///
    /// Malformed documents fall back to the defaults; individual invalid
    /// fields fall back to their default value. Both cases log a warning.
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str::<GroomSettings>(json) {
            Ok(parsed) => parsed.sanitized(),
            Err(e) => {
                warn!("Malformed groom settings, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Serialize settings to pretty JSON.
    pub fn to_json(&self) -> String {
        // Every field is a plain number, bool, array or unit enum.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Apply a single parameter change.
    ///
    /// Returns `true` if the value was stored. Invalid values are rejected
    /// with a warning and the last-known value is kept.
    pub fn apply(&mut self, parameter: GroomParameter) -> bool {
        match parameter.validate() {
            Ok(valid) => {
                valid.store(self);
                true
            }
            Err(e) => {
                warn!("Ignoring groom parameter {:?}: {}", parameter, e);
                false
            }
        }
    }

    /// Replace every invalid field by its default value.
    pub fn sanitized(self) -> Self {
        let mut clean = Self::default();
        for parameter in self.parameters() {
            clean.apply(parameter);
        }
        clean
    }

    /// All current values as individually applicable parameters.
    pub fn parameters(&self) -> Vec<GroomParameter> {
        use GroomParameter as P;
        vec![
            P::SegmentCount(self.segment_count),
            P::SegmentLength(self.segment_length),
            P::Stiffness(self.stiffness),
            P::Gravity(self.gravity),
            P::WindStrength(self.wind_strength),
            P::Turbulence(self.turbulence),
            P::Damping(self.damping),
            P::AirResistance(self.air_resistance),
            P::Thickness(self.thickness),
            P::Density(self.density),
            P::Curl(self.curl),
            P::Randomness(self.randomness),
            P::ClumpSize(self.clump_size),
            P::Frizz(self.frizz),
            P::Wave(self.wave),
            P::MaxStrands(self.max_strands),
            P::MaxStrandsPerStroke(self.max_strands_per_stroke),
            P::BrushRadius(self.brush_radius),
            P::MinRootSpacing(self.min_root_spacing),
            P::RootColor(self.root_color),
            P::TipColor(self.tip_color),
            P::BatchSize(self.batch_size),
            P::UpdateInterval(self.update_interval),
            P::RenderStrategy(self.render_strategy),
            P::SimulationEnabled(self.simulation_enabled),
        ]
    }
}
