//! Independent, validated updates to single grooming parameters.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{GroomSettings, MAX_SEGMENT_COUNT, MAX_STRAND_CAPACITY, RenderStrategyKind};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterError {
    #[error("{name} must be finite")]
    NonFinite { name: &'static str },
    #[error("{name}={value} is outside [{min}, {max}]")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// One settable grooming parameter with its new value.
///
/// Serialized as `{ "parameter": "curl", "value": 1.5 }` so a UI can send
/// single-field updates without knowing the whole settings document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "parameter", content = "value", rename_all = "snake_case")]
pub enum GroomParameter {
    SegmentCount(u32),
    SegmentLength(f32),
    Stiffness(f32),
    Gravity(f32),
    WindStrength(f32),
    Turbulence(f32),
    Damping(f32),
    AirResistance(f32),
    Thickness(f32),
    Density(f32),
    Curl(f32),
    Randomness(f32),
    ClumpSize(f32),
    Frizz(f32),
    Wave(f32),
    MaxStrands(u32),
    MaxStrandsPerStroke(u32),
    BrushRadius(f32),
    MinRootSpacing(f32),
    RootColor([f32; 4]),
    TipColor([f32; 4]),
    BatchSize(u32),
    UpdateInterval(f32),
    RenderStrategy(RenderStrategyKind),
    SimulationEnabled(bool),
}

impl GroomParameter {
    /// Check the value against its allowed range.
    pub fn validate(self) -> Result<Self, ParameterError> {
        use GroomParameter as P;
        match self {
            P::SegmentCount(v) => count("segment_count", v, 2, MAX_SEGMENT_COUNT)?,
            P::SegmentLength(v) => positive("segment_length", v)?,
            P::Stiffness(v) => in_range("stiffness", v, 0.0, 1.0)?,
            P::Gravity(v) => finite("gravity", v)?,
            P::WindStrength(v) => non_negative("wind_strength", v)?,
            P::Turbulence(v) => non_negative("turbulence", v)?,
            P::Damping(v) => in_range("damping", v, 0.0, 1.0)?,
            P::AirResistance(v) => in_range("air_resistance", v, 0.0, 1.0)?,
            P::Thickness(v) => positive("thickness", v)?,
            P::Density(v) => non_negative("density", v)?,
            P::Curl(v) => finite("curl", v)?,
            P::Randomness(v) => non_negative("randomness", v)?,
            P::ClumpSize(v) => in_range("clump_size", v, 0.0, 1.0)?,
            P::Frizz(v) => non_negative("frizz", v)?,
            P::Wave(v) => finite("wave", v)?,
            P::MaxStrands(v) => count("max_strands", v, 1, MAX_STRAND_CAPACITY)?,
            P::MaxStrandsPerStroke(v) => {
                count("max_strands_per_stroke", v, 1, MAX_STRAND_CAPACITY)?
            }
            P::BrushRadius(v) => positive("brush_radius", v)?,
            P::MinRootSpacing(v) => non_negative("min_root_spacing", v)?,
            P::RootColor(c) => color("root_color", c)?,
            P::TipColor(c) => color("tip_color", c)?,
            P::BatchSize(v) => count("batch_size", v, 1, u32::MAX)?,
            P::UpdateInterval(v) => non_negative("update_interval", v)?,
            P::RenderStrategy(_) | P::SimulationEnabled(_) => {}
        }
        Ok(self)
    }

    /// Write the value into the settings without validation.
    pub(crate) fn store(self, settings: &mut GroomSettings) {
        use GroomParameter as P;
        match self {
            P::SegmentCount(v) => settings.segment_count = v,
            P::SegmentLength(v) => settings.segment_length = v,
            P::Stiffness(v) => settings.stiffness = v,
            P::Gravity(v) => settings.gravity = v,
            P::WindStrength(v) => settings.wind_strength = v,
            P::Turbulence(v) => settings.turbulence = v,
            P::Damping(v) => settings.damping = v,
            P::AirResistance(v) => settings.air_resistance = v,
            P::Thickness(v) => settings.thickness = v,
            P::Density(v) => settings.density = v,
            P::Curl(v) => settings.curl = v,
            P::Randomness(v) => settings.randomness = v,
            P::ClumpSize(v) => settings.clump_size = v,
            P::Frizz(v) => settings.frizz = v,
            P::Wave(v) => settings.wave = v,
            P::MaxStrands(v) => settings.max_strands = v,
            P::MaxStrandsPerStroke(v) => settings.max_strands_per_stroke = v,
            P::BrushRadius(v) => settings.brush_radius = v,
            P::MinRootSpacing(v) => settings.min_root_spacing = v,
            P::RootColor(c) => settings.root_color = c,
            P::TipColor(c) => settings.tip_color = c,
            P::BatchSize(v) => settings.batch_size = v,
            P::UpdateInterval(v) => settings.update_interval = v,
            P::RenderStrategy(v) => settings.render_strategy = v,
            P::SimulationEnabled(v) => settings.simulation_enabled = v,
        }
    }
}

fn finite(name: &'static str, value: f32) -> Result<(), ParameterError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ParameterError::NonFinite { name })
    }
}

fn in_range(name: &'static str, value: f32, min: f32, max: f32) -> Result<(), ParameterError> {
    finite(name, value)?;
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ParameterError::OutOfRange {
            name,
            value: value as f64,
            min: min as f64,
            max: max as f64,
        })
    }
}

fn non_negative(name: &'static str, value: f32) -> Result<(), ParameterError> {
    in_range(name, value, 0.0, f32::MAX)
}

fn positive(name: &'static str, value: f32) -> Result<(), ParameterError> {
    in_range(name, value, f32::MIN_POSITIVE, f32::MAX)
}

fn count(name: &'static str, value: u32, min: u32, max: u32) -> Result<(), ParameterError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ParameterError::OutOfRange {
            name,
            value: value as f64,
            min: min as f64,
            max: max as f64,
        })
    }
}

fn color(name: &'static str, rgba: [f32; 4]) -> Result<(), ParameterError> {
    for channel in rgba {
        in_range(name, channel, 0.0, 1.0)?;
    }
    Ok(())
}
