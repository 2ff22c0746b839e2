//! Constraint solver: advances one strand by one time step.
//!
//! Segments are swept root to tip, so each segment reads the already
//! updated position of its predecessor within the same call. Gravity,
//! wind and frizz are integrated explicitly; the shape spring is
//! integrated implicitly so its stiffness never limits the step size.
//! After integration two relaxation passes run over the whole strand:
//! length correction toward the rest lengths, then a gentle shape-memory
//! pull toward the ideal chain. A final root-to-tip projection settles
//! what is left of the length error. Velocities are re-derived from the
//! displacement over the step.

use glam::{Quat, Vec3};
use groom_config::GroomSettings;
use rand::Rng;
use tracing::warn;

use crate::sampler::random_unit_vector;
use crate::types::Strand;

/// Solver tuning.
///
/// Values are configurable and should not be treated as magic numbers.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Length error below which a pair is left alone (default: 0.001)
    pub length_tolerance: f32,
    /// Fraction of the length error corrected per pass (default: 1.0)
    pub constraint_stiffness: f32,
    /// Length error the final projection leaves in place (default: 1e-4)
    pub settle_tolerance: f32,
    /// Shape-memory pull at the root, fading toward the tip (default: 0.03)
    pub shape_memory: f32,
    /// Converts the 0-1 stiffness setting into a spring constant (default: 1000.0)
    pub shape_spring_gain: f32,
    /// Chance per segment per step of a frizz impulse (default: 0.02)
    pub frizz_probability: f32,
    /// Force of one frizz impulse per unit of frizz (default: 40.0)
    pub frizz_impulse: f32,
    /// Gravity lost between root and tip (default: 0.3)
    pub gravity_taper: f32,
    /// Shape-spring rotation per unit curl per segment index, radians (default: 0.05)
    pub curl_twist: f32,
    /// Anchor body radius multiplier for the proximity rule (default: 1.02)
    pub anchor_clearance: f32,
    /// Offset of a clamped first segment along the growth direction,
    /// as a fraction of its rest length (default: 0.5)
    pub anchor_offset: f32,
    /// Squared displacement that counts as movement (default: 1e-10)
    pub movement_epsilon: f32,
    /// Longest step integrated at once; longer frames are clamped (default: 1/30 s)
    pub max_time_step: f32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            length_tolerance: 0.001,
            constraint_stiffness: 1.0,
            settle_tolerance: 1e-4,
            shape_memory: 0.03,
            shape_spring_gain: 1000.0,
            frizz_probability: 0.02,
            frizz_impulse: 40.0,
            gravity_taper: 0.3,
            curl_twist: 0.05,
            anchor_clearance: 1.02,
            anchor_offset: 0.5,
            movement_epsilon: 1e-10,
            max_time_step: 1.0 / 30.0,
        }
    }
}

/// Bounding sphere of the surface strands are anchored to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorBody {
    pub center: Vec3,
    pub radius: f32,
}

impl AnchorBody {
    /// Sphere around the axis-aligned bounds of `points`.
    ///
    /// `None` for empty or non-finite input.
    pub fn enclosing(points: &[Vec3]) -> Option<Self> {
        let first = *points.first()?;
        if !points.iter().all(|p| p.is_finite()) {
            return None;
        }
        let (min, max) = points
            .iter()
            .fold((first, first), |(min, max), &p| (min.min(p), max.max(p)));
        let center = (min + max) * 0.5;
        let radius = points
            .iter()
            .map(|p| p.distance(center))
            .fold(0.0f32, f32::max);

        (radius > 0.0).then_some(Self { center, radius })
    }

    /// Whether `root` lies deeper inside the body than the clearance band.
    ///
    /// Strands rooted there, such as strands on a plane cutting through
    /// its own bounding sphere, are exempt from the proximity rule.
    pub fn buries(&self, root: Vec3, clearance: f32) -> bool {
        root.distance(self.center) < self.radius * (2.0 - clearance)
    }
}

/// Per-tick external conditions shared by every strand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Environment {
    /// Gravity acceleration vector
    pub gravity: Vec3,
    pub wind_strength: f32,
    pub turbulence: f32,
    pub air_resistance: f32,
    pub damping: f32,
    pub stiffness: f32,
    pub curl: f32,
    pub frizz: f32,
    /// Cumulative host time in seconds
    pub elapsed: f32,
    /// Body of the groomed surface; `None` disables the proximity rule
    pub anchor: Option<AnchorBody>,
}

impl Environment {
    /// Snapshot the physics-related settings at `elapsed` seconds.
    pub fn from_settings(settings: &GroomSettings, elapsed: f32) -> Self {
        Self {
            gravity: Vec3::NEG_Y * settings.gravity,
            wind_strength: settings.wind_strength,
            turbulence: settings.turbulence,
            air_resistance: settings.air_resistance,
            damping: settings.damping.clamp(0.0, 1.0),
            stiffness: settings.stiffness,
            curl: settings.curl,
            frizz: settings.frizz,
            elapsed,
            anchor: None,
        }
    }

    pub fn with_anchor(self, anchor: Option<AnchorBody>) -> Self {
        Self { anchor, ..self }
    }

    /// Wind acting on the segment at `index`.
    ///
    /// A slowly rotating base direction with gusts, plus per-segment
    /// turbulence. Zero when wind strength is zero.
    pub fn wind(&self, index: usize) -> Vec3 {
        if self.wind_strength == 0.0 {
            return Vec3::ZERO;
        }
        let t = self.elapsed;
        let phase = index as f32 * 0.37;

        let gust = 0.75 + 0.25 * (t * 0.7).sin();
        let base = Vec3::new((t * 0.5).cos(), 0.0, (t * 0.5).sin()) * gust;
        let turbulence = Vec3::new(
            (t * 3.1 + phase).sin(),
            (t * 2.3 + phase).cos() * 0.3,
            (t * 4.7 + phase).cos(),
        ) * self.turbulence;

        (base + turbulence) * self.wind_strength
    }
}

/// Advances strands with forces, integration and relaxation.
#[derive(Debug, Clone, Default)]
pub struct ConstraintSolver {
    pub config: SolverConfig,
}

impl ConstraintSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Advance `strand` by `dt` seconds, clamped to the maximum step.
    ///
    /// Returns `true` if any segment moved more than the movement epsilon.
    /// Degenerate input (non-positive or non-finite `dt`, strands with
    /// fewer than two points) is a no-op. A strand whose state stops
    /// being finite is put back on its rest pose.
    pub fn simulate<R: Rng + ?Sized>(
        &self,
        strand: &mut Strand,
        dt: f32,
        env: &Environment,
        rng: &mut R,
    ) -> bool {
        let count = strand.segments.len();
        if count < 2 || !dt.is_finite() || dt <= 0.0 {
            return false;
        }
        let cfg = &self.config;
        let dt = dt.min(cfg.max_time_step);

        // The root never moves
        let root = &mut strand.segments[0];
        root.position = strand.root_position;
        root.previous_position = strand.root_position;
        root.velocity = Vec3::ZERO;
        root.accumulated_force = Vec3::ZERO;

        let twist_axis = strand.rest_pose.direction.normalize_or(strand.root_normal);
        let anchor = env
            .anchor
            .filter(|body| !body.buries(strand.root_position, cfg.anchor_clearance));
        let spring = env.stiffness * cfg.shape_spring_gain;
        let retain = 1.0 - env.damping;
        let mut changed = false;

        for i in 1..count {
            let fraction = i as f32 / (count - 1) as f32;
            let twist = Quat::from_axis_angle(twist_axis, env.curl * i as f32 * cfg.curl_twist);
            let ideal = strand.segments[i - 1].position + twist * strand.rest_offset(i);
            let clamp_target =
                strand.root_position + strand.root_normal * strand.rest_length(0) * cfg.anchor_offset;

            let segment = &mut strand.segments[i];

            let mut external = env.gravity * segment.mass * (1.0 - cfg.gravity_taper * fraction);

            // Tips catch more wind than roots
            let attenuation = 0.3 + 0.7 * fraction;
            external += env.wind(i) * attenuation * env.air_resistance;

            if env.frizz > 0.0 && rng.gen_range(0.0f32..1.0) < cfg.frizz_probability {
                let falloff = 1.0 - i as f32 / count as f32;
                external += random_unit_vector(rng) * env.frizz * cfg.frizz_impulse * falloff;
            }

            segment.accumulated_force = external + (ideal - segment.position) * spring;

            // Anchor proximity, the only collision rule
            if let Some(body) = anchor {
                let threshold = body.radius * cfg.anchor_clearance;
                let from_center = segment.position - body.center;
                if from_center.length() < threshold {
                    let before = segment.position;
                    if i == 1 {
                        segment.position = clamp_target;
                        segment.velocity = Vec3::ZERO;
                    } else {
                        let outward = from_center.normalize_or(strand.root_normal);
                        segment.position = body.center + outward * threshold;
                        let normal_speed = segment.velocity.dot(outward);
                        segment.velocity -= outward * normal_speed * 0.5;
                    }
                    changed |= before.distance_squared(segment.position) > cfg.movement_epsilon;
                }
            }

            segment.previous_position = segment.position;

            // Backward Euler on the spring: the step closes a fraction of
            // the gap to `ideal` that stays below one for any stiffness.
            let mass = segment.mass.max(f32::EPSILON);
            let predicted = segment.position + (segment.velocity + external / mass * dt) * retain * dt;
            let gain = retain * spring * dt * dt / mass;
            segment.position = predicted + (ideal - predicted) * (gain / (1.0 + gain));
        }

        self.relax_lengths(strand);
        self.apply_shape_memory(strand);
        self.settle_lengths(strand);

        let inv_dt = 1.0 / dt;
        for segment in strand.segments.iter_mut().skip(1) {
            let displacement = segment.position - segment.previous_position;
            changed |= displacement.length_squared() > cfg.movement_epsilon;
            segment.velocity = displacement * inv_dt;
        }

        let finite = strand
            .segments
            .iter()
            .all(|s| s.position.is_finite() && s.velocity.is_finite());
        if !finite {
            warn!("Strand {:?} diverged, resetting it to its rest pose", strand.id);
            strand.reset_to_rest();
            return true;
        }

        changed
    }

    /// Pull each adjacent pair toward its rest length.
    ///
    /// The correction is split evenly between the endpoints; a locked
    /// endpoint keeps its half.
    pub fn relax_lengths(&self, strand: &mut Strand) {
        let cfg = &self.config;
        for i in 0..strand.segments.len().saturating_sub(1) {
            let rest = strand.rest_length(i);
            let delta = strand.segments[i + 1].position - strand.segments[i].position;
            let length = delta.length();
            if length <= f32::EPSILON || (length - rest).abs() <= cfg.length_tolerance {
                continue;
            }

            // Positive when stretched: endpoints move toward each other
            let correction = delta / length * (length - rest) * cfg.constraint_stiffness * 0.5;
            if !strand.segments[i].locked {
                strand.segments[i].position += correction;
            }
            if !strand.segments[i + 1].locked {
                strand.segments[i + 1].position -= correction;
            }
        }
    }

    /// Nudge unlocked segments toward their ideal rest positions.
    pub fn apply_shape_memory(&self, strand: &mut Strand) {
        let count = strand.segments.len();
        if count < 2 {
            return;
        }
        for i in 1..count {
            if strand.segments[i].locked {
                continue;
            }
            let fraction = i as f32 / (count - 1) as f32;
            let ideal = strand.ideal_position(i);
            let pull = self.config.shape_memory * (1.0 - 0.5 * fraction);
            let segment = &mut strand.segments[i];
            segment.position += (ideal - segment.position) * pull;
        }
    }

    /// Put every segment back at rest length from its parent, root to tip.
    ///
    /// Each segment keeps its direction from the parent. Pairs within the
    /// settle tolerance are left alone.
    pub fn settle_lengths(&self, strand: &mut Strand) {
        for i in 1..strand.segments.len() {
            if strand.segments[i].locked {
                continue;
            }
            let rest = strand.rest_length(i - 1);
            let parent = strand.segments[i - 1].position;
            let delta = strand.segments[i].position - parent;
            if (delta.length() - rest).abs() <= self.config.settle_tolerance {
                continue;
            }
            let fallback = strand.rest_offset(i).normalize_or(strand.root_normal);
            strand.segments[i].position = parent + delta.normalize_or(fallback) * rest;
        }
    }
}
