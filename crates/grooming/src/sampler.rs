//! Surface sampling: pointer rays to accepted strand root placements.
//!
//! A brush stroke casts one ray against the target surface. On a hit, a
//! tangent disk around the hit point is sampled with uniform areal
//! density and candidates too close to an existing root are rejected.

use std::f32::consts::{PI, TAU};

use glam::{Vec2, Vec3};
use rand::Rng;
use tracing::{trace, warn};

use crate::brush::BrushParams;
use crate::solver::AnchorBody;
use crate::types::Strand;

/// Retries allowed per requested root before the stroke gives up.
const MAX_ATTEMPTS_PER_ROOT: usize = 8;

/// |dot(normal, reference)| above which the reference axis is swapped.
const PARALLEL_THRESHOLD: f32 = 0.99;

/// A ray in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Normalized direction
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or(Vec3::NEG_Z),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Result of a successful surface ray cast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    pub point: Vec3,
    pub normal: Vec3,
    /// Host identifier of the object that was hit
    pub object: u32,
}

/// Ray casting against the designated target surface, provided by the host.
pub trait SurfaceRaycast {
    /// Closest hit along the ray, or `None` on a miss.
    fn cast(&self, ray: &Ray) -> Option<SurfaceHit>;

    /// Bounding sphere of the surface for the anchor-proximity rule.
    ///
    /// Surfaces that cannot provide one leave the rule disabled.
    fn anchor_body(&self) -> Option<AnchorBody> {
        None
    }
}

/// The active camera, provided by the host.
pub trait Viewpoint {
    /// Ray from the viewpoint through a pointer position in normalized
    /// device coordinates (-1..1 on both axes, +Y up).
    fn ray_through(&self, ndc: Vec2) -> Ray;
}

/// Orthonormal frame around a surface normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TangentBasis {
    pub tangent: Vec3,
    pub bitangent: Vec3,
    pub normal: Vec3,
}

impl TangentBasis {
    /// Point on the tangent plane at polar offset (`rho`, `theta`).
    pub fn disk_point(&self, center: Vec3, rho: f32, theta: f32) -> Vec3 {
        center + (self.tangent * theta.cos() + self.bitangent * theta.sin()) * rho
    }
}

/// Build a tangent basis from a normal.
///
/// Uses +Y as the reference axis and falls back to +X when the normal is
/// nearly parallel to it. A zero or non-finite normal is replaced by +Y.
pub fn tangent_basis(normal: Vec3) -> TangentBasis {
    let normal = match normal.try_normalize() {
        Some(n) => n,
        None => {
            warn!("Degenerate surface normal {:?}, substituting +Y", normal);
            Vec3::Y
        }
    };

    let reference = if normal.dot(Vec3::Y).abs() > PARALLEL_THRESHOLD {
        Vec3::X
    } else {
        Vec3::Y
    };

    let tangent = reference.cross(normal).normalize();
    let bitangent = normal.cross(tangent);

    TangentBasis {
        tangent,
        bitangent,
        normal,
    }
}

/// A root accepted by the sampler, ready for the strand factory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootPlacement {
    pub position: Vec3,
    /// Perturbed growth direction
    pub direction: Vec3,
    /// Unperturbed surface normal at the stroke center
    pub surface_normal: Vec3,
}

/// Number of candidates a stroke may place.
///
/// `min(floor(pi * r^2 * density), max_per_stroke, remaining_capacity)`.
pub fn candidate_count(
    radius: f32,
    density: f32,
    max_per_stroke: usize,
    remaining_capacity: usize,
) -> usize {
    let area_count = (PI * radius * radius * density).floor();
    let area_count = if area_count.is_finite() && area_count > 0.0 {
        area_count as usize
    } else {
        0
    };
    area_count.min(max_per_stroke).min(remaining_capacity)
}

/// Converts pointer rays into root placements.
#[derive(Debug, Clone)]
pub struct SurfaceSampler {
    /// Retries per requested root before giving up on the remainder
    pub max_attempts_per_root: usize,
}

impl Default for SurfaceSampler {
    fn default() -> Self {
        Self {
            max_attempts_per_root: MAX_ATTEMPTS_PER_ROOT,
        }
    }
}

impl SurfaceSampler {
    /// Cast `ray` against `surface` and sample roots around the hit.
    ///
    /// A miss returns no placements.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        ray: &Ray,
        surface: &dyn SurfaceRaycast,
        brush: &BrushParams,
        existing: &[Strand],
        rng: &mut R,
    ) -> Vec<RootPlacement> {
        let Some(hit) = surface.cast(ray) else {
            trace!("sample: ray missed target surface");
            return Vec::new();
        };
        self.sample_at_hit(&hit, brush, existing, rng)
    }

    /// Sample roots in the brush disk around a known surface hit.
    pub fn sample_at_hit<R: Rng + ?Sized>(
        &self,
        hit: &SurfaceHit,
        brush: &BrushParams,
        existing: &[Strand],
        rng: &mut R,
    ) -> Vec<RootPlacement> {
        let wanted = candidate_count(
            brush.radius,
            brush.density,
            brush.max_per_stroke,
            brush.remaining_capacity,
        );
        if wanted == 0 {
            return Vec::new();
        }

        let basis = tangent_basis(hit.normal);
        let min_spacing_sq = brush.min_spacing * brush.min_spacing;
        let max_attempts = wanted * self.max_attempts_per_root.max(1);

        let mut accepted: Vec<RootPlacement> = Vec::with_capacity(wanted);
        let mut attempts = 0;

        while accepted.len() < wanted && attempts < max_attempts {
            attempts += 1;

            // sqrt keeps the areal density uniform across the disk
            let theta = rng.gen_range(0.0..TAU);
            let rho = brush.radius * rng.gen_range(0.0f32..1.0).sqrt();
            let position = basis.disk_point(hit.point, rho, theta);

            // Linear scan, bounded per stroke by `wanted`
            let too_close = existing
                .iter()
                .map(|s| s.root_position)
                .chain(accepted.iter().map(|p| p.position))
                .any(|root| root.distance_squared(position) < min_spacing_sq);
            if too_close {
                continue;
            }

            let jitter = random_unit_vector(rng) * brush.randomness * rng.gen_range(0.0f32..1.0);
            let direction = (basis.normal + jitter).normalize_or(basis.normal);

            accepted.push(RootPlacement {
                position,
                direction,
                surface_normal: basis.normal,
            });
        }

        trace!(
            "sample_at_hit: accepted {}/{} roots in {} attempts",
            accepted.len(),
            wanted,
            attempts
        );
        accepted
    }
}

/// Uniformly distributed unit vector.
pub fn random_unit_vector<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    let z: f32 = rng.gen_range(-1.0..=1.0);
    let theta: f32 = rng.gen_range(0.0..TAU);
    let r = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(r * theta.cos(), r * theta.sin(), z)
}
