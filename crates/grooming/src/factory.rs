//! Strand factory: initial mass-point chains and rest poses.
//!
//! A chain starts at the root and repeatedly steps along the normalized
//! sum of the growth direction, a curl spiral, a sine wave and a
//! tip-weighted frizz jitter. Step length shrinks slightly toward the tip.

use std::f32::consts::TAU;

use glam::Vec3;
use groom_config::GroomSettings;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::sampler::{random_unit_vector, tangent_basis, RootPlacement};
use crate::types::{segment_mass, RestPose, Segment, Strand, StrandId};

/// Weight of the curl spiral relative to the growth direction.
const SPIRAL_WEIGHT: f32 = 0.35;

/// Full sine periods of the wave term along a strand.
const WAVE_PERIODS: f32 = 2.0;

/// Weight of the wave term relative to the growth direction.
const WAVE_WEIGHT: f32 = 0.4;

/// Fraction the step length loses between root and tip.
const STEP_TAPER: f32 = 0.1;

/// Build the ideal chain described by a rest pose, relative to the root.
///
/// Deterministic: the same pose always yields the same chain.
pub fn ideal_chain(pose: &RestPose) -> Vec<Vec3> {
    let count = pose.segment_count.max(2) as usize;
    let direction = pose.direction.normalize_or(Vec3::Y);
    let clump_direction = pose.clump_direction.normalize_or(direction);
    let basis = tangent_basis(direction);
    let mut rng = StdRng::seed_from_u64(pose.seed);

    let mut chain = Vec::with_capacity(count);
    let mut position = Vec3::ZERO;
    chain.push(position);

    for i in 1..count {
        let fraction = i as f32 / (count - 1) as f32;

        let angle = pose.curl * fraction * TAU;
        let spiral =
            (basis.tangent * angle.cos() + basis.bitangent * angle.sin()) * pose.curl * SPIRAL_WEIGHT;
        let wave = basis.bitangent * (fraction * WAVE_PERIODS * TAU).sin() * pose.wave * WAVE_WEIGHT;
        // Always draw so the sequence does not depend on the frizz amount
        let frizz = random_unit_vector(&mut rng) * pose.frizz * fraction;
        let clump = (clump_direction - direction) * pose.clump * fraction;

        let step_direction = (direction + spiral + wave + frizz + clump).normalize_or(direction);
        let step_length = pose.segment_length * (1.0 - STEP_TAPER * fraction);

        position += step_direction * step_length;
        chain.push(position);
    }

    chain
}

/// Creates strands and assigns their ids.
#[derive(Debug, Default)]
pub struct StrandFactory {
    next_id: u64,
}

impl StrandFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id the next strand will receive.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Continue numbering after restored strands.
    pub fn set_next_id(&mut self, next_id: u64) {
        self.next_id = next_id;
    }

    /// Rest pose for a new strand under the current settings.
    ///
    /// The frizz seed is drawn from `rng`.
    pub fn rest_pose<R: Rng + ?Sized>(
        placement: &RootPlacement,
        settings: &GroomSettings,
        rng: &mut R,
    ) -> RestPose {
        RestPose {
            direction: placement.direction,
            clump_direction: placement.surface_normal,
            segment_count: settings.segment_count.max(2),
            segment_length: settings.segment_length,
            curl: settings.curl,
            wave: settings.wave,
            frizz: settings.frizz,
            clump: settings.clump_size,
            seed: rng.r#gen(),
        }
    }

    /// Grow a new strand at a sampled root.
    pub fn build<R: Rng + ?Sized>(
        &mut self,
        placement: &RootPlacement,
        settings: &GroomSettings,
        rng: &mut R,
    ) -> Strand {
        let pose = Self::rest_pose(placement, settings, rng);
        let id = StrandId(self.next_id);
        self.next_id += 1;

        let strand = Self::from_pose(id, placement.position, placement.direction, pose);
        trace!(
            "build: strand {:?} with {} segments at {:?}",
            id,
            strand.segment_count(),
            placement.position
        );
        strand
    }

    /// Assemble a strand at rest on its ideal chain.
    pub fn from_pose(id: StrandId, root: Vec3, root_normal: Vec3, pose: RestPose) -> Strand {
        let chain = ideal_chain(&pose);
        let count = chain.len();
        let segments = chain
            .iter()
            .enumerate()
            .map(|(i, &offset)| Segment::new(root + offset, segment_mass(i, count), i == 0))
            .collect();

        Strand::from_parts(
            id,
            root,
            root_normal.normalize_or(Vec3::Y),
            pose,
            chain,
            segments,
        )
    }
}
