//! Core strand types.
//!
//! A strand is an ordered chain of mass points anchored at a fixed root.
//! Segment 0 is the root and is always locked.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Unique strand identifier within a groom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StrandId(pub u64);

/// One mass point of a strand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub position: Vec3,
    /// Position at the start of the current solver step
    pub previous_position: Vec3,
    pub velocity: Vec3,
    /// Sum of forces gathered during the current solver step
    pub accumulated_force: Vec3,
    /// Tapers from 1.0 at the root to 0.5 at the tip
    pub mass: f32,
    /// Only the root segment is locked
    pub locked: bool,
}

impl Segment {
    /// Create a segment at rest.
    pub fn new(position: Vec3, mass: f32, locked: bool) -> Self {
        Self {
            position,
            previous_position: position,
            velocity: Vec3::ZERO,
            accumulated_force: Vec3::ZERO,
            mass,
            locked,
        }
    }
}

/// Mass of the segment at `index` in a chain of `count` points.
pub fn segment_mass(index: usize, count: usize) -> f32 {
    if count < 2 {
        return 1.0;
    }
    1.0 - 0.5 * (index as f32 / (count - 1) as f32)
}

/// Parameters that regenerate a strand's ideal chain.
///
/// The ideal chain is fully determined by these values: frizz draws come
/// from a generator seeded with `seed`, so shape memory always pulls
/// toward the same curve the strand was grown with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RestPose {
    /// Growth direction at the root (perturbed surface normal)
    pub direction: Vec3,
    /// Direction tips are pulled toward when clumping
    pub clump_direction: Vec3,
    pub segment_count: u32,
    pub segment_length: f32,
    pub curl: f32,
    pub wave: f32,
    pub frizz: f32,
    pub clump: f32,
    pub seed: u64,
}

/// A simulated strand.
#[derive(Debug, Clone, PartialEq)]
pub struct Strand {
    pub id: StrandId,
    /// Fixed anchor; segment 0 always sits here
    pub root_position: Vec3,
    /// Initial growth direction
    pub root_normal: Vec3,
    pub segments: Vec<Segment>,
    pub rest_pose: RestPose,
    /// Ideal chain relative to the root (index 0 is zero)
    rest_chain: Vec<Vec3>,
}

impl Strand {
    /// Assemble a strand from its parts.
    ///
    /// `rest_chain` must have the same length as `segments`.
    pub(crate) fn from_parts(
        id: StrandId,
        root_position: Vec3,
        root_normal: Vec3,
        rest_pose: RestPose,
        rest_chain: Vec<Vec3>,
        segments: Vec<Segment>,
    ) -> Self {
        debug_assert_eq!(rest_chain.len(), segments.len());
        Self {
            id,
            root_position,
            root_normal,
            segments,
            rest_pose,
            rest_chain,
        }
    }

    /// Number of mass points, root included.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Ideal chain relative to the root.
    pub fn rest_chain(&self) -> &[Vec3] {
        &self.rest_chain
    }

    /// Rest offset from point `index - 1` to point `index`.
    pub fn rest_offset(&self, index: usize) -> Vec3 {
        if index == 0 || index >= self.rest_chain.len() {
            return Vec3::ZERO;
        }
        self.rest_chain[index] - self.rest_chain[index - 1]
    }

    /// Rest distance between points `index` and `index + 1`.
    pub fn rest_length(&self, index: usize) -> f32 {
        self.rest_offset(index + 1).length()
    }

    /// World-space ideal position of point `index`.
    pub fn ideal_position(&self, index: usize) -> Vec3 {
        self.root_position + self.rest_chain.get(index).copied().unwrap_or(Vec3::ZERO)
    }

    /// Place every segment on the ideal chain, at rest.
    pub fn reset_to_rest(&mut self) {
        for i in 0..self.segments.len() {
            let ideal = self.ideal_position(i);
            let segment = &mut self.segments[i];
            segment.position = ideal;
            segment.previous_position = ideal;
            segment.velocity = Vec3::ZERO;
            segment.accumulated_force = Vec3::ZERO;
        }
    }

    /// Current positions, root to tip.
    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.segments.iter().map(|s| s.position)
    }

    /// Current tip position.
    pub fn tip(&self) -> Vec3 {
        self.segments
            .last()
            .map(|s| s.position)
            .unwrap_or(self.root_position)
    }
}
