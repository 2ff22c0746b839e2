//! Serializable groom snapshots for undo/redo.
//!
//! A snapshot records, per strand, the root, the rest pose and the
//! position and velocity of every segment. Ideal chains and masses are
//! regenerated from the rest pose on restore, so they are not stored.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::factory::StrandFactory;
use crate::types::{RestPose, Strand, StrandId};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Errors raised while decoding or validating a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Malformed snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported snapshot version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("Strand {id:?} has {count} segments, at least 2 required")]
    TooFewSegments { id: StrandId, count: usize },

    #[error("Strand {id:?} contains non-finite values")]
    NonFinite { id: StrandId },

    #[error("Strand {id:?} stores {stored} segments but its rest pose describes {expected}")]
    SegmentMismatch {
        id: StrandId,
        stored: usize,
        expected: usize,
    },
}

/// Position and velocity of one segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentSnapshot {
    pub position: Vec3,
    pub velocity: Vec3,
}

/// Full state of one strand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrandSnapshot {
    pub id: StrandId,
    pub root_position: Vec3,
    pub root_normal: Vec3,
    pub rest_pose: RestPose,
    pub segments: Vec<SegmentSnapshot>,
}

impl StrandSnapshot {
    pub fn capture(strand: &Strand) -> Self {
        Self {
            id: strand.id,
            root_position: strand.root_position,
            root_normal: strand.root_normal,
            rest_pose: strand.rest_pose,
            segments: strand
                .segments
                .iter()
                .map(|s| SegmentSnapshot {
                    position: s.position,
                    velocity: s.velocity,
                })
                .collect(),
        }
    }

    /// Check the snapshot can be turned back into a strand.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let count = self.segments.len();
        if count < 2 {
            return Err(SnapshotError::TooFewSegments { id: self.id, count });
        }
        let expected = self.rest_pose.segment_count.max(2) as usize;
        if count != expected {
            return Err(SnapshotError::SegmentMismatch {
                id: self.id,
                stored: count,
                expected,
            });
        }

        let pose = &self.rest_pose;
        let finite = self.root_position.is_finite()
            && self.root_normal.is_finite()
            && pose.direction.is_finite()
            && pose.clump_direction.is_finite()
            && [pose.segment_length, pose.curl, pose.wave, pose.frizz, pose.clump]
                .iter()
                .all(|v| v.is_finite())
            && self
                .segments
                .iter()
                .all(|s| s.position.is_finite() && s.velocity.is_finite());
        if !finite {
            return Err(SnapshotError::NonFinite { id: self.id });
        }
        Ok(())
    }

    /// Rebuild the live strand.
    ///
    /// Segment 0 is pinned to the root regardless of the stored position.
    pub fn restore(&self) -> Result<Strand, SnapshotError> {
        self.validate()?;
        let mut strand =
            StrandFactory::from_pose(self.id, self.root_position, self.root_normal, self.rest_pose);
        for (i, (segment, saved)) in strand.segments.iter_mut().zip(&self.segments).enumerate() {
            if i == 0 {
                continue;
            }
            segment.position = saved.position;
            segment.previous_position = saved.position;
            segment.velocity = saved.velocity;
        }
        Ok(strand)
    }
}

/// State of a whole groom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroomSnapshot {
    pub version: u32,
    /// Id the next new strand receives
    pub next_strand_id: u64,
    pub strands: Vec<StrandSnapshot>,
}

impl GroomSnapshot {
    pub fn capture(strands: &[Strand], next_strand_id: u64) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            next_strand_id,
            strands: strands.iter().map(StrandSnapshot::capture).collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode and check the version.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_str(json)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        Ok(snapshot)
    }

    /// Rebuild every strand, failing on the first invalid one.
    pub fn restore_strands(&self) -> Result<Vec<Strand>, SnapshotError> {
        self.strands.iter().map(StrandSnapshot::restore).collect()
    }
}
