//! Merged-geometry strategy.
//!
//! Every rebuild sweeps a tapered tube around each strand's fitted curve
//! and concatenates all tubes into one mesh. Cheap to draw, expensive to
//! rebuild, so it suits small populations.

use std::f32::consts::TAU;

use glam::{Quat, Vec3, Vec4};
use groom_config::GroomSettings;
use tracing::debug;

use super::spline;
use super::{RenderConfig, RenderHandle, RenderHost, RenderStats};
use crate::sampler::tangent_basis;
use crate::types::Strand;

/// Flat triangle-list geometry for all strands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrandMesh {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub colors: Vec<[f32; 4]>,
    pub indices: Vec<u32>,
}

impl StrandMesh {
    /// Build tube geometry for every strand.
    pub fn build(strands: &[Strand], settings: &GroomSettings, config: &RenderConfig) -> Self {
        let mut mesh = Self::default();
        for strand in strands {
            let points: Vec<Vec3> = strand.positions().collect();
            let curve = spline::fit(&points, config.samples_per_segment);
            mesh.push_tube(&curve, strand.root_normal, settings, config);
        }
        mesh
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Append one tube along `curve`.
    ///
    /// Ring frames are parallel-transported from the root so the tube does
    /// not twist where the curve bends. Radius tapers and color blends
    /// from root to tip.
    fn push_tube(
        &mut self,
        curve: &[Vec3],
        root_normal: Vec3,
        settings: &GroomSettings,
        config: &RenderConfig,
    ) {
        if curve.len() < 2 {
            return;
        }
        let sides = config.tube_sides.max(3);
        let base = self.positions.len() as u32;
        let last = curve.len() - 1;
        let root_color = Vec4::from_array(settings.root_color);
        let tip_color = Vec4::from_array(settings.tip_color);

        let mut tangent = (curve[1] - curve[0]).normalize_or(root_normal);
        let mut normal = {
            let projected = root_normal - tangent * root_normal.dot(tangent);
            projected
                .try_normalize()
                .unwrap_or_else(|| tangent_basis(tangent).tangent)
        };

        for (i, &center) in curve.iter().enumerate() {
            if i > 0 {
                let next = if i < last { curve[i + 1] } else { center };
                let new_tangent = (next - curve[i - 1]).normalize_or(tangent);
                // Rotate the frame by the minimal rotation between tangents
                normal = (Quat::from_rotation_arc(tangent, new_tangent) * normal).normalize_or(normal);
                tangent = new_tangent;
            }
            let binormal = tangent.cross(normal);

            let t = i as f32 / last as f32;
            let radius = settings.thickness * (1.0 + (config.tip_radius_scale - 1.0) * t);
            let color = root_color.lerp(tip_color, t).to_array();

            for s in 0..sides {
                let angle = TAU * s as f32 / sides as f32;
                let offset = normal * angle.cos() + binormal * angle.sin();
                self.positions.push((center + offset * radius).to_array());
                self.normals.push(offset.to_array());
                self.colors.push(color);
            }
        }

        let sides = sides as u32;
        for ring in 0..last as u32 {
            let a = base + ring * sides;
            let b = a + sides;
            for s in 0..sides {
                let s1 = (s + 1) % sides;
                self.indices
                    .extend_from_slice(&[a + s, b + s, a + s1, a + s1, b + s, b + s1]);
            }
        }
    }
}

/// Combined mesh owned by the merged strategy.
#[derive(Debug, Default)]
pub struct MergedStrands {
    handle: Option<RenderHandle>,
    mesh: StrandMesh,
}

impl MergedStrands {
    pub fn new() -> Self {
        Self::default()
    }

    /// Geometry from the last rebuild.
    pub fn mesh(&self) -> &StrandMesh {
        &self.mesh
    }

    pub fn handle(&self) -> Option<RenderHandle> {
        self.handle
    }

    /// Rebuild the combined mesh and swap it into the scene.
    ///
    /// The previous mesh is detached and released before the replacement
    /// is allocated. An empty population leaves nothing attached.
    pub fn sync(
        &mut self,
        strands: &[Strand],
        settings: &GroomSettings,
        config: &RenderConfig,
        host: &mut dyn RenderHost,
        stats: &mut RenderStats,
    ) {
        self.release(host, stats);
        self.mesh = StrandMesh::build(strands, settings, config);
        stats.rebuilds += 1;

        if self.mesh.is_empty() {
            return;
        }
        let handle = host.create_mesh(&self.mesh);
        host.attach(handle);
        self.handle = Some(handle);
        stats.allocations += 1;
        stats.uploads += 1;
        debug!(
            "merged: rebuilt mesh {:?} with {} vertices, {} triangles",
            handle,
            self.mesh.vertex_count(),
            self.mesh.triangle_count()
        );
    }

    /// Detach and release the mesh, if any.
    pub fn release(&mut self, host: &mut dyn RenderHost, stats: &mut RenderStats) {
        if let Some(handle) = self.handle.take() {
            host.detach(handle);
            host.release(handle);
            stats.releases += 1;
        }
    }
}
