//! Batched-instance strategy.
//!
//! One fixed-capacity buffer of per-instance transforms sized to the
//! population cap. Strand `i` owns slot `i`; unused slots hold a zero
//! (degenerate) transform so the host draws nothing for them.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use groom_config::GroomSettings;
use tracing::{debug, warn};

use super::spline;
use super::{RenderConfig, RenderHandle, RenderHost, RenderStats};
use crate::sampler::tangent_basis;
use crate::types::Strand;

/// GPU layout of one strand instance.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct InstanceTransform {
    /// Column-major model matrix: unit strand along +Y into world space
    pub model: [[f32; 4]; 4],
    pub root_color: [f32; 4],
    pub tip_color: [f32; 4],
}

impl InstanceTransform {
    /// Zero-scale transform for unused slots.
    pub const DEGENERATE: Self = Self {
        model: [[0.0; 4]; 4],
        root_color: [0.0; 4],
        tip_color: [0.0; 4],
    };

    /// Transform mapping a unit strand onto `strand`'s fitted curve.
    ///
    /// +Y follows the root-to-tip chord and is scaled by the curve length.
    /// The root normal fixes the twist around it; X and Z are scaled by
    /// the strand thickness.
    pub fn for_strand(strand: &Strand, settings: &GroomSettings, config: &RenderConfig) -> Self {
        let points: Vec<Vec3> = strand.positions().collect();
        let curve = spline::fit(&points, config.samples_per_segment);
        let length = spline::arc_length(&curve);

        let root = strand.root_position;
        let axis = (strand.tip() - root).normalize_or(strand.root_normal);
        let reference = if axis.dot(strand.root_normal).abs() > 0.99 {
            tangent_basis(axis).tangent
        } else {
            strand.root_normal
        };
        let x_axis = reference.cross(axis).normalize_or(Vec3::X);
        let z_axis = x_axis.cross(axis);

        let model = Mat4::from_cols(
            (x_axis * settings.thickness).extend(0.0),
            (axis * length).extend(0.0),
            (z_axis * settings.thickness).extend(0.0),
            root.extend(1.0),
        );

        Self {
            model: model.to_cols_array_2d(),
            root_color: settings.root_color,
            tip_color: settings.tip_color,
        }
    }
}

/// Instance buffer owned by the batched strategy.
#[derive(Debug, Default)]
pub struct InstancedStrands {
    buffer: Option<RenderHandle>,
    capacity: usize,
    instances: Vec<InstanceTransform>,
}

impl InstancedStrands {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instance data from the last sync.
    pub fn instances(&self) -> &[InstanceTransform] {
        &self.instances
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn handle(&self) -> Option<RenderHandle> {
        self.buffer
    }

    /// Write every strand's transform and upload the whole buffer.
    ///
    /// The buffer is reallocated when the population cap changed. Strands
    /// beyond the capacity are not drawn.
    pub fn sync(
        &mut self,
        strands: &[Strand],
        settings: &GroomSettings,
        config: &RenderConfig,
        host: &mut dyn RenderHost,
        stats: &mut RenderStats,
    ) {
        let capacity = settings.max_strands as usize;
        if self.buffer.is_none() || self.capacity != capacity {
            self.release(host, stats);
            let handle = host.create_instance_buffer(capacity);
            host.attach(handle);
            self.buffer = Some(handle);
            self.capacity = capacity;
            stats.allocations += 1;
            debug!("instanced: allocated buffer {:?} for {} strands", handle, capacity);
        }

        if strands.len() > capacity {
            warn!(
                "instanced: {} strands exceed capacity {}, drawing the first {}",
                strands.len(),
                capacity,
                capacity
            );
        }

        self.instances.clear();
        self.instances.extend(
            strands
                .iter()
                .take(capacity)
                .map(|strand| InstanceTransform::for_strand(strand, settings, config)),
        );
        self.instances.resize(capacity, InstanceTransform::DEGENERATE);

        if let Some(handle) = self.buffer {
            host.write_instances(handle, &self.instances);
            stats.uploads += 1;
        }
    }

    /// Detach and release the buffer, if any.
    pub fn release(&mut self, host: &mut dyn RenderHost, stats: &mut RenderStats) {
        if let Some(handle) = self.buffer.take() {
            host.detach(handle);
            host.release(handle);
            stats.releases += 1;
            debug!("instanced: released buffer {:?}", handle);
        }
        self.capacity = 0;
        self.instances.clear();
    }
}
