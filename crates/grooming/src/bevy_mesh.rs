//! Bevy integration: merged strand geometry as a Bevy mesh asset.

use std::collections::HashMap;

use bevy::asset::RenderAssetUsages;
use bevy::mesh::{Indices, PrimitiveTopology};
use bevy::prelude::*;

use crate::render::{InstanceTransform, RenderHandle, RenderHost, StrandMesh};

impl StrandMesh {
    /// Convert to a Bevy triangle-list mesh with vertex colors.
    pub fn to_bevy_mesh(&self) -> Mesh {
        let mut mesh = Mesh::new(
            PrimitiveTopology::TriangleList,
            RenderAssetUsages::default(),
        );
        mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, self.positions.clone());
        mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, self.normals.clone());
        mesh.insert_attribute(Mesh::ATTRIBUTE_COLOR, self.colors.clone());
        mesh.insert_indices(Indices::U32(self.indices.clone()));
        mesh
    }
}

/// Render host backed by `Assets<Mesh>`.
///
/// Merged meshes become mesh assets; instance buffers are kept as plain
/// arrays for a custom instancing pipeline to read. Attachment is tracked
/// so the app can spawn or despawn the entity that shows each handle.
pub struct MeshAssetHost<'a> {
    pub meshes: &'a mut Assets<Mesh>,
    pub resources: &'a mut StrandRenderResources,
}

/// Render resources that outlive a single frame.
#[derive(Resource, Default)]
pub struct StrandRenderResources {
    next_handle: u64,
    pub meshes: HashMap<RenderHandle, Handle<Mesh>>,
    pub instance_buffers: HashMap<RenderHandle, Vec<InstanceTransform>>,
    /// Handles currently inserted in the scene
    pub attached: Vec<RenderHandle>,
}

impl StrandRenderResources {
    fn allocate(&mut self) -> RenderHandle {
        self.next_handle += 1;
        RenderHandle(self.next_handle)
    }
}

impl RenderHost for MeshAssetHost<'_> {
    fn create_instance_buffer(&mut self, capacity: usize) -> RenderHandle {
        let handle = self.resources.allocate();
        self.resources
            .instance_buffers
            .insert(handle, vec![InstanceTransform::DEGENERATE; capacity]);
        handle
    }

    fn write_instances(&mut self, handle: RenderHandle, instances: &[InstanceTransform]) {
        if let Some(buffer) = self.resources.instance_buffers.get_mut(&handle) {
            buffer.clear();
            buffer.extend_from_slice(instances);
        }
    }

    fn create_mesh(&mut self, mesh: &StrandMesh) -> RenderHandle {
        let handle = self.resources.allocate();
        let asset = self.meshes.add(mesh.to_bevy_mesh());
        self.resources.meshes.insert(handle, asset);
        handle
    }

    fn attach(&mut self, handle: RenderHandle) {
        if !self.resources.attached.contains(&handle) {
            self.resources.attached.push(handle);
        }
    }

    fn detach(&mut self, handle: RenderHandle) {
        self.resources.attached.retain(|h| *h != handle);
    }

    fn release(&mut self, handle: RenderHandle) {
        if let Some(asset) = self.resources.meshes.remove(&handle) {
            self.meshes.remove(asset.id());
        }
        self.resources.instance_buffers.remove(&handle);
    }
}
