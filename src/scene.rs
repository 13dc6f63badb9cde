use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::geometry::MeshData;

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Identifies uploaded vertex/index data inside a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryId(u64);

/// Identifies a material (and its pipeline) inside a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(u64);

#[derive(Debug)]
pub struct Geometry {
    id: GeometryId,
    data: MeshData,
}

impl Geometry {
    pub fn new(data: MeshData) -> Arc<Self> {
        Arc::new(Self {
            id: GeometryId(next_id()),
            data,
        })
    }

    pub fn id(&self) -> GeometryId {
        self.id
    }

    pub fn data(&self) -> &MeshData {
        &self.data
    }
}

/// Shading models understood by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaterialKind {
    /// Colours each fragment by its view-space normal; needs no lights.
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Material {
    id: MaterialId,
    pub kind: MaterialKind,
}

impl Material {
    pub fn normal() -> Self {
        Self {
            id: MaterialId(next_id()),
            kind: MaterialKind::Normal,
        }
    }

    pub fn id(&self) -> MaterialId {
        self.id
    }
}

#[derive(Debug, Clone)]
pub struct Mesh {
    pub geometry: Arc<Geometry>,
    pub material: Material,
    pub position: Vec3,
    /// Euler angles in radians, applied in X, Y, Z order.
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Mesh {
    pub fn new(geometry: Arc<Geometry>, material: Material) -> Self {
        Self {
            geometry,
            material,
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }

    pub fn model_matrix(&self) -> Mat4 {
        let translation = Mat4::from_translation(self.position);
        let rotation = Mat4::from_rotation_x(self.rotation.x)
            * Mat4::from_rotation_y(self.rotation.y)
            * Mat4::from_rotation_z(self.rotation.z);
        let scale = Mat4::from_scale(self.scale);
        translation * rotation * scale
    }
}

/// Index of a mesh inside a [`SceneGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshIndex(usize);

/// Flat list of meshes drawn by a renderer.
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    meshes: Vec<Mesh>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, mesh: Mesh) -> MeshIndex {
        self.meshes.push(mesh);
        MeshIndex(self.meshes.len() - 1)
    }

    pub fn get(&self, index: MeshIndex) -> Option<&Mesh> {
        self.meshes.get(index.0)
    }

    pub fn get_mut(&mut self, index: MeshIndex) -> Option<&mut Mesh> {
        self.meshes.get_mut(index.0)
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resources_receive_distinct_ids() {
        let a = Geometry::new(MeshData::default());
        let b = Geometry::new(MeshData::default());
        assert_ne!(a.id(), b.id());
        assert_ne!(Material::normal().id(), Material::normal().id());
    }

    #[test]
    fn model_matrix_applies_rotation_before_translation() {
        let mut mesh = Mesh::new(Geometry::new(MeshData::default()), Material::normal());
        mesh.position = Vec3::new(0.0, 0.0, -5.0);
        mesh.rotation = Vec3::new(0.0, std::f32::consts::FRAC_PI_2, 0.0);
        let moved = mesh.model_matrix().transform_point3(Vec3::X);
        assert!(moved.abs_diff_eq(Vec3::new(0.0, 0.0, -6.0), 1e-5));
    }

    #[test]
    fn graph_hands_out_indices_in_insertion_order() {
        let mut graph = SceneGraph::new();
        assert!(graph.is_empty());
        let geometry = Geometry::new(MeshData::default());
        let first = graph.add(Mesh::new(geometry.clone(), Material::normal()));
        let second = graph.add(Mesh::new(geometry, Material::normal()));
        assert_ne!(first, second);
        graph.get_mut(second).unwrap().rotation.x = 1.0;
        assert_eq!(graph.meshes()[1].rotation.x, 1.0);
        assert_eq!(graph.get(first).unwrap().rotation.x, 0.0);
    }
}
