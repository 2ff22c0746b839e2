//! CPU ray casting against triangle surfaces.
//!
//! Hosts with their own picking can implement [`SurfaceRaycast`] directly;
//! this module covers headless use and tests with a triangle soup and a
//! simple perspective camera.

use std::f32::consts::{PI, TAU};

use glam::{Vec2, Vec3};

use crate::sampler::{Ray, SurfaceHit, SurfaceRaycast, Viewpoint};
use crate::solver::AnchorBody;

/// Epsilon for floating point comparisons in ray intersection
const EPSILON: f32 = 1e-6;

/// Result of a ray-triangle intersection test
#[derive(Debug, Clone, Copy)]
pub struct TriangleHit {
    /// Distance along the ray to the intersection point
    pub t: f32,
    /// Barycentric coordinate u (weight for vertex 1)
    pub u: f32,
    /// Barycentric coordinate v (weight for vertex 2)
    pub v: f32,
}

/// Moller-Trumbore ray-triangle intersection.
///
/// Returns `None` for parallel rays, misses and hits behind the origin.
pub fn ray_triangle_intersection(ray: &Ray, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<TriangleHit> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let pvec = ray.direction.cross(edge2);
    let det = edge1.dot(pvec);

    // Ray lies in the triangle plane
    if det.abs() < EPSILON {
        return None;
    }

    let inv_det = 1.0 / det;
    let tvec = ray.origin - v0;

    let u = tvec.dot(pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let qvec = tvec.cross(edge1);
    let v = ray.direction.dot(qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = edge2.dot(qvec) * inv_det;
    if t < EPSILON {
        return None;
    }

    Some(TriangleHit { t, u, v })
}

/// A triangle soup with per-vertex normals.
#[derive(Debug, Clone, Default)]
pub struct TriangleSurface {
    pub positions: Vec<Vec3>,
    /// Same length as `positions`
    pub normals: Vec<Vec3>,
    /// Three indices per triangle
    pub indices: Vec<u32>,
    /// Identifier reported in hits
    pub object: u32,
}

impl TriangleSurface {
    /// Axis-aligned square in the XZ plane at height `y`, facing +Y.
    pub fn plane(y: f32, half_extent: f32) -> Self {
        let h = half_extent;
        Self {
            positions: vec![
                Vec3::new(-h, y, -h),
                Vec3::new(h, y, -h),
                Vec3::new(h, y, h),
                Vec3::new(-h, y, h),
            ],
            normals: vec![Vec3::Y; 4],
            indices: vec![0, 2, 1, 0, 3, 2],
            object: 0,
        }
    }

    /// UV sphere with smooth normals.
    pub fn uv_sphere(center: Vec3, radius: f32, rings: u32, sectors: u32) -> Self {
        let rings = rings.max(2);
        let sectors = sectors.max(3);
        let mut positions = Vec::with_capacity(((rings + 1) * (sectors + 1)) as usize);
        let mut normals = Vec::with_capacity(positions.capacity());

        for r in 0..=rings {
            let phi = PI * r as f32 / rings as f32;
            for s in 0..=sectors {
                let theta = TAU * s as f32 / sectors as f32;
                let normal = Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
                positions.push(center + normal * radius);
                normals.push(normal);
            }
        }

        let stride = sectors + 1;
        let mut indices = Vec::with_capacity((rings * sectors * 6) as usize);
        for r in 0..rings {
            for s in 0..sectors {
                let a = r * stride + s;
                let b = a + stride;
                indices.extend_from_slice(&[a, a + 1, b, a + 1, b + 1, b]);
            }
        }

        Self {
            positions,
            normals,
            indices,
            object: 0,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    fn triangle(&self, tri: usize) -> (usize, usize, usize) {
        let base = tri * 3;
        (
            self.indices[base] as usize,
            self.indices[base + 1] as usize,
            self.indices[base + 2] as usize,
        )
    }
}

impl SurfaceRaycast for TriangleSurface {
    fn cast(&self, ray: &Ray) -> Option<SurfaceHit> {
        let mut closest: Option<(TriangleHit, usize)> = None;

        // Brute force, fine for brush-rate queries on modest meshes
        for tri in 0..self.triangle_count() {
            let (i0, i1, i2) = self.triangle(tri);
            let (Some(&v0), Some(&v1), Some(&v2)) = (
                self.positions.get(i0),
                self.positions.get(i1),
                self.positions.get(i2),
            ) else {
                continue;
            };

            if let Some(hit) = ray_triangle_intersection(ray, v0, v1, v2) {
                if closest.as_ref().is_none_or(|(best, _)| hit.t < best.t) {
                    closest = Some((hit, tri));
                }
            }
        }

        let (hit, tri) = closest?;
        let (i0, i1, i2) = self.triangle(tri);
        let w = 1.0 - hit.u - hit.v;

        let face_normal = {
            let (v0, v1, v2) = (self.positions[i0], self.positions[i1], self.positions[i2]);
            (v1 - v0).cross(v2 - v0).normalize_or(Vec3::Y)
        };
        let normal = match (self.normals.get(i0), self.normals.get(i1), self.normals.get(i2)) {
            (Some(&n0), Some(&n1), Some(&n2)) => {
                (n0 * w + n1 * hit.u + n2 * hit.v).normalize_or(face_normal)
            }
            _ => face_normal,
        };

        Some(SurfaceHit {
            point: ray.at(hit.t),
            normal,
            object: self.object,
        })
    }

    fn anchor_body(&self) -> Option<AnchorBody> {
        AnchorBody::enclosing(&self.positions)
    }
}

/// A perspective camera looking at a target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveViewpoint {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians
    pub fov_y: f32,
    /// Width over height
    pub aspect: f32,
}

impl PerspectiveViewpoint {
    pub fn looking_at(position: Vec3, target: Vec3) -> Self {
        Self {
            position,
            target,
            up: Vec3::Y,
            fov_y: PI / 4.0,
            aspect: 16.0 / 9.0,
        }
    }
}

impl Viewpoint for PerspectiveViewpoint {
    fn ray_through(&self, ndc: Vec2) -> Ray {
        let forward = (self.target - self.position).normalize_or(Vec3::NEG_Z);
        let up_hint = if forward.dot(self.up).abs() > 0.999 {
            Vec3::Z
        } else {
            self.up
        };
        let right = forward.cross(up_hint).normalize();
        let up = right.cross(forward);

        let half_height = (self.fov_y * 0.5).tan();
        let half_width = half_height * self.aspect;
        let direction = forward + right * (ndc.x * half_width) + up * (ndc.y * half_height);

        Ray::new(self.position, direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_triangle_hit() {
        let ray = Ray::new(Vec3::new(0.25, 0.25, 1.0), Vec3::NEG_Z);
        let hit = ray_triangle_intersection(&ray, Vec3::ZERO, Vec3::X, Vec3::Y).unwrap();
        assert!((hit.t - 1.0).abs() < EPSILON);
        assert!((hit.u - 0.25).abs() < EPSILON);
        assert!((hit.v - 0.25).abs() < EPSILON);
    }

    #[test]
    fn test_ray_triangle_miss_and_behind() {
        let miss = Ray::new(Vec3::new(2.0, 2.0, 1.0), Vec3::NEG_Z);
        assert!(ray_triangle_intersection(&miss, Vec3::ZERO, Vec3::X, Vec3::Y).is_none());

        let behind = Ray::new(Vec3::new(0.25, 0.25, 1.0), Vec3::Z);
        assert!(ray_triangle_intersection(&behind, Vec3::ZERO, Vec3::X, Vec3::Y).is_none());
    }

    #[test]
    fn test_plane_cast() {
        let surface = TriangleSurface::plane(1.0, 2.0);
        let hit = surface
            .cast(&Ray::new(Vec3::new(0.3, 5.0, -0.2), Vec3::NEG_Y))
            .unwrap();
        assert!((hit.point - Vec3::new(0.3, 1.0, -0.2)).length() < 1e-5);
        assert!((hit.normal - Vec3::Y).length() < 1e-5);

        assert!(surface
            .cast(&Ray::new(Vec3::new(5.0, 5.0, 0.0), Vec3::NEG_Y))
            .is_none());
    }

    #[test]
    fn test_sphere_cast_hits_near_side() {
        let surface = TriangleSurface::uv_sphere(Vec3::ZERO, 1.0, 24, 32);
        let hit = surface
            .cast(&Ray::new(Vec3::new(0.0, 5.0, 0.01), Vec3::NEG_Y))
            .unwrap();
        assert!(hit.point.y > 0.95);
        assert!(hit.normal.y > 0.95);
    }

    #[test]
    fn test_anchor_body_follows_surface_scale() {
        let sphere = TriangleSurface::uv_sphere(Vec3::new(0.0, 2.0, 0.0), 3.0, 12, 16);
        let body = sphere.anchor_body().unwrap();
        assert!((body.center - Vec3::new(0.0, 2.0, 0.0)).length() < 1e-4);
        assert!((body.radius - 3.0).abs() < 1e-4);

        let plane = TriangleSurface::plane(1.0, 2.0);
        let body = plane.anchor_body().unwrap();
        assert_eq!(body.center, Vec3::new(0.0, 1.0, 0.0));
        assert!((body.radius - 2.0 * 2.0f32.sqrt()).abs() < 1e-5);

        assert!(TriangleSurface::default().anchor_body().is_none());
    }

    #[test]
    fn test_viewpoint_center_ray() {
        let view = PerspectiveViewpoint::looking_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO);
        let ray = view.ray_through(Vec2::ZERO);
        assert!((ray.direction - Vec3::NEG_Z).length() < 1e-5);

        let right = view.ray_through(Vec2::new(1.0, 0.0));
        assert!(right.direction.x > 0.0);
        let up = view.ray_through(Vec2::new(0.0, 1.0));
        assert!(up.direction.y > 0.0);
    }
}
