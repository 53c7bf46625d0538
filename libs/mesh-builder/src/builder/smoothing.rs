//! Angle-based normal smoothing.

use super::MeshBuilder;
use crate::triangle::{self, TriangleId};
use config::constants::NORMALIZE_EPSILON;
use glam::{Vec3, Vec4Swizzles};

/// Slack on the cosine threshold so coplanar faces always group.
const COSINE_SLACK: f32 = 1.0e-6;

impl MeshBuilder {
    /// Fills missing vertex normals by averaging faces around each vertex.
    ///
    /// The faces around a vertex are split into groups: a face joins every
    /// group holding a face within `max_angle` of it, merging those groups.
    /// Each group's corners then get the area-weighted mean of the group's
    /// face normals.
    ///
    /// ## Parameters
    ///
    /// - `max_angle`: crease angle in radians; `0` keeps faces hard, `PI`
    ///   averages everything
    /// - `reset_normals`: clear all normals first so every vertex is smoothed
    /// - `merge_tangents`: also average tangents inside each group, keeping
    ///   each corner's handedness
    pub fn add_smooth_normals(
        &mut self,
        max_angle: f32,
        reset_normals: bool,
        merge_tangents: bool,
    ) {
        if reset_normals {
            for triangle in &mut self.triangles {
                for i in 0..3 {
                    triangle.set_normal(i, Vec3::ZERO);
                }
            }
        }

        let hard: Vec<Vec3> = self.triangles.iter().map(|t| t.face_normal()).collect();
        let areas: Vec<f32> = self.triangles.iter().map(|t| t.area()).collect();
        let threshold = max_angle.cos() - COSINE_SLACK;

        for index in 0..self.triangles.len() {
            for vertex in 0..3u8 {
                let normal = self.triangles[index].normal(vertex as usize);
                if normal.length_squared() > NORMALIZE_EPSILON {
                    continue;
                }
                let star = triangle::vertex_star(&self.triangles, TriangleId(index as u32), vertex);
                for group in group_by_angle(&star, &hard, threshold) {
                    self.apply_group(&group, &hard, &areas, merge_tangents);
                }
            }
        }
    }

    fn apply_group(
        &mut self,
        group: &[(TriangleId, u8)],
        hard: &[Vec3],
        areas: &[f32],
        merge_tangents: bool,
    ) {
        let weighted: Vec3 = group
            .iter()
            .map(|(id, _)| hard[id.index()] * areas[id.index()])
            .sum();
        let normal = match weighted.try_normalize() {
            Some(normal) => normal,
            None => hard[group[0].0.index()],
        };

        let tangent = merge_tangents.then(|| {
            group
                .iter()
                .map(|&(id, v)| self.triangles[id.index()].tangent(v as usize).xyz())
                .sum::<Vec3>()
                .normalize_or_zero()
        });

        for &(id, v) in group {
            let triangle = &mut self.triangles[id.index()];
            let corner = v as usize;
            if triangle.normal(corner).length_squared() > NORMALIZE_EPSILON {
                continue;
            }
            triangle.set_normal(corner, normal);
            if let Some(direction) = tangent {
                let w = if triangle.tangent(corner).w < 0.0 { -1.0 } else { 1.0 };
                triangle.set_tangent(corner, direction.extend(w));
            }
        }
    }
}

/// Greedy partition of a vertex star by face-normal angle.
fn group_by_angle(
    star: &[(TriangleId, u8)],
    hard: &[Vec3],
    threshold: f32,
) -> Vec<Vec<(TriangleId, u8)>> {
    let mut groups: Vec<Vec<(TriangleId, u8)>> = Vec::new();
    for &corner in star {
        let normal = hard[corner.0.index()];
        let joins: Vec<usize> = groups
            .iter()
            .enumerate()
            .filter(|(_, group)| {
                group
                    .iter()
                    .any(|(id, _)| normal.dot(hard[id.index()]) >= threshold)
            })
            .map(|(g, _)| g)
            .collect();

        match joins.split_first() {
            None => groups.push(vec![corner]),
            Some((&first, rest)) => {
                // Later indices first so removals keep earlier ones valid.
                for &g in rest.iter().rev() {
                    let merged = groups.remove(g);
                    groups[first].extend(merged);
                }
                groups[first].push(corner);
            }
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::QuadCorners;
    use approx::assert_relative_eq;
    use glam::Vec2;
    use std::f32::consts::PI;

    /// Closed unit cube from six 1-cell patches, outward normals.
    fn cube() -> MeshBuilder {
        let p = |x: f32, y: f32, z: f32| Vec3::new(x, y, z);
        let faces = [
            [p(0., 0., 1.), p(1., 0., 1.), p(1., 1., 1.), p(0., 1., 1.)],
            [p(1., 0., 0.), p(0., 0., 0.), p(0., 1., 0.), p(1., 1., 0.)],
            [p(1., 0., 1.), p(1., 0., 0.), p(1., 1., 0.), p(1., 1., 1.)],
            [p(0., 0., 0.), p(0., 0., 1.), p(0., 1., 1.), p(0., 1., 0.)],
            [p(0., 1., 1.), p(1., 1., 1.), p(1., 1., 0.), p(0., 1., 0.)],
            [p(0., 0., 0.), p(1., 0., 0.), p(1., 0., 1.), p(0., 0., 1.)],
        ];
        let mut builder = MeshBuilder::new();
        for corners in faces {
            builder.add_subdiv_quad(&QuadCorners::new(corners), 1, None);
        }
        builder.auto_connect_all();
        builder
    }

    #[test]
    fn test_cube_is_closed() {
        let builder = cube();
        assert_eq!(builder.triangle_count(), 12);
        assert!(builder.triangles().iter().all(|t| t.is_closed()));
        for triangle in builder.triangles() {
            let center = (triangle.position(0) + triangle.position(1) + triangle.position(2)) / 3.0;
            assert!(triangle.face_normal().dot(center - Vec3::splat(0.5)) > 0.0);
        }
    }

    #[test]
    fn test_zero_angle_keeps_hard_normals() {
        let mut builder = cube();
        builder.add_smooth_normals(0.0, true, false);
        for triangle in builder.triangles() {
            let hard = triangle.face_normal();
            for i in 0..3 {
                assert_relative_eq!(triangle.normal(i), hard, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_full_angle_averages_corners() {
        let mut builder = cube();
        builder.add_smooth_normals(PI, true, false);
        for triangle in builder.triangles() {
            for i in 0..3 {
                let normal = triangle.normal(i);
                assert_relative_eq!(normal.length(), 1.0, epsilon = 1e-5);
                // Points away from the cube center, off every face axis.
                let outward = (triangle.position(i) - Vec3::splat(0.5)).normalize();
                assert!(normal.dot(outward) > 0.5);
                assert!(normal.x.abs() < 0.99 && normal.y.abs() < 0.99 && normal.z.abs() < 0.99);
            }
        }
        // Every corner sharing a position shares the normal.
        let reference = builder.triangles()[0].position(0);
        let normals: Vec<Vec3> = builder
            .triangles()
            .iter()
            .flat_map(|t| (0..3).map(move |i| (t.position(i), t.normal(i))))
            .filter(|(p, _)| *p == reference)
            .map(|(_, n)| n)
            .collect();
        assert!(normals.len() >= 3);
        for n in &normals {
            assert_relative_eq!(*n, normals[0], epsilon = 1e-6);
        }
    }

    #[test]
    fn test_existing_normals_are_kept() {
        let mut builder = cube();
        builder.add_smooth_normals(PI, false, false);
        for triangle in builder.triangles() {
            for i in 0..3 {
                assert_relative_eq!(triangle.normal(i), triangle.face_normal(), epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_merge_tangents_keeps_handedness() {
        let mut builder = MeshBuilder::new();
        let corners = QuadCorners {
            positions: [Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y],
            uvs: [Vec2::new(1.0, 0.0), Vec2::ZERO, Vec2::new(0.0, 1.0), Vec2::ONE],
        };
        builder.add_subdiv_quad(&corners, 2, None);
        builder.add_smooth_normals(PI, true, true);
        for triangle in builder.triangles() {
            for i in 0..3 {
                let tangent = triangle.tangent(i);
                // Mirrored U flips handedness.
                assert_eq!(tangent.w, -1.0);
                assert_relative_eq!(tangent.xyz(), -Vec3::X, epsilon = 1e-6);
                assert_relative_eq!(triangle.normal(i), Vec3::Z, epsilon = 1e-6);
            }
        }
    }
}
