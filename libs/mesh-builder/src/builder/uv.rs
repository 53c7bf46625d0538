//! Spherical projections.

use super::MeshBuilder;
use glam::Vec2;
use std::f32::consts::{PI, TAU};

/// `|y|` above this counts as a pole, where yaw is undefined.
const POLE_THRESHOLD: f32 = 1.0 - 1.0e-6;

impl MeshBuilder {
    /// Moves every vertex onto the unit sphere (see [`crate::Triangle::normalize`]).
    pub fn project_to_unit_sphere(&mut self) {
        for triangle in &mut self.triangles {
            triangle.normalize();
        }
    }

    /// Assigns equirectangular UVs from the direction of each position.
    ///
    /// `u = 0.5 + atan2(x, z) / 2PI`, `v = 0.5 - asin(y) / PI`. Triangles
    /// straddling the wraparound get `u - 1` on their high-`u` corners, and
    /// pole corners take the mean `u` of the other two corners.
    pub fn make_equirect_uvs(&mut self) {
        for triangle in &mut self.triangles {
            let mut uvs = [Vec2::ZERO; 3];
            let mut pole = [false; 3];
            for (i, uv) in uvs.iter_mut().enumerate() {
                let p = triangle.position(i).normalize_or_zero();
                pole[i] = p.y.abs() > POLE_THRESHOLD;
                *uv = Vec2::new(
                    0.5 + p.x.atan2(p.z) / TAU,
                    0.5 - p.y.clamp(-1.0, 1.0).asin() / PI,
                );
            }

            let regular = move || (0..3).filter(move |&i| !pole[i]);
            let straddles =
                regular().any(|i| uvs[i].x > 0.75) && regular().any(|i| uvs[i].x < 0.25);
            if straddles {
                for i in regular() {
                    if uvs[i].x > 0.5 {
                        uvs[i].x -= 1.0;
                    }
                }
            }

            let count = regular().count();
            if count > 0 && count < 3 {
                let mean = regular().map(|i| uvs[i].x).sum::<f32>() / count as f32;
                for i in 0..3 {
                    if pole[i] {
                        uvs[i].x = mean;
                    }
                }
            }

            for (i, uv) in uvs.into_iter().enumerate() {
                triangle.set_uv(i, uv);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Triangle;
    use approx::assert_relative_eq;
    use glam::Vec3;

    fn single(positions: [Vec3; 3]) -> MeshBuilder {
        let mut builder = MeshBuilder::new();
        builder.add_triangle(Triangle::from_positions(positions));
        builder
    }

    #[test]
    fn test_equator_front() {
        let mut builder = single([Vec3::Z, Vec3::new(0.1, 0.0, 1.0), Vec3::new(0.0, 0.1, 1.0)]);
        builder.make_equirect_uvs();
        let triangle = &builder.triangles()[0];
        assert_relative_eq!(triangle.uv(0), Vec2::new(0.5, 0.5));
        assert!(triangle.uv(1).x > 0.5);
        assert!(triangle.uv(2).y < 0.5);
    }

    #[test]
    fn test_seam_straddle_shifts_u() {
        // Behind the sphere, one corner on each side of the seam.
        let mut builder = single([
            Vec3::new(0.1, 0.0, -1.0),
            Vec3::new(-0.1, 0.0, -1.0),
            Vec3::new(0.0, 0.1, -1.0),
        ]);
        builder.make_equirect_uvs();
        let triangle = &builder.triangles()[0];
        let us: Vec<f32> = (0..3).map(|i| triangle.uv(i).x).collect();
        let max = us.iter().cloned().fold(f32::MIN, f32::max);
        let min = us.iter().cloned().fold(f32::MAX, f32::min);
        let spread = max - min;
        assert!(spread < 0.1, "u values {us:?} span the seam");
        assert!(us[0] < 0.0);
    }

    #[test]
    fn test_pole_takes_mean_u() {
        let mut builder = single([Vec3::Y, Vec3::new(0.0, 0.5, 1.0), Vec3::new(1.0, 0.5, 0.0)]);
        builder.make_equirect_uvs();
        let triangle = &builder.triangles()[0];
        let mean = (triangle.uv(1).x + triangle.uv(2).x) * 0.5;
        assert_relative_eq!(triangle.uv(0).x, mean);
        assert_relative_eq!(triangle.uv(0).y, 0.0);
    }

    #[test]
    fn test_projection() {
        let mut builder = single([Vec3::X * 3.0, Vec3::Y * 2.0, Vec3::Z * 5.0]);
        builder.project_to_unit_sphere();
        for i in 0..3 {
            assert_relative_eq!(builder.triangles()[0].position(i).length(), 1.0);
        }
    }
}
