//! # Built-in BSP Kernel
//!
//! [`GeometryKernel`] over [`Solid`]s kept in a handle table.

use csg_tree::{BooleanOp, Extrusion, Revolution};
use glam::{DAffine3, DVec3};
use hashbrown::HashMap;

use crate::error::{KernelError, KernelResult};
use crate::extrude::{extrude_faces, revolve_faces};
use crate::kernel::{CylinderParams, GeometryKernel, Measurements, SolidId};
use crate::mesh_gl::MeshGl;
use crate::primitives::{cube_faces, cylinder_faces, sphere_faces, tetrahedron_faces};
use crate::solid::Solid;

/// Geometry kernel backed by BSP-tree booleans.
#[derive(Debug, Default)]
pub struct BspKernel {
    solids: HashMap<SolidId, Solid>,
    next_handle: u32,
    /// Next unreserved original ID.
    next_original: u32,
}

impl BspKernel {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, solid: Solid) -> SolidId {
        let id = SolidId(self.next_handle);
        self.next_handle += 1;
        self.solids.insert(id, solid);
        id
    }

    fn get(&self, id: SolidId) -> KernelResult<&Solid> {
        self.solids.get(&id).ok_or(KernelError::InvalidHandle(id))
    }

    fn insert_faces(&mut self, faces: Vec<Vec<DVec3>>) -> SolidId {
        let origin = self.reserve_ids(1);
        self.insert(Solid::from_faces(faces, origin))
    }
}

impl GeometryKernel for BspKernel {
    fn reserve_ids(&mut self, count: u32) -> u32 {
        let first = self.next_original;
        self.next_original += count;
        first
    }

    fn import(&mut self, mesh: &MeshGl, normal_offset: Option<usize>) -> KernelResult<SolidId> {
        let fallback = if mesh.num_runs() == 0 {
            self.reserve_ids(1)
        } else {
            0
        };
        let solid = Solid::from_mesh_gl(mesh, fallback, normal_offset)?;
        Ok(self.insert(solid))
    }

    fn cube(&mut self, size: DVec3, center: bool) -> KernelResult<SolidId> {
        if size.min_element() <= 0.0 {
            return Err(KernelError::invalid_parameter(format!(
                "cube size must be positive: {size}"
            )));
        }
        Ok(self.insert_faces(cube_faces(size, center)))
    }

    fn cylinder(&mut self, params: CylinderParams) -> KernelResult<SolidId> {
        let faces = cylinder_faces(params)?;
        Ok(self.insert_faces(faces))
    }

    fn sphere(&mut self, radius: f64, segments: u32) -> KernelResult<SolidId> {
        let faces = sphere_faces(radius, segments)?;
        Ok(self.insert_faces(faces))
    }

    fn tetrahedron(&mut self) -> KernelResult<SolidId> {
        Ok(self.insert_faces(tetrahedron_faces()))
    }

    fn boolean(&mut self, op: BooleanOp, a: SolidId, b: SolidId) -> KernelResult<SolidId> {
        let result = Solid::boolean(op, self.get(a)?, self.get(b)?);
        Ok(self.insert(result))
    }

    fn batch_boolean(&mut self, op: BooleanOp, operands: &[SolidId]) -> KernelResult<SolidId> {
        let (first, rest) = operands
            .split_first()
            .ok_or_else(|| KernelError::invalid_parameter("batch boolean needs at least one operand"))?;
        let mut acc = self.get(*first)?.clone();
        for id in rest {
            acc = Solid::boolean(op, &acc, self.get(*id)?);
        }
        Ok(self.insert(acc))
    }

    fn transform(&mut self, solid: SolidId, affine: &DAffine3) -> KernelResult<SolidId> {
        if !affine.is_finite() || affine.matrix3.determinant().abs() < f64::EPSILON {
            return Err(KernelError::invalid_parameter("transform must be finite and invertible"));
        }
        let result = self.get(solid)?.transform(affine);
        Ok(self.insert(result))
    }

    fn refine(&mut self, solid: SolidId, n: u32) -> KernelResult<SolidId> {
        let result = self.get(solid)?.refine(n);
        Ok(self.insert(result))
    }

    fn as_original(&mut self, solid: SolidId) -> KernelResult<SolidId> {
        self.get(solid)?;
        let origin = self.reserve_ids(1);
        let result = self.get(solid)?.as_original(origin);
        Ok(self.insert(result))
    }

    fn extrude(&mut self, extrusion: &Extrusion) -> KernelResult<SolidId> {
        let faces = extrude_faces(extrusion)?;
        Ok(self.insert_faces(faces))
    }

    fn revolve(&mut self, revolution: &Revolution) -> KernelResult<SolidId> {
        let faces = revolve_faces(revolution)?;
        Ok(self.insert_faces(faces))
    }

    fn export(&self, solid: SolidId) -> KernelResult<MeshGl> {
        Ok(self.get(solid)?.to_mesh_gl())
    }

    fn measure(&self, solid: SolidId) -> KernelResult<Measurements> {
        Ok(self.get(solid)?.measure())
    }

    fn free(&mut self, solid: SolidId) -> KernelResult<()> {
        self.solids
            .remove(&solid)
            .map(|_| ())
            .ok_or(KernelError::InvalidHandle(solid))
    }

    fn live_count(&self) -> usize {
        self.solids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_fresh_and_freed() {
        let mut kernel = BspKernel::new();
        let a = kernel.cube(DVec3::ONE, false).unwrap();
        let b = kernel.tetrahedron().unwrap();
        assert_ne!(a, b);
        assert_eq!(kernel.live_count(), 2);
        kernel.free(a).unwrap();
        assert_eq!(kernel.free(a), Err(KernelError::InvalidHandle(a)));
        assert_eq!(kernel.live_count(), 1);
    }

    #[test]
    fn test_primitives_get_distinct_original_ids() {
        let mut kernel = BspKernel::new();
        let first = kernel.reserve_ids(3);
        let cube = kernel.cube(DVec3::ONE, false).unwrap();
        let mesh = kernel.export(cube).unwrap();
        assert_eq!(mesh.run_original_id, vec![first + 3]);
    }

    #[test]
    fn test_operations_keep_inputs_alive() {
        let mut kernel = BspKernel::new();
        let a = kernel.cube(DVec3::ONE, false).unwrap();
        let b = kernel.cube(DVec3::ONE, true).unwrap();
        let c = kernel.boolean(BooleanOp::Add, a, b).unwrap();
        assert_eq!(kernel.live_count(), 3);
        assert!(kernel.measure(a).is_ok());
        assert!(kernel.measure(c).unwrap().volume > 1.0);
    }

    #[test]
    fn test_batch_boolean_folds_in_order() {
        let mut kernel = BspKernel::new();
        let big = kernel.cube(DVec3::splat(4.0), true).unwrap();
        let hole = kernel.cube(DVec3::splat(2.0), true).unwrap();
        let inside_hole = kernel.cube(DVec3::splat(0.5), false).unwrap();
        let id = kernel.batch_boolean(BooleanOp::Subtract, &[big, hole, inside_hole]).unwrap();
        let volume = kernel.measure(id).unwrap().volume;
        assert!((volume - (64.0 - 8.0)).abs() < 1e-9);
        assert!(kernel.batch_boolean(BooleanOp::Add, &[]).is_err());
    }

    #[test]
    fn test_singular_transform_rejected() {
        let mut kernel = BspKernel::new();
        let a = kernel.cube(DVec3::ONE, false).unwrap();
        let flat = DAffine3::from_scale(DVec3::new(1.0, 0.0, 1.0));
        assert!(kernel.transform(a, &flat).is_err());
    }

    #[test]
    fn test_unknown_handle() {
        let kernel = BspKernel::new();
        assert_eq!(
            kernel.measure(SolidId(42)).err(),
            Some(KernelError::InvalidHandle(SolidId(42)))
        );
    }
}
