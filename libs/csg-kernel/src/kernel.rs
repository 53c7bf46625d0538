//! # Kernel Interface
//!
//! The seam between the CSG evaluator and a geometry kernel. Solids live
//! inside the kernel and are addressed through [`SolidId`] handles; every
//! operation returns a new handle and leaves its inputs alive until they
//! are freed.

use std::fmt;

use config::constants::BUILTIN_KERNEL_PATH;
use csg_tree::{BooleanOp, Extrusion, Revolution};
use glam::{DAffine3, DVec3};

use crate::bsp_kernel::BspKernel;
use crate::error::{KernelError, KernelResult};
use crate::mesh_gl::MeshGl;

/// Handle to a solid owned by a kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SolidId(pub u32);

impl fmt::Display for SolidId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "solid#{}", self.0)
    }
}

/// Measurements answering the terminal queries.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Measurements {
    pub num_vert: usize,
    pub num_tri: usize,
    pub num_edge: usize,
    /// `1 - (V - E + F) / 2`; negative for several disjoint shells.
    pub genus: i64,
    pub volume: f64,
    pub surface_area: f64,
    /// `None` for an empty solid.
    pub bounds: Option<(DVec3, DVec3)>,
}

impl Measurements {
    pub fn is_empty(&self) -> bool {
        self.num_tri == 0
    }
}

/// Cylinder parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CylinderParams {
    pub height: f64,
    pub radius_low: f64,
    pub radius_high: f64,
    pub segments: u32,
    pub center: bool,
}

/// Operations a geometry kernel provides to the evaluator.
pub trait GeometryKernel: Send {
    /// Reserves `count` consecutive original IDs and returns the first.
    fn reserve_ids(&mut self, count: u32) -> u32;

    /// Imports a mesh; `normal_offset` is the property index of a normal
    /// channel that must be re-oriented when triangles flip.
    fn import(&mut self, mesh: &MeshGl, normal_offset: Option<usize>) -> KernelResult<SolidId>;

    fn cube(&mut self, size: DVec3, center: bool) -> KernelResult<SolidId>;
    fn cylinder(&mut self, params: CylinderParams) -> KernelResult<SolidId>;
    fn sphere(&mut self, radius: f64, segments: u32) -> KernelResult<SolidId>;
    fn tetrahedron(&mut self) -> KernelResult<SolidId>;

    fn boolean(&mut self, op: BooleanOp, a: SolidId, b: SolidId) -> KernelResult<SolidId>;

    /// Folds `op` over `operands` first to last.
    fn batch_boolean(&mut self, op: BooleanOp, operands: &[SolidId]) -> KernelResult<SolidId>;

    fn transform(&mut self, solid: SolidId, affine: &DAffine3) -> KernelResult<SolidId>;
    fn refine(&mut self, solid: SolidId, n: u32) -> KernelResult<SolidId>;

    /// Copies `solid` under a single fresh original ID with identity
    /// transform.
    ///
    /// The fresh ID maps to no caller material, so the copy's triangles
    /// come back without one.
    fn as_original(&mut self, solid: SolidId) -> KernelResult<SolidId>;

    fn extrude(&mut self, extrusion: &Extrusion) -> KernelResult<SolidId>;
    fn revolve(&mut self, revolution: &Revolution) -> KernelResult<SolidId>;

    /// Exports `solid` with one run per original ID, ascending.
    fn export(&self, solid: SolidId) -> KernelResult<MeshGl>;

    fn measure(&self, solid: SolidId) -> KernelResult<Measurements>;

    fn free(&mut self, solid: SolidId) -> KernelResult<()>;

    /// Number of handles not yet freed.
    fn live_count(&self) -> usize;
}

/// Creates kernel instances for workers.
pub trait KernelFactory: Send + Sync {
    /// Loads the kernel named by `library_path`.
    ///
    /// ## Errors
    ///
    /// Returns [`KernelError::UnsupportedLibrary`] for unknown paths.
    fn create(&self, library_path: &str) -> KernelResult<Box<dyn GeometryKernel>>;
}

/// Factory for the built-in BSP kernel.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinKernelFactory;

impl KernelFactory for BuiltinKernelFactory {
    fn create(&self, library_path: &str) -> KernelResult<Box<dyn GeometryKernel>> {
        if library_path != BUILTIN_KERNEL_PATH {
            return Err(KernelError::UnsupportedLibrary {
                path: library_path.to_string(),
            });
        }
        log::debug!("Loaded built-in BSP kernel");
        Ok(Box::new(BspKernel::new()))
    }
}
