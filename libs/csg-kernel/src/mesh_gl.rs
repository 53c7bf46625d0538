//! # MeshGl Interchange Format
//!
//! Flat mesh exchanged with a geometry kernel.
//!
//! Every vertex is a record of `num_prop` floats; the first three are the
//! position, the rest are caller-defined properties the kernel carries
//! through booleans by interpolation. Triangles are grouped into runs:
//! contiguous ranges of `tri_verts` tagged with an original ID and the
//! affine transform that maps the original mesh into the result.

use glam::{DAffine3, DMat3, DVec3};

use crate::error::{KernelError, KernelResult};

/// Floats per run transform (column-major 3x4).
pub const RUN_TRANSFORM_STRIDE: usize = 12;

/// Mesh in kernel interchange layout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshGl {
    /// Floats per vertex; at least 3.
    pub num_prop: usize,
    /// Interleaved vertex records, `num_prop` floats each.
    pub vert_properties: Vec<f32>,
    /// Three vertex indices per triangle, counter-clockwise from outside.
    pub tri_verts: Vec<u32>,
    /// Vertices that share a position with `merge_to_vert[i]` but differ in
    /// properties.
    pub merge_from_vert: Vec<u32>,
    pub merge_to_vert: Vec<u32>,
    /// Offsets into `tri_verts` delimiting runs; one longer than the run
    /// count when present.
    pub run_index: Vec<u32>,
    /// Original ID of each run.
    pub run_original_id: Vec<u32>,
    /// Column-major 3x4 transform per run.
    pub run_transform: Vec<f32>,
}

impl MeshGl {
    /// Creates an empty mesh with the given vertex record width.
    pub fn new(num_prop: usize) -> Self {
        Self {
            num_prop,
            ..Self::default()
        }
    }

    pub fn num_vert(&self) -> usize {
        if self.num_prop == 0 {
            0
        } else {
            self.vert_properties.len() / self.num_prop
        }
    }

    pub fn num_tri(&self) -> usize {
        self.tri_verts.len() / 3
    }

    pub fn num_runs(&self) -> usize {
        self.run_original_id.len()
    }

    /// Position of vertex `vertex`.
    pub fn position(&self, vertex: usize) -> DVec3 {
        let base = vertex * self.num_prop;
        DVec3::new(
            f64::from(self.vert_properties[base]),
            f64::from(self.vert_properties[base + 1]),
            f64::from(self.vert_properties[base + 2]),
        )
    }

    /// Properties after the position of vertex `vertex`.
    pub fn properties(&self, vertex: usize) -> &[f32] {
        let base = vertex * self.num_prop;
        &self.vert_properties[base + 3..base + self.num_prop]
    }

    /// Triangle index range `[start, end)` of run `run`.
    pub fn run_triangles(&self, run: usize) -> (usize, usize) {
        (
            self.run_index[run] as usize / 3,
            self.run_index[run + 1] as usize / 3,
        )
    }

    /// Transform of run `run`, identity when no transforms are stored.
    pub fn run_affine(&self, run: usize) -> DAffine3 {
        let base = run * RUN_TRANSFORM_STRIDE;
        match self.run_transform.get(base..base + RUN_TRANSFORM_STRIDE) {
            Some(m) => affine_from_columns(m),
            None => DAffine3::IDENTITY,
        }
    }

    /// Checks buffer lengths and index ranges.
    ///
    /// ## Errors
    ///
    /// Returns [`KernelError::InvalidMesh`] describing the first problem.
    pub fn validate(&self) -> KernelResult<()> {
        if self.num_prop < 3 {
            return Err(KernelError::invalid_mesh(format!(
                "num_prop must be at least 3, got {}",
                self.num_prop
            )));
        }
        if self.vert_properties.len() % self.num_prop != 0 {
            return Err(KernelError::invalid_mesh(format!(
                "{} vertex properties is not a multiple of {}",
                self.vert_properties.len(),
                self.num_prop
            )));
        }
        if self.tri_verts.len() % 3 != 0 {
            return Err(KernelError::invalid_mesh(format!(
                "{} triangle indices is not a multiple of 3",
                self.tri_verts.len()
            )));
        }
        let num_vert = self.num_vert();
        if let Some(&bad) = self.tri_verts.iter().find(|&&v| v as usize >= num_vert) {
            return Err(KernelError::invalid_mesh(format!(
                "triangle index {bad} out of range for {num_vert} vertices"
            )));
        }
        if self.merge_from_vert.len() != self.merge_to_vert.len() {
            return Err(KernelError::invalid_mesh("merge vectors differ in length"));
        }
        if self
            .merge_from_vert
            .iter()
            .chain(&self.merge_to_vert)
            .any(|&v| v as usize >= num_vert)
        {
            return Err(KernelError::invalid_mesh("merge index out of range"));
        }

        if self.run_original_id.is_empty() {
            return Ok(());
        }
        let runs = self.run_original_id.len();
        if self.run_index.len() != runs + 1 {
            return Err(KernelError::invalid_mesh(format!(
                "{} run offsets for {runs} runs",
                self.run_index.len()
            )));
        }
        if self.run_index.windows(2).any(|w| w[0] > w[1] || w[0] % 3 != 0)
            || self.run_index.first() != Some(&0)
            || self.run_index.last().map(|&end| end as usize) != Some(self.tri_verts.len())
        {
            return Err(KernelError::invalid_mesh("run offsets do not cover triangles"));
        }
        if !self.run_transform.is_empty() && self.run_transform.len() != runs * RUN_TRANSFORM_STRIDE {
            return Err(KernelError::invalid_mesh(format!(
                "{} run transform floats for {runs} runs",
                self.run_transform.len()
            )));
        }
        Ok(())
    }
}

/// Builds an affine transform from 12 column-major floats.
pub fn affine_from_columns(m: &[f32]) -> DAffine3 {
    let col = |i: usize| {
        DVec3::new(
            f64::from(m[i * 3]),
            f64::from(m[i * 3 + 1]),
            f64::from(m[i * 3 + 2]),
        )
    };
    DAffine3 {
        matrix3: DMat3::from_cols(col(0), col(1), col(2)),
        translation: col(3),
    }
}

/// Flattens an affine transform into 12 column-major floats.
pub fn affine_to_columns(affine: &DAffine3) -> [f32; RUN_TRANSFORM_STRIDE] {
    let cols = [
        affine.matrix3.x_axis,
        affine.matrix3.y_axis,
        affine.matrix3.z_axis,
        affine.translation,
    ];
    let mut out = [0.0; RUN_TRANSFORM_STRIDE];
    for (i, c) in cols.iter().enumerate() {
        out[i * 3] = c.x as f32;
        out[i * 3 + 1] = c.y as f32;
        out[i * 3 + 2] = c.z as f32;
    }
    out
}
