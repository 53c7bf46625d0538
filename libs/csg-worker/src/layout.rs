//! # Attribute Layout
//!
//! Column assignment for the one interleaved vertex-property buffer every
//! mesh leaf of a job is imported into.
//!
//! Positions take columns 0..3. Each distinct extra attribute kind found
//! on any leaf gets the next free columns, in order of first appearance
//! during the walk. Submeshes lacking an attribute are zero-filled.

use std::convert::Infallible;

use csg_tree::{iterate_job, Job, OpTreeVisitor};
use mesh_builder::{AttributeKind, EncodedMeshGroup};

/// Column offsets of the extra attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeLayout {
    columns: Vec<(AttributeKind, usize)>,
    num_prop: usize,
}

impl Default for AttributeLayout {
    fn default() -> Self {
        Self {
            columns: Vec::new(),
            num_prop: 3,
        }
    }
}

impl AttributeLayout {
    /// Layout covering every mesh leaf of `job`.
    pub fn from_job(job: &Job<EncodedMeshGroup>) -> Self {
        let mut layout = Self::default();
        if let Err(never) = iterate_job(job, &mut layout) {
            match never {}
        }
        layout
    }

    /// Adds `kind` unless it already has columns.
    pub fn insert(&mut self, kind: AttributeKind) {
        if self.offset(kind).is_none() {
            self.columns.push((kind, self.num_prop));
            self.num_prop += kind.components();
        }
    }

    /// First column of `kind`.
    pub fn offset(&self, kind: AttributeKind) -> Option<usize> {
        self.columns
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|&(_, offset)| offset)
    }

    /// Column of the normal channel the kernel re-orients on flips.
    pub fn normal_offset(&self) -> Option<usize> {
        self.offset(AttributeKind::Normal)
    }

    /// Floats per vertex, positions included.
    pub fn num_prop(&self) -> usize {
        self.num_prop
    }

    pub fn columns(&self) -> &[(AttributeKind, usize)] {
        &self.columns
    }
}

impl OpTreeVisitor<EncodedMeshGroup> for AttributeLayout {
    type Error = Infallible;

    fn mesh(&mut self, mesh: &EncodedMeshGroup) -> Result<(), Infallible> {
        for submesh in &mesh.submeshes {
            for (kind, _) in &submesh.extra_attributes {
                self.insert(*kind);
            }
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
