//! # CSG Operation Tree
//!
//! Closed sum types describing a CSG expression.
//!
//! A tree node is a primitive, an opaque mesh leaf of type `M`, or an
//! operation over child trees. A [`Job`] is either a plain tree or a
//! [`FinalOperation`] that reduces a tree to a [`QueryValue`]; final
//! operations cannot be nested inside trees.

use serde::{Deserialize, Serialize};

// =============================================================================
// LEAVES
// =============================================================================

/// Solid primitives built directly by the geometry kernel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Primitive {
    /// Axis-aligned box; the minimum corner sits at the origin unless
    /// `center` is set.
    Cube { size: [f64; 3], center: bool },

    /// Cylinder or cone along +Z.
    Cylinder {
        height: f64,
        radius_low: f64,
        /// Top radius; equals `radius_low` when absent.
        radius_high: Option<f64>,
        circular_segments: Option<u32>,
        center: bool,
    },

    /// Sphere centered at the origin.
    Sphere {
        radius: f64,
        circular_segments: Option<u32>,
    },

    /// Regular tetrahedron inscribed in the cube `[-1, 1]^3`.
    Tetrahedron,
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// Boolean combination of solids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BooleanOp {
    /// Union.
    Add,
    /// Difference; later operands are removed from the first.
    Subtract,
    /// Intersection.
    Intersect,
}

/// Single-child operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnaryOp {
    Translate { offset: [f64; 3] },
    /// Euler angles in degrees, applied about X, then Y, then Z.
    Rotate { degrees: [f64; 3] },
    Scale { factor: [f64; 3] },
    /// Reflects across the plane through the origin with this normal.
    Mirror { normal: [f64; 3] },
    /// Column-major 3x4 affine matrix.
    Transform { matrix: [f64; 12] },
    /// Splits every edge into `n` pieces.
    Refine { n: u32 },
    /// Marks the result as a fresh original so later runs report it as one.
    AsOriginal,
}

/// 2D region made of simple counter-clockwise contours.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrossSection {
    pub contours: Vec<Vec<[f64; 2]>>,
}

impl CrossSection {
    pub fn new(contours: Vec<Vec<[f64; 2]>>) -> Self {
        Self { contours }
    }

    /// Axis-aligned rectangle with its minimum corner at the origin.
    pub fn rectangle(width: f64, height: f64) -> Self {
        Self::new(vec![vec![
            [0.0, 0.0],
            [width, 0.0],
            [width, height],
            [0.0, height],
        ]])
    }

    /// Regular polygon approximating a circle around the origin.
    pub fn circle(radius: f64, segments: u32) -> Self {
        let n = segments.max(3);
        let contour = (0..n)
            .map(|i| {
                let angle = std::f64::consts::TAU * f64::from(i) / f64::from(n);
                [radius * angle.cos(), radius * angle.sin()]
            })
            .collect();
        Self::new(vec![contour])
    }
}

/// Linear extrusion of a cross-section along +Z.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extrusion {
    pub cross_section: CrossSection,
    pub height: f64,
    /// Intermediate slices between bottom and top.
    pub n_divisions: u32,
    pub twist_degrees: f64,
    pub scale_top: [f64; 2],
    pub center: bool,
}

impl Extrusion {
    /// Straight extrusion without twist or taper.
    pub fn straight(cross_section: CrossSection, height: f64) -> Self {
        Self {
            cross_section,
            height,
            n_divisions: 0,
            twist_degrees: 0.0,
            scale_top: [1.0, 1.0],
            center: false,
        }
    }
}

/// Revolution of a cross-section (in the XY plane, `x >= 0`) around +Z.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revolution {
    pub cross_section: CrossSection,
    pub circular_segments: Option<u32>,
    pub revolve_degrees: f64,
}

/// An operation node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Operation<M> {
    /// Boolean over two children.
    Boolean {
        op: BooleanOp,
        left: Box<OperationTree<M>>,
        right: Box<OperationTree<M>>,
    },

    /// Boolean folded over a list of children, first to last.
    BatchBoolean {
        op: BooleanOp,
        manifolds: Vec<OperationTree<M>>,
    },

    /// Transform-like operation over one child.
    Unary {
        transform: UnaryOp,
        child: Box<OperationTree<M>>,
    },

    /// Solid from a linear extrusion; takes no children.
    Extrude(Extrusion),

    /// Solid from a revolution; takes no children.
    Revolve(Revolution),
}

impl<M> Operation<M> {
    /// Number of child results the operation consumes.
    pub fn arity(&self) -> usize {
        match self {
            Operation::Boolean { .. } => 2,
            Operation::BatchBoolean { manifolds, .. } => manifolds.len(),
            Operation::Unary { .. } => 1,
            Operation::Extrude(_) | Operation::Revolve(_) => 0,
        }
    }

    /// Short name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Boolean { .. } => "boolean",
            Operation::BatchBoolean { .. } => "batch_boolean",
            Operation::Unary { .. } => "unary",
            Operation::Extrude(_) => "extrude",
            Operation::Revolve(_) => "revolve",
        }
    }
}

/// A CSG expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", content = "value", rename_all = "snake_case")]
pub enum OperationTree<M> {
    Primitive(Primitive),
    Operation(Operation<M>),
    /// Caller-supplied mesh.
    Mesh(M),
}

impl<M> OperationTree<M> {
    pub fn boolean(op: BooleanOp, left: Self, right: Self) -> Self {
        OperationTree::Operation(Operation::Boolean {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn union(left: Self, right: Self) -> Self {
        Self::boolean(BooleanOp::Add, left, right)
    }

    pub fn difference(left: Self, right: Self) -> Self {
        Self::boolean(BooleanOp::Subtract, left, right)
    }

    pub fn intersection(left: Self, right: Self) -> Self {
        Self::boolean(BooleanOp::Intersect, left, right)
    }

    pub fn batch(op: BooleanOp, manifolds: Vec<Self>) -> Self {
        OperationTree::Operation(Operation::BatchBoolean { op, manifolds })
    }

    pub fn unary(transform: UnaryOp, child: Self) -> Self {
        OperationTree::Operation(Operation::Unary {
            transform,
            child: Box::new(child),
        })
    }

    pub fn translate(self, offset: [f64; 3]) -> Self {
        Self::unary(UnaryOp::Translate { offset }, self)
    }

    pub fn cube(size: [f64; 3], center: bool) -> Self {
        OperationTree::Primitive(Primitive::Cube { size, center })
    }

    /// Ends the expression with a query.
    pub fn query(self, query: FinalQuery) -> Job<M> {
        Job::Final(FinalOperation {
            query,
            manifold: self,
        })
    }
}

// =============================================================================
// QUERIES
// =============================================================================

/// Scalar or structured measurement of a solid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalQuery {
    IsEmpty,
    NumVert,
    NumTri,
    NumEdge,
    BoundingBox,
    Genus,
    Volume,
    SurfaceArea,
    /// Volume and surface area together.
    Properties,
}

/// Terminal node: a tree reduced by a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalOperation<M> {
    pub query: FinalQuery,
    pub manifold: OperationTree<M>,
}

/// Result of a [`FinalQuery`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryValue {
    Bool { value: bool },
    Count { value: u64 },
    Scalar { value: f64 },
    BoundingBox { min: [f64; 3], max: [f64; 3] },
    Properties { volume: f64, surface_area: f64 },
}

/// Unit of work sent to a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "job", content = "value", rename_all = "snake_case")]
pub enum Job<M> {
    Tree(OperationTree<M>),
    Final(FinalOperation<M>),
}

impl<M> Job<M> {
    /// The tree evaluated by this job.
    pub fn tree(&self) -> &OperationTree<M> {
        match self {
            Job::Tree(tree) => tree,
            Job::Final(final_op) => &final_op.manifold,
        }
    }

    pub fn query(&self) -> Option<FinalQuery> {
        match self {
            Job::Tree(_) => None,
            Job::Final(final_op) => Some(final_op.query),
        }
    }
}

impl<M> From<OperationTree<M>> for Job<M> {
    fn from(tree: OperationTree<M>) -> Self {
        Job::Tree(tree)
    }
}
