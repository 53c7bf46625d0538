//! # BSP Booleans
//!
//! Constructive solid geometry on polygon soups using BSP trees.
//!
//! ## Algorithm
//!
//! Based on the csg.js algorithm by Evan Wallace:
//! - Union: A.clipTo(B); B.clipTo(A); B.invert(); B.clipTo(A); B.invert(); combine
//! - Difference: A.invert(); A.clipTo(B); B.clipTo(A); B.invert(); B.clipTo(A); B.invert(); combine; invert
//! - Intersection: A.invert(); B.clipTo(A); B.invert(); A.clipTo(B); B.clipTo(A); combine; invert
//!
//! Polygons keep their original ID and properties through every split.

mod node;
mod plane;
mod polygon;

pub use node::BspTree;
pub use plane::{Classification, Plane};
pub use polygon::{edge_point, position_order, BspVertex, Polygon};

use csg_tree::BooleanOp;

/// Applies `op` to two polygon sets.
pub fn boolean(op: BooleanOp, a: Vec<Polygon>, b: Vec<Polygon>) -> Vec<Polygon> {
    match op {
        BooleanOp::Add => union(a, b),
        BooleanOp::Subtract => difference(a, b),
        BooleanOp::Intersect => intersection(a, b),
    }
}

/// Union of two solids.
pub fn union(a: Vec<Polygon>, b: Vec<Polygon>) -> Vec<Polygon> {
    if a.is_empty() {
        return b;
    }
    if b.is_empty() {
        return a;
    }

    let mut bsp_a = BspTree::new(a);
    let mut bsp_b = BspTree::new(b);

    bsp_a.clip_to(&bsp_b);
    bsp_b.clip_to(&bsp_a);
    bsp_b.invert();
    bsp_b.clip_to(&bsp_a);
    bsp_b.invert();

    let mut result = bsp_a.into_polygons();
    result.extend(bsp_b.into_polygons());
    result
}

/// Difference `a - b`.
pub fn difference(a: Vec<Polygon>, b: Vec<Polygon>) -> Vec<Polygon> {
    if a.is_empty() {
        return Vec::new();
    }
    if b.is_empty() {
        return a;
    }

    let mut bsp_a = BspTree::new(a);
    let mut bsp_b = BspTree::new(b);

    // A - B = ~(~A | B)
    bsp_a.invert();
    bsp_a.clip_to(&bsp_b);
    bsp_b.clip_to(&bsp_a);
    bsp_b.invert();
    bsp_b.clip_to(&bsp_a);
    bsp_b.invert();

    let mut result = bsp_a.into_polygons();
    result.extend(bsp_b.into_polygons());
    result.iter_mut().for_each(Polygon::flip);
    result
}

/// Intersection of two solids.
pub fn intersection(a: Vec<Polygon>, b: Vec<Polygon>) -> Vec<Polygon> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }

    let mut bsp_a = BspTree::new(a);
    let mut bsp_b = BspTree::new(b);

    bsp_a.invert();
    bsp_b.clip_to(&bsp_a);
    bsp_b.invert();
    bsp_a.clip_to(&bsp_b);
    bsp_b.clip_to(&bsp_a);

    let mut result = bsp_a.into_polygons();
    result.extend(bsp_b.into_polygons());
    result.iter_mut().for_each(Polygon::flip);
    result
}
