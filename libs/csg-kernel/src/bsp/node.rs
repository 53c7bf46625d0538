//! # BSP Tree
//!
//! Binary space partitioning tree stored as an arena of nodes.
//!
//! All traversals use explicit stacks instead of recursion so deep trees
//! (many nearly parallel planes) cannot overflow the thread stack.

use super::plane::Plane;
use super::polygon::Polygon;

// =============================================================================
// NODE
// =============================================================================

#[derive(Debug, Clone, Default)]
struct Node {
    /// Splitting plane; `None` only for an empty root.
    plane: Option<Plane>,
    /// Polygons lying on the splitting plane.
    polygons: Vec<Polygon>,
    front: Option<usize>,
    back: Option<usize>,
}

// =============================================================================
// BSP TREE
// =============================================================================

/// BSP tree over convex polygons; node 0 is the root.
#[derive(Debug, Clone)]
pub struct BspTree {
    nodes: Vec<Node>,
}

impl BspTree {
    /// Builds a tree from polygons.
    pub fn new(polygons: Vec<Polygon>) -> Self {
        let mut tree = Self {
            nodes: vec![Node::default()],
        };
        tree.build(polygons);
        tree
    }

    /// Inserts polygons into the tree, extending it where needed.
    pub fn build(&mut self, polygons: Vec<Polygon>) {
        let mut stack = vec![(0usize, polygons)];

        while let Some((index, polygons)) = stack.pop() {
            let Some(first) = polygons.first() else {
                continue;
            };
            let plane = match self.nodes[index].plane {
                Some(plane) => plane,
                None => {
                    let plane = *first.plane();
                    self.nodes[index].plane = Some(plane);
                    plane
                }
            };

            let mut coplanar_front = Vec::new();
            let mut coplanar_back = Vec::new();
            let mut front = Vec::new();
            let mut back = Vec::new();
            for polygon in polygons {
                polygon.split(&plane, &mut coplanar_front, &mut coplanar_back, &mut front, &mut back);
            }

            let node = &mut self.nodes[index];
            node.polygons.append(&mut coplanar_front);
            node.polygons.append(&mut coplanar_back);

            if !front.is_empty() {
                let child = self.child(index, true);
                stack.push((child, front));
            }
            if !back.is_empty() {
                let child = self.child(index, false);
                stack.push((child, back));
            }
        }
    }

    /// Returns the front or back child of `index`, creating it if absent.
    fn child(&mut self, index: usize, front: bool) -> usize {
        let existing = if front {
            self.nodes[index].front
        } else {
            self.nodes[index].back
        };
        if let Some(child) = existing {
            return child;
        }
        let child = self.nodes.len();
        self.nodes.push(Node::default());
        if front {
            self.nodes[index].front = Some(child);
        } else {
            self.nodes[index].back = Some(child);
        }
        child
    }

    /// Swaps solid and empty space.
    pub fn invert(&mut self) {
        for node in &mut self.nodes {
            for polygon in &mut node.polygons {
                polygon.flip();
            }
            node.plane = node.plane.map(|plane| plane.flip());
            std::mem::swap(&mut node.front, &mut node.back);
        }
    }

    /// Removes the parts of `polygons` inside this tree's solid.
    pub fn clip_polygons(&self, polygons: Vec<Polygon>) -> Vec<Polygon> {
        let mut result = Vec::new();
        let mut stack = vec![(0usize, polygons)];

        while let Some((index, polygons)) = stack.pop() {
            let node = &self.nodes[index];
            let Some(plane) = node.plane else {
                result.extend(polygons);
                continue;
            };

            let mut coplanar_front = Vec::new();
            let mut coplanar_back = Vec::new();
            let mut front = Vec::new();
            let mut back = Vec::new();
            for polygon in polygons {
                polygon.split(&plane, &mut coplanar_front, &mut coplanar_back, &mut front, &mut back);
            }
            front.append(&mut coplanar_front);
            back.append(&mut coplanar_back);

            match node.front {
                Some(child) => stack.push((child, front)),
                None => result.extend(front),
            }
            // Back polygons with no back subtree are inside: dropped.
            if let Some(child) = node.back {
                stack.push((child, back));
            }
        }

        result
    }

    /// Removes the parts of this tree's polygons inside `other`.
    pub fn clip_to(&mut self, other: &BspTree) {
        for node in &mut self.nodes {
            let polygons = std::mem::take(&mut node.polygons);
            node.polygons = other.clip_polygons(polygons);
        }
    }

    pub fn all_polygons(&self) -> Vec<Polygon> {
        self.nodes
            .iter()
            .flat_map(|node| node.polygons.iter().cloned())
            .collect()
    }

    pub fn into_polygons(self) -> Vec<Polygon> {
        self.nodes.into_iter().flat_map(|node| node.polygons).collect()
    }

    pub fn polygon_count(&self) -> usize {
        self.nodes.iter().map(|node| node.polygons.len()).sum()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::super::polygon::BspVertex;
    use super::*;
    use glam::DVec3;

    fn make_triangle_polygon(z: f64) -> Polygon {
        Polygon::new(
            vec![
                BspVertex::at(DVec3::new(0.0, 0.0, z)),
                BspVertex::at(DVec3::new(1.0, 0.0, z)),
                BspVertex::at(DVec3::new(0.0, 1.0, z)),
            ],
            0,
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_bsp_new_empty() {
        let tree = BspTree::new(vec![]);
        assert_eq!(tree.polygon_count(), 0);
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn test_bsp_new_multiple() {
        let tree = BspTree::new(vec![
            make_triangle_polygon(0.0),
            make_triangle_polygon(1.0),
            make_triangle_polygon(-1.0),
        ]);
        assert_eq!(tree.polygon_count(), 3);
        assert_eq!(tree.node_count(), 3);
    }

    #[test]
    fn test_bsp_invert() {
        let mut tree = BspTree::new(vec![make_triangle_polygon(0.0)]);
        tree.invert();
        let polys = tree.all_polygons();
        assert!(polys[0].plane().normal().z < 0.0);
    }

    #[test]
    fn test_bsp_clip_polygons_front_kept() {
        let tree = BspTree::new(vec![make_triangle_polygon(0.0)]);
        let clipped = tree.clip_polygons(vec![make_triangle_polygon(1.0)]);
        assert_eq!(clipped.len(), 1);
    }

    #[test]
    fn test_bsp_clip_polygons_back_removed() {
        let tree = BspTree::new(vec![make_triangle_polygon(0.0)]);
        let clipped = tree.clip_polygons(vec![make_triangle_polygon(-1.0)]);
        assert!(clipped.is_empty());
    }

    #[test]
    fn test_empty_tree_keeps_everything() {
        let tree = BspTree::new(vec![]);
        let clipped = tree.clip_polygons(vec![make_triangle_polygon(-1.0)]);
        assert_eq!(clipped.len(), 1);
    }
}
