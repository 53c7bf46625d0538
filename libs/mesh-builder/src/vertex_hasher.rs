//! # Vertex Hasher
//!
//! Spatial hash over fixed-stride float records, used to deduplicate vertices.
//!
//! Records are bucketed by the bit pattern of their first three floats
//! (the position) and compared in full inside a bucket. `-0.0` and `0.0`
//! are treated as the same value.

use crate::dynamic_array::DynamicArray;
use hashbrown::HashMap;

/// Deduplicating store of `stride`-float records.
///
/// # Example
///
/// ```rust
/// use mesh_builder::VertexHasher;
///
/// let mut hasher = VertexHasher::new(4);
/// assert_eq!(hasher.get_or_insert(&[0.0, 1.0, 2.0, 3.0]), (0, true));
/// assert_eq!(hasher.get_or_insert(&[1.0, 1.0, 2.0, 3.0]), (1, true));
/// assert_eq!(hasher.get_or_insert(&[-0.0, 1.0, 2.0, 3.0]), (0, false));
/// assert_eq!(hasher.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct VertexHasher {
    stride: usize,
    records: DynamicArray<f32>,
    buckets: HashMap<[u32; 3], Vec<u32>>,
}

#[inline]
fn canonical_bits(value: f32) -> u32 {
    if value == 0.0 {
        0
    } else {
        value.to_bits()
    }
}

impl VertexHasher {
    /// Creates an empty hasher for records of `stride` floats.
    ///
    /// # Panics
    ///
    /// Panics if `stride < 3`; every record starts with a position.
    pub fn new(stride: usize) -> Self {
        Self::with_capacity(stride, 0)
    }

    /// Creates an empty hasher with room for `vertices` records.
    pub fn with_capacity(stride: usize, vertices: usize) -> Self {
        assert!(stride >= 3, "vertex records must contain a position");
        Self {
            stride,
            records: DynamicArray::with_capacity(stride * vertices),
            buckets: HashMap::with_capacity(vertices),
        }
    }

    /// Floats per record.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Number of unique records stored.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len() / self.stride
    }

    /// True if no record was stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn key(record: &[f32]) -> [u32; 3] {
        [
            canonical_bits(record[0]),
            canonical_bits(record[1]),
            canonical_bits(record[2]),
        ]
    }

    fn record(&self, index: u32) -> &[f32] {
        let start = index as usize * self.stride;
        &self.records[start..start + self.stride]
    }

    fn same_record(a: &[f32], b: &[f32]) -> bool {
        a.iter()
            .zip(b)
            .all(|(x, y)| canonical_bits(*x) == canonical_bits(*y))
    }

    /// Looks up an identical record.
    pub fn find(&self, record: &[f32]) -> Option<u32> {
        debug_assert_eq!(record.len(), self.stride);
        self.buckets
            .get(&Self::key(record))?
            .iter()
            .copied()
            .find(|&index| Self::same_record(self.record(index), record))
    }

    /// Returns the index of an identical record, storing it first if new.
    ///
    /// The boolean is true when the record was inserted.
    pub fn get_or_insert(&mut self, record: &[f32]) -> (u32, bool) {
        debug_assert_eq!(record.len(), self.stride);
        if let Some(index) = self.find(record) {
            return (index, false);
        }
        let index = self.len() as u32;
        self.records.extend_from_slice(record);
        self.buckets
            .entry(Self::key(record))
            .or_default()
            .push(index);
        (index, true)
    }

    /// Borrows all stored records, interleaved.
    pub fn records(&self) -> &[f32] {
        &self.records
    }

    /// Consumes the hasher, returning the interleaved records.
    pub fn into_records(self) -> Vec<f32> {
        self.records.into_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_position_different_attributes() {
        let mut hasher = VertexHasher::new(6);
        let (a, _) = hasher.get_or_insert(&[1.0, 2.0, 3.0, 0.0, 1.0, 0.0]);
        let (b, inserted) = hasher.get_or_insert(&[1.0, 2.0, 3.0, 1.0, 0.0, 0.0]);
        assert!(inserted);
        assert_ne!(a, b);
        assert_eq!(hasher.find(&[1.0, 2.0, 3.0, 1.0, 0.0, 0.0]), Some(b));
        assert_eq!(hasher.len(), 2);
    }

    #[test]
    fn test_records_are_interleaved_in_insertion_order() {
        let mut hasher = VertexHasher::new(3);
        hasher.get_or_insert(&[5.0, 5.0, 5.0]);
        hasher.get_or_insert(&[1.0, 1.0, 1.0]);
        hasher.get_or_insert(&[5.0, 5.0, 5.0]);
        assert_eq!(hasher.into_records(), vec![5.0, 5.0, 5.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_missing_record() {
        let hasher = VertexHasher::new(3);
        assert_eq!(hasher.find(&[0.0, 0.0, 0.0]), None);
        assert!(hasher.is_empty());
    }

    #[test]
    #[should_panic]
    fn test_stride_must_hold_position() {
        VertexHasher::new(2);
    }
}
