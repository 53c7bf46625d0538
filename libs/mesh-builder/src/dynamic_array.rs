//! # Dynamic Array
//!
//! Amortized-growth typed buffer backing vertex and index data.
//!
//! Growth at least doubles capacity, so bulk appends through [`DynamicArray::expand`]
//! stay amortized O(1) per element while handing out writable tails.

use std::ops::{Deref, DerefMut};

/// Capacity reserved on first growth.
const MIN_CAPACITY: usize = 16;

/// Growable buffer of plain values.
///
/// # Example
///
/// ```rust
/// use mesh_builder::DynamicArray;
///
/// let mut positions = DynamicArray::<f32>::new();
/// positions.extend_from_slice(&[0.0, 1.0, 2.0]);
/// positions.expand(3).copy_from_slice(&[3.0, 4.0, 5.0]);
/// assert_eq!(positions.len(), 6);
/// assert_eq!(positions.into_vec(), vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynamicArray<T> {
    data: Vec<T>,
}

impl<T: Copy + Default> DynamicArray<T> {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Creates an empty buffer with room for `capacity` values.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    /// Number of stored values.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if nothing is stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Allocated capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    fn grow_for(&mut self, additional: usize) {
        let needed = self.data.len() + additional;
        if needed <= self.data.capacity() {
            return;
        }
        let target = needed.max(self.data.capacity() * 2).max(MIN_CAPACITY);
        self.data.reserve_exact(target - self.data.len());
    }

    /// Appends one value.
    #[inline]
    pub fn push(&mut self, value: T) {
        self.grow_for(1);
        self.data.push(value);
    }

    /// Appends a slice of values.
    pub fn extend_from_slice(&mut self, values: &[T]) {
        self.grow_for(values.len());
        self.data.extend_from_slice(values);
    }

    /// Grows by `count` default values and returns the new tail for writing.
    pub fn expand(&mut self, count: usize) -> &mut [T] {
        self.grow_for(count);
        let start = self.data.len();
        self.data.resize(start + count, T::default());
        &mut self.data[start..]
    }

    /// Shortens the buffer, keeping the first `len` values.
    pub fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
    }

    /// Removes every value, keeping the allocation.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Borrows the stored values.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Mutably borrows the stored values.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Consumes the buffer, returning exactly-sized storage.
    pub fn into_vec(mut self) -> Vec<T> {
        self.data.shrink_to_fit();
        self.data
    }
}

impl<T> Deref for DynamicArray<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.data
    }
}

impl<T> DerefMut for DynamicArray<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl<T> From<Vec<T>> for DynamicArray<T> {
    fn from(data: Vec<T>) -> Self {
        Self { data }
    }
}
