//! # Bit Array
//!
//! Packed boolean bitset used for "visited" marks during traversals.

const WORD_BITS: usize = 32;

/// Fixed-length packed bitset.
///
/// # Example
///
/// ```rust
/// use mesh_builder::BitArray;
///
/// let mut visited = BitArray::new(40);
/// assert!(visited.insert(33));
/// assert!(!visited.insert(33));
/// assert!(visited.get(33));
/// assert_eq!(visited.count_ones(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitArray {
    words: Vec<u32>,
    len: usize,
}

impl BitArray {
    /// Creates a bitset of `len` cleared bits.
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(WORD_BITS)],
            len,
        }
    }

    /// Number of bits.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the bitset holds no bits.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reads bit `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    #[inline]
    pub fn get(&self, index: usize) -> bool {
        assert!(index < self.len, "bit index {index} out of range {}", self.len);
        self.words[index / WORD_BITS] & (1 << (index % WORD_BITS)) != 0
    }

    /// Writes bit `index`.
    #[inline]
    pub fn set(&mut self, index: usize, value: bool) {
        assert!(index < self.len, "bit index {index} out of range {}", self.len);
        let mask = 1 << (index % WORD_BITS);
        let word = &mut self.words[index / WORD_BITS];
        if value {
            *word |= mask;
        } else {
            *word &= !mask;
        }
    }

    /// Sets bit `index`, returning true if it was previously clear.
    #[inline]
    pub fn insert(&mut self, index: usize) -> bool {
        let was_set = self.get(index);
        self.set(index, true);
        !was_set
    }

    /// Clears every bit.
    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    /// Resizes the bitset; new bits are cleared.
    pub fn resize(&mut self, len: usize) {
        self.words.resize(len.div_ceil(WORD_BITS), 0);
        self.len = len;
        // bits past the end of a shrunk bitset must read as clear if it grows again
        let tail = len % WORD_BITS;
        if tail != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1 << tail) - 1;
            }
        }
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// True if every bit is set.
    pub fn all(&self) -> bool {
        self.count_ones() == self.len
    }

    /// Iterates over the indices of set bits in ascending order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(w, &word)| {
            (0..WORD_BITS)
                .filter(move |bit| word & (1 << bit) != 0)
                .map(move |bit| w * WORD_BITS + bit)
        })
    }
}
