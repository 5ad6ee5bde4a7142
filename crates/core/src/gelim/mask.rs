use bitvec::vec::BitVec;

/// One flag per genotype position, all unset at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenotypeMask {
    bits: BitVec,
}

impl GenotypeMask {
    pub fn new(len: usize) -> Self {
        Self {
            bits: BitVec::repeat(false, len),
        }
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Out-of-range positions read as unset.
    pub fn get(&self, index: usize) -> bool {
        self.bits.get(index).map_or(false, |b| *b)
    }

    /// # Panics
    /// Panics if `index` is out of range.
    pub fn set(&mut self, index: usize) {
        self.bits.set(index, true);
    }

    pub fn count_set(&self) -> usize {
        self.bits.count_ones()
    }

    /// No position is set.
    pub fn none(&self) -> bool {
        self.bits.not_any()
    }

    pub fn unset_positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits.iter_zeros()
    }
}
