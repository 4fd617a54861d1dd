use crate::SyntaxKind;

const SIZE: usize = 4;

/// Compact bit set of [`SyntaxKind`]s, usable in `const` contexts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KindSet {
    bits: [u64; SIZE],
}

impl KindSet {
    pub const EMPTY: Self = Self { bits: [0; SIZE] };
    const BITS_PER_SLOT: u16 = u64::BITS as u16;

    const fn from_kind(kind: SyntaxKind) -> Self {
        let kind = kind.into_raw();

        let slot_index = (kind / Self::BITS_PER_SLOT) as usize;

        assert!(slot_index < SIZE, "Index out of bounds. Increase the size of the bitset array.");

        let bit_index = kind % Self::BITS_PER_SLOT;
        let mask = 1 << bit_index;

        let mut bits = Self::EMPTY.bits;
        bits[slot_index] = mask;

        Self { bits }
    }

    pub const fn union(mut self, other: &Self) -> Self {
        let mut i = 0;

        while i < self.bits.len() {
            self.bits[i] |= other.bits[i];
            i += 1;
        }

        self
    }

    pub const fn new<const N: usize>(kinds: [SyntaxKind; N]) -> Self {
        let mut set = Self::EMPTY;

        let mut i = 0;
        while i < kinds.len() {
            set = set.union(&Self::from_kind(kinds[i]));
            i += 1;
        }

        set
    }

    pub const fn contains(&self, kind: SyntaxKind) -> bool {
        let kind = kind.into_raw();
        let slot_index = (kind / Self::BITS_PER_SLOT) as usize;
        if slot_index >= SIZE {
            return false;
        }
        let bit_index = kind % Self::BITS_PER_SLOT;
        let mask = 1 << bit_index;

        self.bits[slot_index] & mask != 0
    }

    pub const fn is_empty(&self) -> bool {
        let mut i = 0;
        while i < self.bits.len() {
            if self.bits[i] != 0 {
                return false;
            }
            i += 1;
        }
        true
    }
}
