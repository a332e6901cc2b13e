use std::fmt;
use std::rc::Rc;

const WORD_BITS: usize = 64;

/// A compact assigned-flags set with cheap structural sharing.
///
/// Cloning is O(1): the backing words are behind an `Rc` and only the first
/// divergent `set` after a clone allocates a private copy. A vector can also
/// be in a "fully assigned" sentinel state (see [`BitVector::mark_all_assigned`])
/// used for provably unreachable paths, where every query within the declared
/// size vacuously succeeds.
#[derive(Debug, Clone)]
pub struct BitVector {
    size: usize,
    bits: Bits,
}

#[derive(Debug, Clone)]
enum Bits {
    /// Every index below the declared size reads as set. Carries no
    /// information past the declared size.
    All,
    /// Shared backing words; indices past the backing read as unset.
    /// Invariant: no stored bit at or above the declared size is set.
    Words(Rc<Vec<u64>>),
}

impl BitVector {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            bits: Bits::Words(Rc::new(Vec::new())),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, index: usize) -> bool {
        assert!(index < self.size, "bit index {index} out of range {}", self.size);
        match &self.bits {
            Bits::All => true,
            Bits::Words(words) => match words.get(index / WORD_BITS) {
                Some(word) => word >> (index % WORD_BITS) & 1 != 0,
                None => false,
            },
        }
    }

    pub fn set(&mut self, index: usize, value: bool) {
        assert!(index < self.size, "bit index {index} out of range {}", self.size);
        // Avoid materializing a private copy for a write that changes nothing.
        if self.get(index) == value {
            return;
        }
        let words = self.words_mut();
        if value {
            words[index / WORD_BITS] |= 1 << (index % WORD_BITS);
        } else {
            words[index / WORD_BITS] &= !(1 << (index % WORD_BITS));
        }
    }

    /// Keeps a bit only if set in both vectors. Indices at or past `other`'s
    /// declared size are treated as unset in `other` and cleared here, even
    /// when `other` is the fully-assigned sentinel (the sentinel carries no
    /// information past its own size); within `other`'s size the sentinel is
    /// the identity.
    pub fn intersect(&mut self, other: &BitVector) {
        match &other.bits {
            Bits::All => {
                if other.size < self.size {
                    self.clear_from(other.size);
                }
            }
            Bits::Words(other_words) => {
                let words = self.words_mut();
                for (i, word) in words.iter_mut().enumerate() {
                    *word &= other_words.get(i).copied().unwrap_or(0);
                }
            }
        }
    }

    /// Sets a bit if set in either vector. Indices absent from `other`
    /// (at or past its declared size) contribute nothing and keep their
    /// existing value here; a sentinel `other` forces only indices below its
    /// own declared size.
    pub fn union(&mut self, other: &BitVector) {
        match &other.bits {
            Bits::All => {
                if other.size >= self.size {
                    self.bits = Bits::All;
                } else {
                    self.set_below(other.size);
                }
            }
            Bits::Words(other_words) => {
                if matches!(self.bits, Bits::All) {
                    return;
                }
                let size = self.size;
                let words = self.words_mut();
                let upper = words.len().min(other_words.len());
                for i in 0..upper {
                    words[i] |= other_words[i];
                }
                // `other` may be longer than us; drop anything past our size.
                mask_tail(words, size);
            }
        }
    }

    /// O(1) switch to the fully-assigned sentinel.
    pub fn mark_all_assigned(&mut self) {
        self.bits = Bits::All;
    }

    /// O(1) reset to all-unassigned.
    pub fn mark_all_unassigned(&mut self) {
        self.bits = Bits::Words(Rc::new(Vec::new()));
    }

    /// Extends the declared size; new indices read as unset. A sentinel is
    /// pinned down to explicit bits first so it cannot claim the new tail.
    pub fn grow(&mut self, new_size: usize) {
        assert!(new_size >= self.size, "bit vectors never shrink");
        if matches!(self.bits, Bits::All) {
            let mut words = vec![!0u64; self.size.div_ceil(WORD_BITS)];
            mask_tail(&mut words, self.size);
            self.bits = Bits::Words(Rc::new(words));
        }
        self.size = new_size;
    }

    /// Private, fully materialized backing of exactly the declared word count.
    fn words_mut(&mut self) -> &mut Vec<u64> {
        let word_count = self.size.div_ceil(WORD_BITS);
        if let Bits::All = self.bits {
            let mut words = vec![!0u64; word_count];
            mask_tail(&mut words, self.size);
            self.bits = Bits::Words(Rc::new(words));
        }
        let Bits::Words(rc) = &mut self.bits else {
            unreachable!();
        };
        let words = Rc::make_mut(rc);
        if words.len() < word_count {
            words.resize(word_count, 0);
        }
        words
    }

    fn clear_from(&mut self, start: usize) {
        debug_assert!(start < self.size);
        let words = self.words_mut();
        let word = start / WORD_BITS;
        if start % WORD_BITS != 0 {
            words[word] &= (1u64 << (start % WORD_BITS)) - 1;
            words[word + 1..].fill(0);
        } else {
            words[word..].fill(0);
        }
    }

    fn set_below(&mut self, end: usize) {
        debug_assert!(end < self.size);
        let words = self.words_mut();
        let word = end / WORD_BITS;
        words[..word].fill(!0);
        if end % WORD_BITS != 0 {
            words[word] |= (1u64 << (end % WORD_BITS)) - 1;
        }
    }
}

fn mask_tail(words: &mut [u64], size: usize) {
    if size % WORD_BITS != 0
        && let Some(last) = words.get_mut(size / WORD_BITS)
    {
        *last &= (1u64 << (size % WORD_BITS)) - 1;
    }
    for word in words.iter_mut().skip(size.div_ceil(WORD_BITS)) {
        *word = 0;
    }
}

impl fmt::Display for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitVector ({}:", self.size)?;
        if matches!(self.bits, Bits::All) {
            write!(f, " all")?;
        } else {
            for i in 0..self.size {
                write!(f, "{}", if self.get(i) { '1' } else { '0' })?;
            }
        }
        write!(f, ")")
    }
}

#[cfg(test)]
#[path = "tests/t_bitvec.rs"]
mod tests;
