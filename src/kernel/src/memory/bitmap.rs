//! One bit per physical frame: set means used or reserved.

use super::MAX_FRAMES;

const WORDS: usize = MAX_FRAMES / 64;

/// Fixed-size frame bitmap.
#[derive(Clone)]
pub struct FrameBitmap {
    words: [u64; WORDS],
}

impl Default for FrameBitmap {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBitmap {
    /// Number of frames the bitmap tracks.
    pub const CAPACITY: usize = MAX_FRAMES;

    /// Creates a bitmap with every frame marked used.
    pub const fn new() -> Self {
        Self {
            words: [u64::MAX; WORDS],
        }
    }

    /// Marks every frame used.
    pub fn fill(&mut self) {
        self.words.fill(u64::MAX);
    }

    /// Returns `true` if `index` is used. Frames past the capacity count as used.
    pub fn is_set(&self, index: usize) -> bool {
        match self.words.get(index / 64) {
            Some(word) => word & (1u64 << (index % 64)) != 0,
            None => true,
        }
    }

    /// Marks `index` used. Returns `true` if the bit changed.
    pub fn set(&mut self, index: usize) -> bool {
        let Some(word) = self.words.get_mut(index / 64) else {
            return false;
        };
        let mask = 1u64 << (index % 64);
        let was_clear = *word & mask == 0;
        *word |= mask;
        was_clear
    }

    /// Marks `index` free. Returns `true` if the bit changed.
    pub fn clear(&mut self, index: usize) -> bool {
        let Some(word) = self.words.get_mut(index / 64) else {
            return false;
        };
        let mask = 1u64 << (index % 64);
        let was_set = *word & mask != 0;
        *word &= !mask;
        was_set
    }

    /// Lowest free frame below `limit`.
    pub fn first_clear(&self, limit: usize) -> Option<usize> {
        let limit = limit.min(Self::CAPACITY);
        self.words
            .iter()
            .enumerate()
            .take(limit.div_ceil(64))
            .find(|(_, word)| **word != u64::MAX)
            .map(|(i, word)| i * 64 + word.trailing_ones() as usize)
            .filter(|&index| index < limit)
    }

    /// Number of used frames below `limit`.
    pub fn count_set(&self, limit: usize) -> usize {
        let limit = limit.min(Self::CAPACITY);
        let full = limit / 64;
        let mut count: usize = self.words[..full]
            .iter()
            .map(|word| word.count_ones() as usize)
            .sum();
        let rest = limit % 64;
        if rest != 0 {
            count += (self.words[full] & ((1u64 << rest) - 1)).count_ones() as usize;
        }
        count
    }
}
