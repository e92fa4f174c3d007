use bitmaps::Bitmap;

use crate::memctl::{codec::MAX_HEADER_BLOCK, types::Word};

/// Upper bound on blocks per region, set by the 6-bit header field.
pub(crate) const MAX_BLOCKS: usize = MAX_HEADER_BLOCK as usize + 1;

/// Word storage for one region, block-major, with per-block dirty tracking.
///
/// A block is dirty when its contents changed since the table was last
/// loaded from or saved to its word list.
pub(crate) struct ShadowTable {
    words: Vec<Word>,
    words_per_block: usize,
    dirty: Bitmap<MAX_BLOCKS>,
}

impl ShadowTable {
    pub(crate) fn new(block_count: usize, words_per_block: usize) -> Self {
        debug_assert!(
            block_count <= MAX_BLOCKS,
            "Block count must fit the header's block field",
        );

        Self {
            words: vec![Word::ZERO; block_count * words_per_block],
            words_per_block,
            dirty: Bitmap::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.words.len()
    }

    pub(crate) fn as_words(&self) -> &[Word] {
        &self.words
    }

    /// Returns the words in `start..end`. Callers validate the span first.
    pub(crate) fn words(&self, start: usize, end: usize) -> &[Word] {
        &self.words[start..end]
    }

    /// Replaces words starting at `start` and marks the touched blocks dirty.
    pub(crate) fn store(&mut self, start: usize, data: &[Word]) {
        self.words[start..start + data.len()].copy_from_slice(data);
        self.apply_dirty_range(start, data.len(), true);
    }

    /// Replaces words starting at `start` without marking anything dirty.
    pub(crate) fn load(&mut self, start: usize, data: &[Word]) {
        self.words[start..start + data.len()].copy_from_slice(data);
    }

    pub(crate) fn is_dirty(&self, block: usize) -> bool {
        self.dirty.get(block)
    }

    pub(crate) fn any_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub(crate) fn clear_all_dirty(&mut self) {
        self.dirty = Bitmap::new();
    }

    /// Iterates over the indices of dirty blocks in ascending order.
    pub(crate) fn dirty_blocks(&self) -> impl Iterator<Item = u8> + '_ {
        let mut idx = self.dirty.first_index();
        core::iter::from_fn(move || {
            let block = idx?;
            idx = self.dirty.next_index(block);
            Some(block as u8)
        })
    }

    fn apply_dirty_range(&mut self, start: usize, len: usize, dirty: bool) {
        if len == 0 {
            return;
        }
        let sb = start / self.words_per_block;
        let eb = (start + len - 1) / self.words_per_block; // inclusive
        for block in sb..=eb {
            self.dirty.set(block, dirty);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 4 blocks of 4 words
    fn table() -> ShadowTable {
        ShadowTable::new(4, 4)
    }

    #[test]
    fn new_table_is_zeroed_and_clean() {
        let table = table();
        assert_eq!(table.len(), 16);
        assert!(table.as_words().iter().all(|w| *w == Word::ZERO));
        assert!(!table.any_dirty());
    }

    #[test]
    fn dirty_tracking_scenarios() {
        // Single block
        {
            let mut table = table();
            table.store(0, &[Word::new(1)]);
            assert!(table.is_dirty(0));
            assert!(!table.is_dirty(1));
        }

        // Spanning blocks: words 2-5 touch blocks 0 and 1
        {
            let mut table = table();
            table.store(2, &[Word::new(7); 4]);
            assert!(table.is_dirty(0));
            assert!(table.is_dirty(1));
            assert!(!table.is_dirty(2));
            assert_eq!(table.dirty_blocks().collect::<Vec<_>>(), [0, 1]);
        }

        // Exact block boundary
        {
            let mut table = table();
            table.store(12, &[Word::new(7); 4]);
            assert_eq!(table.dirty_blocks().collect::<Vec<_>>(), [3]);
        }
    }

    #[test]
    fn load_does_not_mark_dirty() {
        let mut table = table();
        table.load(4, &[Word::new(0xaaaa), Word::new(0xbbbb)]);
        assert_eq!(table.words(4, 6), [Word::new(0xaaaa), Word::new(0xbbbb)]);
        assert!(!table.any_dirty());
    }

    #[test]
    fn clear_all_dirty_resets_tracking() {
        let mut table = table();
        table.store(0, &[Word::new(1); 16]);
        assert_eq!(table.dirty_blocks().count(), 4);
        table.clear_all_dirty();
        assert!(!table.any_dirty());
        assert_eq!(table.words(15, 16), [Word::new(1)]);
    }
}
