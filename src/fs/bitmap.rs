use anyhow::anyhow;
use bitvec::prelude::*;

use crate::utils::fs_size_calculator::bitmap_size;

use super::{MAX_BLOCK_COUNT, MIN_BLOCK_COUNT, ROOT_INDEX, SUPERBLOCK_INDEX};

/// which blocks of the device are in use, one bit per block
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FreeMap {
    bitmap: BitVec<u8, Lsb0>,
    /// where the search for the next free block starts
    cursor: usize,
}

/// for serialize and deserialize
impl FreeMap {
    /// a fresh map where only the superblock and the root directory are taken
    pub fn formatted(block_count: usize) -> anyhow::Result<Self> {
        check_block_count(block_count)?;
        let mut bitmap = bitvec![u8, Lsb0; 0; block_count];
        bitmap.set(SUPERBLOCK_INDEX, true);
        bitmap.set(ROOT_INDEX.index(), true);
        Ok(FreeMap::new(bitmap))
    }

    /// rebuild the map from the bytes kept in the superblock
    pub fn from_raw(raw: &[u8], block_count: usize) -> anyhow::Result<Self> {
        check_block_count(block_count)?;
        if raw.len() < bitmap_size(block_count) {
            return Err(anyhow!(
                "bitmap of {} bytes can't describe {block_count} blocks",
                raw.len()
            ));
        }
        let mut bitmap = BitVec::<u8, Lsb0>::from_slice(raw);
        bitmap.truncate(block_count);
        Ok(FreeMap::new(bitmap))
    }

    pub fn as_raw_slice(&self) -> &[u8] {
        self.bitmap.as_raw_slice()
    }
}

impl FreeMap {
    fn new(bitmap: BitVec<u8, Lsb0>) -> Self {
        FreeMap { bitmap, cursor: 0 }
    }

    pub fn block_count(&self) -> usize {
        self.bitmap.len()
    }

    /// check if block is in use
    pub fn is_allocated(&self, index: usize) -> bool {
        self.bitmap.get(index).as_deref().copied().unwrap_or(false)
    }

    /// calculate the number of free blocks
    pub fn free_blocks(&self) -> usize {
        self.bitmap.count_zeros()
    }

    /// take the first free block after the last one handed out, wrapping around
    pub fn allocate(&mut self) -> Option<usize> {
        let index = self.next_free_block()?;
        self.bitmap.set(index, true);
        self.cursor = index + 1;
        Some(index)
    }

    /// give a block back
    /// # Params
    /// - `index`: block index, must be in range
    pub fn release(&mut self, index: usize) {
        self.bitmap.set(index, false);
    }

    fn next_free_block(&self) -> Option<usize> {
        let start = self.cursor.min(self.bitmap.len());
        self.bitmap[start..]
            .first_zero()
            .map(|i| start + i)
            .or_else(|| self.bitmap[..start].first_zero())
    }
}

fn check_block_count(block_count: usize) -> anyhow::Result<()> {
    if !(MIN_BLOCK_COUNT..=MAX_BLOCK_COUNT).contains(&block_count) {
        return Err(anyhow!(
            "block count must be between {MIN_BLOCK_COUNT} and {MAX_BLOCK_COUNT}, got {block_count}"
        ));
    }
    Ok(())
}
