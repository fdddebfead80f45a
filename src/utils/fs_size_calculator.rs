//! This module contains functions to calculate the size of differennt fs components

use crate::fs::BLOCK_SIZE;

/// calculate needed free block bitmap size
/// # Arguments
/// - `element_count`: the number of blocks to track
/// # Return
/// the size of the bitmap in bytes
/// # Example
/// ```
/// use blockfs::utils::fs_size_calculator::bitmap_size;
/// let block_count = 100;
/// let bitmap_size = bitmap_size(block_count);
/// assert_eq!(bitmap_size, 13);
/// ```
pub const fn bitmap_size(element_count: usize) -> usize {
    element_count.div_ceil(8)
}

/// calculate the size of an image file holding `block_count` blocks
/// # Example
/// ```
/// use blockfs::utils::fs_size_calculator::image_size;
/// use blockfs::BLOCK_SIZE;
/// assert_eq!(image_size(1024), 1024 * BLOCK_SIZE as u64);
/// ```
pub const fn image_size(block_count: usize) -> u64 {
    block_count as u64 * BLOCK_SIZE as u64
}

/// how many whole blocks an image file of `file_len` bytes holds,
/// `None` if the length isn't a multiple of the block size
/// # Example
/// ```
/// use blockfs::utils::fs_size_calculator::block_count_of;
/// use blockfs::BLOCK_SIZE;
/// assert_eq!(block_count_of(4 * BLOCK_SIZE as u64), Some(4));
/// assert_eq!(block_count_of(4 * BLOCK_SIZE as u64 + 1), None);
/// ```
pub const fn block_count_of(file_len: u64) -> Option<usize> {
    if file_len % BLOCK_SIZE as u64 != 0 {
        None
    } else {
        Some((file_len / BLOCK_SIZE as u64) as usize)
    }
}
