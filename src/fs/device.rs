//! the simulated disks blocks are stored on
use std::{
    fs::OpenOptions,
    io::{Cursor, Read, Seek, SeekFrom, Write},
    path::Path,
};

use anyhow::{anyhow, Context};
use log::debug;
use memmap2::MmapMut;

use crate::utils::fs_size_calculator;

use super::{RawBlock, BLOCK_SIZE};

/// raw, whole-block access to a storage device
pub trait BlockDevice {
    /// Returns the number of blocks in the device.
    fn block_count(&self) -> usize;

    /// Reads block `index` into `buf`.
    fn read_block(&self, index: usize, buf: &mut RawBlock) -> anyhow::Result<()>;

    /// Replaces the contents of block `index`.
    fn write_block(&mut self, index: usize, buf: &RawBlock) -> anyhow::Result<()>;

    /// Makes every write so far durable.
    fn flush(&mut self) -> anyhow::Result<()>;
}

fn check_index(index: usize, block_count: usize) -> anyhow::Result<()> {
    if index >= block_count {
        return Err(anyhow!(
            "block {index} is out of range, the device has {block_count} blocks"
        ));
    }
    Ok(())
}

/// a device that only lives in memory
#[derive(Debug, Clone)]
pub struct MemDisk {
    blocks: Vec<RawBlock>,
}

impl MemDisk {
    /// a zeroed device, to be formatted on first mount
    pub fn new(block_count: usize) -> Self {
        MemDisk {
            blocks: vec![[0u8; BLOCK_SIZE]; block_count],
        }
    }
}

impl BlockDevice for MemDisk {
    fn block_count(&self) -> usize {
        self.blocks.len()
    }

    fn read_block(&self, index: usize, buf: &mut RawBlock) -> anyhow::Result<()> {
        check_index(index, self.blocks.len())?;
        buf.copy_from_slice(&self.blocks[index]);
        Ok(())
    }

    fn write_block(&mut self, index: usize, buf: &RawBlock) -> anyhow::Result<()> {
        check_index(index, self.blocks.len())?;
        self.blocks[index].copy_from_slice(buf);
        Ok(())
    }

    fn flush(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// an image file mapped into memory, something like `Block Device`,like **/dev/sda1**
#[derive(Debug)]
pub struct ImageDisk {
    mmap: MmapMut,
    block_count: usize,
}

impl ImageDisk {
    /// create a new zero-filled image file, refusing to overwrite an existing one
    pub fn create<P>(image_path: P, block_count: usize) -> anyhow::Result<Self>
    where
        P: AsRef<Path>,
    {
        let image_path = image_path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(image_path)
            .with_context(|| format!("can't create image file {}", image_path.display()))?;
        // all regions are set to zero using `set_len` method
        file.set_len(fs_size_calculator::image_size(block_count))?;
        debug!("created image {} with {block_count} blocks", image_path.display());

        // Safety
        // the file is open for read and write, and nothing else in this process maps it
        let mmap = unsafe { MmapMut::map_mut(&file)? };
        Ok(ImageDisk { mmap, block_count })
    }

    /// map an existing image file for read and write
    pub fn open<P>(image_path: P) -> anyhow::Result<Self>
    where
        P: AsRef<Path>,
    {
        let image_path = image_path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(image_path)
            .with_context(|| format!("can't open image file {}", image_path.display()))?;
        let file_len = file.metadata()?.len();
        let block_count = fs_size_calculator::block_count_of(file_len).ok_or_else(|| {
            anyhow!("image size {file_len} is not a multiple of the {BLOCK_SIZE} byte block size")
        })?;

        // Safety
        // the file is open for read and write, and nothing else in this process maps it
        let mmap = unsafe { MmapMut::map_mut(&file)? };
        Ok(ImageDisk { mmap, block_count })
    }

    #[inline]
    fn seek_position(index: usize) -> u64 {
        index as u64 * BLOCK_SIZE as u64
    }
}

impl BlockDevice for ImageDisk {
    fn block_count(&self) -> usize {
        self.block_count
    }

    fn read_block(&self, index: usize, buf: &mut RawBlock) -> anyhow::Result<()> {
        check_index(index, self.block_count)?;
        let mut cursor = Cursor::new(&self.mmap[..]);
        cursor.seek(SeekFrom::Start(Self::seek_position(index)))?;
        cursor.read_exact(buf)?;
        Ok(())
    }

    fn write_block(&mut self, index: usize, buf: &RawBlock) -> anyhow::Result<()> {
        check_index(index, self.block_count)?;
        let mut cursor = Cursor::new(&mut self.mmap[..]);
        cursor.seek(SeekFrom::Start(Self::seek_position(index)))?;
        cursor.write_all(buf)?;
        Ok(())
    }

    fn flush(&mut self) -> anyhow::Result<()> {
        Ok(self.mmap.flush()?)
    }
}
