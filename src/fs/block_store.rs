//! the block store the filesystem layer sits on:
//! allocation bookkeeping in a superblock at block 0, raw block access to everything else
use anyhow::anyhow;
use log::{debug, info};

use super::{
    BlockDevice, BlockId, DirBlock, FreeMap, RawBlock, SuperBlock, BLOCK_SIZE, ROOT_INDEX,
    SUPERBLOCK_INDEX,
};

/// what [FileSys](super::FileSys) needs from the storage underneath
pub trait BlockStore {
    fn mount(&mut self) -> anyhow::Result<()>;

    fn unmount(&mut self) -> anyhow::Result<()>;

    fn read_block(&self, block: BlockId) -> anyhow::Result<RawBlock>;

    /// replaces the whole block
    fn write_block(&mut self, block: BlockId, raw: &RawBlock) -> anyhow::Result<()>;

    /// a zeroed, previously unused block, or `None` when the disk is full
    fn get_free_block(&mut self) -> anyhow::Result<Option<BlockId>>;

    /// hand a block back to the free pool
    fn reclaim_block(&mut self, block: BlockId) -> anyhow::Result<()>;
}

/// it has the following layout:
/// - block 0: superblock with the free block bitmap
/// - block 1: root directory
/// - every other block: directories, inodes and data, as allocated
#[derive(Debug)]
pub struct BasicFileSys<D: BlockDevice> {
    device: D,
    /// `Some` while mounted
    free_map: Option<FreeMap>,
}

impl<D: BlockDevice> BasicFileSys<D> {
    pub fn new(device: D) -> Self {
        BasicFileSys {
            device,
            free_map: None,
        }
    }

    /// write an empty filesystem onto the device, whatever it held before
    pub fn format(&mut self) -> anyhow::Result<()> {
        let free_map = self.format_device()?;
        if self.free_map.is_some() {
            self.free_map = Some(free_map);
        }
        Ok(())
    }

    /// calculate the number of free blocks
    pub fn free_blocks(&self) -> anyhow::Result<usize> {
        Ok(self.free_map()?.free_blocks())
    }

    pub fn block_count(&self) -> usize {
        self.device.block_count()
    }

    /// get the device back, e.g. to mount it again
    pub fn into_inner(self) -> D {
        self.device
    }

    fn format_device(&mut self) -> anyhow::Result<FreeMap> {
        let free_map = FreeMap::formatted(self.device.block_count())?;
        self.device
            .write_block(ROOT_INDEX.index(), &DirBlock::new().encode()?)?;
        write_superblock(&mut self.device, &free_map)?;
        self.device.flush()?;
        info!(
            "formatted device: {} blocks of {BLOCK_SIZE} bytes, {} free",
            free_map.block_count(),
            free_map.free_blocks()
        );
        Ok(free_map)
    }

    fn load_free_map(&mut self) -> anyhow::Result<FreeMap> {
        let mut raw = [0u8; BLOCK_SIZE];
        self.device.read_block(SUPERBLOCK_INDEX, &mut raw)?;
        // a blank device gets formatted, anything else has to be a valid superblock
        if raw.iter().all(|b| *b == 0) {
            info!("device is blank, formatting it");
            return self.format_device();
        }
        let superblock = SuperBlock::from_block(&raw)?;
        if superblock.block_count as usize != self.device.block_count() {
            return Err(anyhow!(
                "superblock describes {} blocks but the device has {}",
                superblock.block_count,
                self.device.block_count()
            ));
        }
        superblock.free_map()
    }

    #[inline]
    fn free_map(&self) -> anyhow::Result<&FreeMap> {
        self.free_map
            .as_ref()
            .ok_or_else(|| anyhow!("block store is not mounted"))
    }

    #[inline]
    fn free_map_mut(&mut self) -> anyhow::Result<&mut FreeMap> {
        self.free_map
            .as_mut()
            .ok_or_else(|| anyhow!("block store is not mounted"))
    }

    fn sync_superblock(&mut self) -> anyhow::Result<()> {
        let free_map = self
            .free_map
            .as_ref()
            .ok_or_else(|| anyhow!("block store is not mounted"))?;
        write_superblock(&mut self.device, free_map)
    }
}

fn write_superblock<D: BlockDevice>(device: &mut D, free_map: &FreeMap) -> anyhow::Result<()> {
    let raw = SuperBlock::new(free_map).to_block()?;
    device.write_block(SUPERBLOCK_INDEX, &raw)
}

impl<D: BlockDevice> BlockStore for BasicFileSys<D> {
    fn mount(&mut self) -> anyhow::Result<()> {
        if self.free_map.is_some() {
            return Err(anyhow!("block store is already mounted"));
        }
        let free_map = self.load_free_map()?;
        info!(
            "mounted device: {} of {} blocks free",
            free_map.free_blocks(),
            free_map.block_count()
        );
        self.free_map = Some(free_map);
        Ok(())
    }

    fn unmount(&mut self) -> anyhow::Result<()> {
        self.sync_superblock()?;
        self.device.flush()?;
        self.free_map = None;
        info!("unmounted device");
        Ok(())
    }

    fn read_block(&self, block: BlockId) -> anyhow::Result<RawBlock> {
        self.free_map()?;
        let mut raw = [0u8; BLOCK_SIZE];
        self.device.read_block(block.index(), &mut raw)?;
        Ok(raw)
    }

    fn write_block(&mut self, block: BlockId, raw: &RawBlock) -> anyhow::Result<()> {
        self.free_map()?;
        self.device.write_block(block.index(), raw)
    }

    fn get_free_block(&mut self) -> anyhow::Result<Option<BlockId>> {
        let Some(index) = self.free_map_mut()?.allocate() else {
            debug!("no free block left");
            return Ok(None);
        };
        let block = BlockId::new(index)
            .ok_or_else(|| anyhow!("free map handed out reserved block {index}"))?;
        // blocks are handed out zeroed
        self.device.write_block(index, &[0u8; BLOCK_SIZE])?;
        self.sync_superblock()?;
        debug!("allocated block {block}");
        Ok(Some(block))
    }

    fn reclaim_block(&mut self, block: BlockId) -> anyhow::Result<()> {
        if block == ROOT_INDEX {
            return Err(anyhow!("the root directory block can't be reclaimed"));
        }
        let free_map = self.free_map_mut()?;
        if !free_map.is_allocated(block.index()) {
            return Err(anyhow!("block {block} is not allocated"));
        }
        free_map.release(block.index());
        self.sync_superblock()?;
        debug!("reclaimed block {block}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{MemDisk, Node};

    fn mounted(block_count: usize) -> BasicFileSys<MemDisk> {
        let mut store = BasicFileSys::new(MemDisk::new(block_count));
        store.mount().unwrap();
        store
    }

    #[test]
    fn test_mount_formats_blank_device() {
        let store = mounted(16);
        assert_eq!(store.free_blocks().unwrap(), 14);

        let raw = store.read_block(ROOT_INDEX).unwrap();
        let node = Node::decode(ROOT_INDEX, &raw).unwrap();
        assert!(matches!(node, Node::Directory(_, dir) if dir.is_empty()));
    }

    #[test]
    fn test_reused_block_is_zeroed() {
        let mut store = mounted(4);
        let block = store.get_free_block().unwrap().unwrap();
        assert_eq!(block.index(), 2);
        store.write_block(block, &[0xAB; BLOCK_SIZE]).unwrap();
        store.get_free_block().unwrap().unwrap();
        store.reclaim_block(block).unwrap();

        // block 2 is the only free one left
        let again = store.get_free_block().unwrap().unwrap();
        assert_eq!(again, block);
        assert_eq!(store.read_block(again).unwrap(), [0u8; BLOCK_SIZE]);
    }

    #[test]
    fn test_get_free_block_when_full() {
        let mut store = mounted(4);
        assert!(store.get_free_block().unwrap().is_some());
        assert!(store.get_free_block().unwrap().is_some());
        assert_eq!(store.get_free_block().unwrap(), None);
        assert_eq!(store.free_blocks().unwrap(), 0);
    }

    #[test]
    fn test_reclaim_guards() {
        let mut store = mounted(8);
        assert!(store.reclaim_block(ROOT_INDEX).is_err());
        // never allocated
        assert!(store.reclaim_block(BlockId::new(5).unwrap()).is_err());
        // out of range
        assert!(store.reclaim_block(BlockId::new(100).unwrap()).is_err());
    }

    #[test]
    fn test_bitmap_survives_remount() {
        let mut store = mounted(8);
        let a = store.get_free_block().unwrap().unwrap();
        let b = store.get_free_block().unwrap().unwrap();
        store.reclaim_block(a).unwrap();
        store.unmount().unwrap();

        let mut store = BasicFileSys::new(store.into_inner());
        store.mount().unwrap();
        assert_eq!(store.free_blocks().unwrap(), 5);
        // `a` is free again, `b` is still taken
        assert_eq!(store.get_free_block().unwrap(), Some(a));
        assert_eq!(
            store.get_free_block().unwrap().map(|x| x.index()),
            Some(b.index() + 1)
        );
    }

    #[test]
    fn test_unmounted_store_refuses_io() {
        let mut store = BasicFileSys::new(MemDisk::new(8));
        assert!(store.read_block(ROOT_INDEX).is_err());
        assert!(store.get_free_block().is_err());
        assert!(store.unmount().is_err());

        store.mount().unwrap();
        assert!(store.mount().is_err());
    }

    #[test]
    fn test_mount_rejects_garbage_superblock() {
        let mut disk = MemDisk::new(8);
        disk.write_block(SUPERBLOCK_INDEX, &[0x5A; BLOCK_SIZE]).unwrap();
        let mut store = BasicFileSys::new(disk);
        assert!(store.mount().is_err());
    }

    #[test]
    fn test_format_wipes_allocations() {
        let mut store = mounted(8);
        store.get_free_block().unwrap();
        store.get_free_block().unwrap();
        store.format().unwrap();
        assert_eq!(store.free_blocks().unwrap(), 6);
    }
}
