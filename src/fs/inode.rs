use anyhow::{anyhow, Context};
use bincode::{Decode, Encode};

use super::{
    block::{encode_block, peek_magic},
    BlockId, FsError, RawBlock, Result, BLOCK_SIZE, INODE_MAGIC, MAX_DATA_BLOCKS,
    MAX_FILE_SIZE,
};

/// an inode block: the file size and its data blocks in order,
/// packed from slot 0 with no gaps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inode {
    file_size: usize,
    blocks: [Option<BlockId>; MAX_DATA_BLOCKS],
}

#[derive(Encode, Decode)]
struct RawInode {
    magic: u32,
    size: u32,
    blocks: [u16; MAX_DATA_BLOCKS],
}

impl Default for Inode {
    fn default() -> Self {
        Inode {
            file_size: 0,
            blocks: [None; MAX_DATA_BLOCKS],
        }
    }
}

impl Inode {
    /// an empty file
    pub fn new() -> Self {
        Self::default()
    }
}

/// This block is about file metadata
impl Inode {
    pub fn size(&self) -> usize {
        self.file_size
    }

    pub fn data_blocks(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.blocks.iter().map_while(|b| *b)
    }

    pub fn data_block_count(&self) -> usize {
        self.data_blocks().count()
    }

    /// blocks owned by the file, the inode block included
    pub fn block_count(&self) -> usize {
        1 + self.data_block_count()
    }

    pub fn first_block(&self) -> Option<BlockId> {
        self.blocks[0]
    }

    pub fn last_block(&self) -> Option<BlockId> {
        self.data_blocks().last()
    }
}

/// This block is about growing the file
impl Inode {
    /// bytes still free at the end of the last data block;
    /// 0 when there is no block yet or the last one is full
    pub fn tail_space(&self) -> usize {
        self.data_block_count() * BLOCK_SIZE - self.file_size
    }

    /// hang a new data block off the end of the list
    pub fn add_block(&mut self, block: BlockId) -> Result<()> {
        let slot = self.data_block_count();
        if slot >= MAX_DATA_BLOCKS {
            return Err(FsError::FileTooLarge);
        }
        self.blocks[slot] = Some(block);
        Ok(())
    }

    pub fn increment_size(&mut self, len: usize) {
        self.file_size += len;
    }
}

/// This block is about the on-disk encoding
impl Inode {
    pub fn encode(&self) -> anyhow::Result<RawBlock> {
        let raw = RawInode {
            magic: INODE_MAGIC,
            size: self.file_size as u32,
            blocks: self.blocks.map(BlockId::to_raw),
        };
        encode_block(&raw).context("inode does not fit in a block")
    }

    pub fn decode(raw: &RawBlock) -> anyhow::Result<Self> {
        let magic = peek_magic(raw)?;
        if magic != INODE_MAGIC {
            return Err(anyhow!("expected an inode block, found magic {magic:#x}"));
        }
        let config = bincode::config::legacy();
        let (raw, _): (RawInode, usize) = bincode::decode_from_slice(raw, config)?;
        let file_size = raw.size as usize;
        if file_size > MAX_FILE_SIZE {
            return Err(anyhow!("inode claims {file_size} bytes, more than a file can hold"));
        }
        let inode = Inode {
            file_size,
            blocks: raw.blocks.map(BlockId::from_raw),
        };
        // data blocks are packed from slot 0, and there are exactly as many as the size needs
        let count = inode.data_block_count();
        if inode.blocks[count..].iter().any(Option::is_some) {
            return Err(anyhow!("inode has a gap in its block list after slot {count}"));
        }
        if count != file_size.div_ceil(BLOCK_SIZE) {
            return Err(anyhow!(
                "inode claims {file_size} bytes but has {count} data blocks"
            ));
        }
        Ok(inode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(i: usize) -> BlockId {
        BlockId::new(i).unwrap()
    }

    #[test]
    fn test_empty_inode() {
        let inode = Inode::new();
        assert_eq!(inode.size(), 0);
        assert_eq!(inode.block_count(), 1);
        assert_eq!(inode.first_block(), None);
        assert_eq!(inode.last_block(), None);
        assert_eq!(inode.tail_space(), 0);
    }

    #[test]
    fn test_tail_space() {
        let mut inode = Inode::new();
        inode.add_block(block(2)).unwrap();
        assert_eq!(inode.tail_space(), BLOCK_SIZE);

        inode.increment_size(100);
        assert_eq!(inode.tail_space(), BLOCK_SIZE - 100);

        // a full last block leaves no room, it doesn't start over
        inode.increment_size(BLOCK_SIZE - 100);
        assert_eq!(inode.tail_space(), 0);
    }

    #[test]
    fn test_add_block_until_full() {
        let mut inode = Inode::new();
        for i in 0..MAX_DATA_BLOCKS {
            inode.add_block(block(i + 2)).unwrap();
        }
        assert_eq!(inode.block_count(), MAX_DATA_BLOCKS + 1);
        assert_eq!(inode.first_block(), Some(block(2)));
        assert_eq!(inode.last_block(), Some(block(MAX_DATA_BLOCKS + 1)));
        assert!(matches!(
            inode.add_block(block(1000)),
            Err(FsError::FileTooLarge)
        ));
    }

    #[test]
    fn test_inode_encoding() -> anyhow::Result<()> {
        let mut inode = Inode::new();
        inode.add_block(block(3))?;
        inode.add_block(block(9))?;
        inode.increment_size(BLOCK_SIZE + 17);

        let raw = inode.encode()?;
        assert_eq!(peek_magic(&raw)?, INODE_MAGIC);
        let decoded = Inode::decode(&raw)?;
        assert_eq!(decoded, inode);
        assert_eq!(decoded.data_blocks().collect::<Vec<_>>(), [block(3), block(9)]);
        Ok(())
    }

    fn raw_inode(size: u32, blocks: &[(usize, u16)]) -> RawBlock {
        let mut raw = RawInode {
            magic: INODE_MAGIC,
            size,
            blocks: [0; MAX_DATA_BLOCKS],
        };
        for &(slot, block) in blocks {
            raw.blocks[slot] = block;
        }
        encode_block(&raw).unwrap()
    }

    #[test]
    fn test_decode_checks_size_against_blocks() {
        // one block can't hold 600 bytes
        assert!(Inode::decode(&raw_inode(600, &[(0, 5)])).is_err());
        // a block too many for the size
        assert!(Inode::decode(&raw_inode(10, &[(0, 5), (1, 6)])).is_err());
        assert!(Inode::decode(&raw_inode(1, &[])).is_err());

        let inode = Inode::decode(&raw_inode(600, &[(0, 5), (1, 6)])).unwrap();
        assert_eq!(inode.tail_space(), 2 * BLOCK_SIZE - 600);
    }

    #[test]
    fn test_decode_rejects_gaps() {
        let raw = raw_inode(BLOCK_SIZE as u32 + 1, &[(0, 5), (2, 6)]);
        assert!(Inode::decode(&raw).is_err());
    }

    #[test]
    fn test_decode_rejects_directory_block() {
        let raw = crate::fs::DirBlock::new().encode().unwrap();
        assert!(Inode::decode(&raw).is_err());
    }
}
