//! block indices, and typed references to the directory and inode blocks they hold
use std::{fmt, num::NonZeroU16};

use bincode::Encode;

use super::{DirBlock, FileKind, FsError, Inode, Result, ABSENT, BLOCK_SIZE};

/// the raw contents of one block
pub type RawBlock = [u8; BLOCK_SIZE];

/// index of an allocated block; index 0 never names a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(NonZeroU16);

/// the root ("home") directory, written when the device is formatted and never moved
pub const ROOT_INDEX: BlockId = match NonZeroU16::new(1) {
    Some(index) => BlockId(index),
    None => unreachable!(),
};

impl BlockId {
    /// `None` for index 0 and indices that don't fit on disk
    pub fn new(index: usize) -> Option<Self> {
        u16::try_from(index).ok().and_then(Self::from_raw)
    }

    /// decode an on-disk pointer, where [ABSENT] means no block
    pub fn from_raw(raw: u16) -> Option<Self> {
        NonZeroU16::new(raw).map(BlockId)
    }

    /// encode an optional pointer for the disk
    pub fn to_raw(block: Option<Self>) -> u16 {
        block.map_or(ABSENT, |b| b.0.get())
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0.get() as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// a block whose tag has been checked to be a directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirRef(BlockId);

impl DirRef {
    pub const ROOT: DirRef = DirRef(ROOT_INDEX);

    pub fn block(self) -> BlockId {
        self.0
    }
}

/// a block whose tag has been checked to be an inode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileRef(BlockId);

impl FileRef {
    pub fn block(self) -> BlockId {
        self.0
    }
}

/// whatever a directory slot points at, resolved by reading the block's tag once
#[derive(Debug, Clone)]
pub enum Node {
    Directory(DirRef, DirBlock),
    File(FileRef, Inode),
}

impl Node {
    pub fn decode(block: BlockId, raw: &RawBlock) -> Result<Self> {
        let magic = peek_magic(raw)?;
        match FileKind::from_magic(magic) {
            Some(FileKind::Directory) => Ok(Node::Directory(DirRef(block), DirBlock::decode(raw)?)),
            Some(FileKind::RegularFile) => Ok(Node::File(FileRef(block), Inode::decode(raw)?)),
            None => Err(FsError::Corrupted { block, magic }),
        }
    }

    pub fn block(&self) -> BlockId {
        match self {
            Node::Directory(dir, _) => dir.block(),
            Node::File(file, _) => file.block(),
        }
    }

    pub fn kind(&self) -> FileKind {
        match self {
            Node::Directory(..) => FileKind::Directory,
            Node::File(..) => FileKind::RegularFile,
        }
    }
}

/// read the tag every directory and inode block starts with
pub(crate) fn peek_magic(raw: &RawBlock) -> anyhow::Result<u32> {
    let config = bincode::config::legacy();
    let (magic, _): (u32, usize) = bincode::decode_from_slice(raw, config)?;
    Ok(magic)
}

/// encode `value` at the front of a zeroed block,
/// failing instead of truncating when it doesn't fit
pub(crate) fn encode_block<E: Encode>(value: &E) -> anyhow::Result<RawBlock> {
    let config = bincode::config::legacy();
    let mut raw = [0u8; BLOCK_SIZE];
    bincode::encode_into_slice(value, &mut raw, config)?;
    Ok(raw)
}
