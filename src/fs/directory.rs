use std::fmt;

use anyhow::{anyhow, Context};
use bincode::{Decode, Encode};

use super::{
    block::{encode_block, peek_magic},
    BlockId, FsError, RawBlock, Result, DIR_MAGIC, MAX_DIR_ENTRIES, MAX_FNAME_SIZE,
};

/// a validated entry name, at most [MAX_FNAME_SIZE] bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileName(String);

impl FileName {
    pub fn new(name: impl AsRef<str>) -> Result<Self> {
        let name = name.as_ref();
        if name.len() > MAX_FNAME_SIZE {
            return Err(FsError::NameTooLong);
        }
        if name.is_empty() || name.contains('\0') {
            return Err(FsError::InvalidName);
        }
        Ok(FileName(name.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    // NUL terminated, like the slot it is stored in
    fn to_raw(&self) -> [u8; MAX_FNAME_SIZE + 1] {
        let mut raw = [0u8; MAX_FNAME_SIZE + 1];
        raw[..self.0.len()].copy_from_slice(self.0.as_bytes());
        raw
    }

    fn from_raw(raw: &[u8; MAX_FNAME_SIZE + 1]) -> anyhow::Result<Self> {
        let len = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
        let name = std::str::from_utf8(&raw[..len]).context("file name is not valid UTF-8")?;
        FileName::new(name).map_err(|e| anyhow!("bad file name {name:?} on disk: {e}"))
    }
}

impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FileName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// an occupied slot of a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: FileName,
    pub block: BlockId,
}

/// a directory block: a fixed table of slots, filled first-free-first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirBlock {
    slots: [Option<DirEntry>; MAX_DIR_ENTRIES],
}

#[derive(Encode, Decode)]
struct RawDirEntry {
    name: [u8; MAX_FNAME_SIZE + 1],
    block: u16,
}

#[derive(Encode, Decode)]
struct RawDirBlock {
    magic: u32,
    num_entries: u32,
    entries: [RawDirEntry; MAX_DIR_ENTRIES],
}

impl Default for DirBlock {
    fn default() -> Self {
        DirBlock {
            slots: std::array::from_fn(|_| None),
        }
    }
}

impl DirBlock {
    /// an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_entries(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.num_entries() == 0
    }

    pub fn is_full(&self) -> bool {
        self.num_entries() >= MAX_DIR_ENTRIES
    }

    /// occupied slots in table order
    pub fn entries(&self) -> impl Iterator<Item = &DirEntry> {
        self.slots.iter().flatten()
    }

    /// the first occupied slot called `name`, as (slot, block)
    pub fn find(&self, name: &FileName) -> Option<(usize, BlockId)> {
        self.find_all(name).next()
    }

    /// every occupied slot called `name`;
    /// a file and a directory may share a name
    pub fn find_all<'a>(
        &'a self,
        name: &'a FileName,
    ) -> impl Iterator<Item = (usize, BlockId)> + 'a {
        self.slots
            .iter()
            .enumerate()
            .filter_map(move |(slot, entry)| match entry {
                Some(entry) if entry.name == *name => Some((slot, entry.block)),
                _ => None,
            })
    }

    /// put an entry in the first free slot and return that slot
    pub fn insert(&mut self, name: FileName, block: BlockId) -> Result<usize> {
        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(FsError::DirectoryFull)?;
        self.slots[slot] = Some(DirEntry { name, block });
        Ok(slot)
    }

    /// clear a slot, handing back what it held
    pub fn remove(&mut self, slot: usize) -> Option<DirEntry> {
        self.slots.get_mut(slot).and_then(Option::take)
    }
}

/// This block is about the on-disk encoding
impl DirBlock {
    pub fn encode(&self) -> anyhow::Result<RawBlock> {
        let raw = RawDirBlock {
            magic: DIR_MAGIC,
            num_entries: self.num_entries() as u32,
            entries: std::array::from_fn(|slot| match &self.slots[slot] {
                Some(entry) => RawDirEntry {
                    name: entry.name.to_raw(),
                    block: BlockId::to_raw(Some(entry.block)),
                },
                None => RawDirEntry {
                    name: [0u8; MAX_FNAME_SIZE + 1],
                    block: BlockId::to_raw(None),
                },
            }),
        };
        encode_block(&raw).context("directory does not fit in a block")
    }

    pub fn decode(raw: &RawBlock) -> anyhow::Result<Self> {
        let magic = peek_magic(raw)?;
        if magic != DIR_MAGIC {
            return Err(anyhow!("expected a directory block, found magic {magic:#x}"));
        }
        let config = bincode::config::legacy();
        let (raw, _): (RawDirBlock, usize) = bincode::decode_from_slice(raw, config)?;

        let mut dir = DirBlock::new();
        for (slot, entry) in raw.entries.iter().enumerate() {
            if let Some(block) = BlockId::from_raw(entry.block) {
                dir.slots[slot] = Some(DirEntry {
                    name: FileName::from_raw(&entry.name)?,
                    block,
                });
            }
        }
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::BLOCK_SIZE;

    fn name(s: &str) -> FileName {
        FileName::new(s).unwrap()
    }

    fn block(i: usize) -> BlockId {
        BlockId::new(i).unwrap()
    }

    #[test]
    fn test_file_name_length() {
        assert!(FileName::new("a".repeat(MAX_FNAME_SIZE)).is_ok());
        assert!(matches!(
            FileName::new("a".repeat(MAX_FNAME_SIZE + 1)),
            Err(FsError::NameTooLong)
        ));
        assert!(matches!(FileName::new(""), Err(FsError::InvalidName)));
        assert!(matches!(FileName::new("a\0b"), Err(FsError::InvalidName)));
    }

    #[test]
    fn test_insert_fills_first_free_slot() {
        let mut dir = DirBlock::new();
        assert_eq!(dir.insert(name("a"), block(2)).unwrap(), 0);
        assert_eq!(dir.insert(name("b"), block(3)).unwrap(), 1);
        assert_eq!(dir.insert(name("c"), block(4)).unwrap(), 2);

        // free the middle slot, the next entry lands there
        assert_eq!(dir.remove(1).map(|e| e.block), Some(block(3)));
        assert_eq!(dir.num_entries(), 2);
        assert_eq!(dir.insert(name("d"), block(5)).unwrap(), 1);

        let names: Vec<_> = dir.entries().map(|e| e.name.to_string()).collect();
        assert_eq!(names, ["a", "d", "c"]);
    }

    #[test]
    fn test_directory_full() {
        let mut dir = DirBlock::new();
        for i in 0..MAX_DIR_ENTRIES {
            dir.insert(name(&format!("f{i}")), block(i + 2)).unwrap();
        }
        assert!(dir.is_full());
        assert!(matches!(
            dir.insert(name("extra"), block(99)),
            Err(FsError::DirectoryFull)
        ));
        assert_eq!(dir.num_entries(), MAX_DIR_ENTRIES);
    }

    #[test]
    fn test_find_returns_first_match() {
        let mut dir = DirBlock::new();
        dir.insert(name("x"), block(2)).unwrap();
        dir.insert(name("same"), block(3)).unwrap();
        dir.insert(name("same"), block(4)).unwrap();

        assert_eq!(dir.find(&name("same")), Some((1, block(3))));
        assert_eq!(dir.find_all(&name("same")).count(), 2);
        assert_eq!(dir.find(&name("nope")), None);
    }

    #[test]
    fn test_directory_encoding() -> anyhow::Result<()> {
        let mut dir = DirBlock::new();
        dir.insert(name("test1.txt"), block(7))?;
        dir.insert(name("sub"), block(8))?;
        dir.remove(0);
        dir.insert(name("again"), block(9))?;

        let raw = dir.encode()?;
        assert_eq!(raw.len(), BLOCK_SIZE);
        assert_eq!(peek_magic(&raw)?, DIR_MAGIC);

        let decoded = DirBlock::decode(&raw)?;
        assert_eq!(decoded, dir);
        assert_eq!(decoded.num_entries(), 2);
        Ok(())
    }

    #[test]
    fn test_decode_rejects_inode_block() {
        let raw = crate::fs::Inode::new().encode().unwrap();
        assert!(DirBlock::decode(&raw).is_err());
    }
}
