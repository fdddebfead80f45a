use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::utils::{
    digest,
    traits::{DigestInSelf, SerializeAndDigest},
};

use super::{FreeMap, RawBlock, BLOCK_SIZE, FS_MAGIC};

/// The superblock of this filesystem, kept in block 0
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SuperBlock {
    /// magic number
    pub magic: u32,
    /// data block size
    pub block_size: u32,
    pub block_count: u32,
    pub free_blocks_count: u32,
    /// one bit per block, set when the block is in use
    pub bitmap: Vec<u8>,
    /// to verify the integrity of this superblock
    /// intend to use a fast secure hash function,like [blake3]
    pub digest: [u8; 32],
}

impl SuperBlock {
    pub fn new(free_map: &FreeMap) -> Self {
        let mut superblock = Self {
            magic: FS_MAGIC,
            block_size: BLOCK_SIZE as u32,
            block_count: free_map.block_count() as u32,
            free_blocks_count: free_map.free_blocks() as u32,
            bitmap: free_map.as_raw_slice().to_vec(),
            digest: [0u8; 32],
        };
        superblock.digest();
        superblock
    }

    /// the free map this superblock describes
    pub fn free_map(&self) -> anyhow::Result<FreeMap> {
        let free_map = FreeMap::from_raw(&self.bitmap, self.block_count as usize)?;
        if free_map.free_blocks() != self.free_blocks_count as usize {
            return Err(anyhow!(
                "superblock counts {} free blocks but its bitmap has {}",
                self.free_blocks_count,
                free_map.free_blocks()
            ));
        }
        Ok(free_map)
    }

    /// serialize into the front of a zeroed block
    pub fn to_block(&mut self) -> anyhow::Result<RawBlock> {
        let serialized = SerializeAndDigest::serialize(self)?;
        if serialized.len() > BLOCK_SIZE {
            return Err(anyhow!(
                "superblock takes {} bytes, more than one block",
                serialized.len()
            ));
        }
        let mut raw = [0u8; BLOCK_SIZE];
        raw[..serialized.len()].copy_from_slice(&serialized);
        Ok(raw)
    }

    /// `Err` when block 0 doesn't hold a superblock of this filesystem
    pub fn from_block(raw: &RawBlock) -> anyhow::Result<Self> {
        let (superblock, _) = <SuperBlock as SerializeAndDigest>::deserialize(raw)?;
        if superblock.magic != FS_MAGIC {
            return Err(anyhow!("bad filesystem magic {:#x}", superblock.magic));
        }
        if superblock.block_size != BLOCK_SIZE as u32 {
            return Err(anyhow!(
                "image was made with {} byte blocks, expected {BLOCK_SIZE}",
                superblock.block_size
            ));
        }
        Ok(superblock)
    }
}

impl DigestInSelf for SuperBlock {
    fn digest(&mut self) {
        self.digest = [0u8; 32];
        self.digest = digest::digest(self).expect("calculate digest failed");
    }

    fn verify_digest(&mut self) -> bool {
        // get digest from itself
        let digest = self.digest;
        // clear the digest from struct
        self.digest = [0u8; 32];
        // calulate the digest
        let Ok(digest2) = digest::digest(self) else {
            self.digest = digest;
            return false;
        };
        // verify
        let ok = digest == digest2;
        // store newest digest to itself
        self.digest = digest2;
        // return verify result
        ok
    }
}

impl SerializeAndDigest for SuperBlock {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_superblock_round_trip() -> anyhow::Result<()> {
        let mut free_map = FreeMap::formatted(64)?;
        free_map.allocate();
        let mut superblock = SuperBlock::new(&free_map);

        let raw = superblock.to_block()?;
        let restored = SuperBlock::from_block(&raw)?;
        assert_eq!(restored, superblock);
        assert_eq!(restored.free_map()?, free_map);
        assert_eq!(restored.free_blocks_count, 61);
        Ok(())
    }

    #[test]
    fn test_largest_superblock_fits() {
        let free_map = FreeMap::formatted(crate::fs::MAX_BLOCK_COUNT).unwrap();
        assert!(SuperBlock::new(&free_map).to_block().is_ok());
    }

    #[test]
    fn test_tampered_superblock_is_rejected() {
        let free_map = FreeMap::formatted(64).unwrap();
        let mut raw = SuperBlock::new(&free_map).to_block().unwrap();
        // flip a bit inside the bitmap bytes
        raw[30] ^= 0x01;
        assert!(SuperBlock::from_block(&raw).is_err());
    }

    #[test]
    fn test_zeroed_block_is_not_a_superblock() {
        assert!(SuperBlock::from_block(&[0u8; BLOCK_SIZE]).is_err());
    }
}
