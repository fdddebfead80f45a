//! our block-addressed filesystem
pub mod bitmap;
pub mod block;
pub mod block_store;
pub mod device;
pub mod directory;
pub mod error;
pub mod file_sys;
pub mod filekind;
pub mod inode;
pub mod superblock;
pub use bitmap::*;
pub use block::*;
pub use block_store::*;
pub use device::*;
pub use directory::*;
pub use error::*;
pub use file_sys::*;
pub use filekind::*;
pub use inode::*;
pub use superblock::*;

/// size of every block on the device, in bytes
pub const BLOCK_SIZE: usize = 512;
/// block count of a default image
pub const NUM_BLOCKS: usize = 1024;
/// smallest device: the superblock and the root directory
pub const MIN_BLOCK_COUNT: usize = 2;
/// the free bitmap has to fit in the superblock
pub const MAX_BLOCK_COUNT: usize = 2048;
/// longest file name, in bytes
pub const MAX_FNAME_SIZE: usize = 9;
pub const MAX_DIR_ENTRIES: usize = 10;
pub const MAX_DATA_BLOCKS: usize = 60;
pub const MAX_FILE_SIZE: usize = MAX_DATA_BLOCKS * BLOCK_SIZE;

pub const DIR_MAGIC: u32 = 0xFFFF_FFFF;
pub const INODE_MAGIC: u32 = 0xFFFF_FFFE;
const FS_MAGIC: u32 = 0x1324a;

/// raw on-disk index meaning "no block"
pub const ABSENT: u16 = 0;
const SUPERBLOCK_INDEX: usize = 0;
