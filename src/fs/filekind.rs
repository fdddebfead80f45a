use super::{DIR_MAGIC, INODE_MAGIC};

/// an enum to describe the type of a file,
/// told apart on disk by the magic number at the front of its block
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FileKind {
    /// a data file, whose block is its inode
    RegularFile,
    /// a directory block
    Directory,
}

impl FileKind {
    /// the tag written at the front of blocks of this kind
    pub const fn magic(self) -> u32 {
        match self {
            FileKind::RegularFile => INODE_MAGIC,
            FileKind::Directory => DIR_MAGIC,
        }
    }

    /// `None` for data blocks, zeroed blocks and garbage
    pub const fn from_magic(magic: u32) -> Option<Self> {
        match magic {
            DIR_MAGIC => Some(FileKind::Directory),
            INODE_MAGIC => Some(FileKind::RegularFile),
            _ => None,
        }
    }

    pub fn is_dir(self) -> bool {
        self == FileKind::Directory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic_round_trip() {
        for kind in [FileKind::RegularFile, FileKind::Directory] {
            assert_eq!(FileKind::from_magic(kind.magic()), Some(kind));
        }
        assert_ne!(DIR_MAGIC, INODE_MAGIC);
    }

    #[test]
    fn test_unknown_magic() {
        assert_eq!(FileKind::from_magic(0), None);
        assert_eq!(FileKind::from_magic(0x1234_5678), None);
    }
}
