use thiserror::Error;

use super::BlockId;

/// every way a filesystem operation can fail,
/// displayed as the message the shell prints for it
#[derive(Error, Debug)]
pub enum FsError {
    #[error("File name is too long")]
    NameTooLong,
    /// empty names and names with NUL bytes can't be stored in a slot
    #[error("Invalid file name")]
    InvalidName,
    #[error("Directory is full")]
    DirectoryFull,
    #[error("Directory exists")]
    DirectoryExists,
    #[error("File exists")]
    FileExists,
    #[error("Disk is full")]
    DiskFull,
    #[error("File does not exist")]
    NotFound,
    #[error("File is not a directory")]
    NotADirectory,
    #[error("File is a directory")]
    IsADirectory,
    #[error("Directory is not empty")]
    DirectoryNotEmpty,
    #[error("Append exceeds maximum file size")]
    FileTooLarge,
    /// a directory slot points at a block carrying neither tag
    #[error("Block {block} has an unknown magic number {magic:#x}")]
    Corrupted { block: BlockId, magic: u32 },
    /// the block store underneath failed
    #[error("Block store error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, FsError>;
