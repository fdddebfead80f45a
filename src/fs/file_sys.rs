//! the file system commands available to the shell,
//! every one of them a handful of whole-block reads and writes relative to the current directory
use std::fmt;

use log::{debug, info, warn};

use super::{
    BlockId, BlockStore, DirBlock, DirRef, FileKind, FileName, FileRef, FsError, Inode, Node,
    Result, BLOCK_SIZE, MAX_FILE_SIZE,
};

/// a mounted filesystem and its current directory
#[derive(Debug)]
pub struct FileSys<S: BlockStore> {
    store: S,
    curr_dir: DirRef,
}

/// one line of `ls`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub name: FileName,
    /// `None` when the slot points at a block with an unknown tag
    pub kind: Option<FileKind>,
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind.is_some_and(FileKind::is_dir) {
            write!(f, "{}/", self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

/// what `stat` reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stat {
    Directory {
        name: FileName,
        block: BlockId,
    },
    File {
        inode_block: BlockId,
        size: usize,
        /// the inode block plus every data block
        num_blocks: usize,
        first_block: Option<BlockId>,
    },
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stat::Directory { name, block } => {
                writeln!(f, "Directory name: {name}/")?;
                write!(f, "Directory block: {block}")
            }
            Stat::File {
                inode_block,
                size,
                num_blocks,
                first_block,
            } => {
                writeln!(f, "Inode block: {inode_block}")?;
                writeln!(f, "Bytes in file: {size}")?;
                writeln!(f, "Number of blocks: {num_blocks}")?;
                write!(f, "First block: {}", BlockId::to_raw(*first_block))
            }
        }
    }
}

impl<S: BlockStore> FileSys<S> {
    /// mount the store and start out in the home directory
    pub fn mount(mut store: S) -> Result<Self> {
        store.mount()?;
        info!("filesystem mounted");
        Ok(FileSys {
            store,
            curr_dir: DirRef::ROOT,
        })
    }

    /// unmount the store and hand it back
    pub fn unmount(mut self) -> Result<S> {
        self.store.unmount()?;
        info!("filesystem unmounted");
        Ok(self.store)
    }

    pub fn current_dir(&self) -> DirRef {
        self.curr_dir
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

/// directory commands
impl<S: BlockStore> FileSys<S> {
    /// make a directory
    pub fn mkdir(&mut self, name: &str) -> Result<()> {
        info!("mkdir() called with name: {name:?}");
        let name = FileName::new(name)?;
        let mut dir = self.read_dir(self.curr_dir)?;
        if dir.is_full() {
            return Err(FsError::DirectoryFull);
        }
        // only a directory of the same name is in the way, a file is not
        for (_, block) in dir.find_all(&name) {
            if let Node::Directory(..) = self.read_node(block)? {
                return Err(FsError::DirectoryExists);
            }
        }

        let block = self.allocate()?;
        self.store.write_block(block, &DirBlock::new().encode()?)?;
        dir.insert(name, block)?;
        self.write_dir(self.curr_dir, &dir)?;
        debug!("directory created at block {block}");
        Ok(())
    }

    /// switch to a directory
    pub fn cd(&mut self, name: &str) -> Result<()> {
        info!("cd() called with name: {name:?}");
        let name = FileName::new(name)?;
        let dir = self.read_dir(self.curr_dir)?;
        match self.lookup(&dir, &name)? {
            (_, Node::Directory(target, _)) => {
                self.curr_dir = target;
                Ok(())
            }
            (_, Node::File(..)) => Err(FsError::NotADirectory),
        }
    }

    /// switch to the home directory
    pub fn home(&mut self) {
        info!("home() called");
        self.curr_dir = DirRef::ROOT;
    }

    /// remove an empty directory
    pub fn rmdir(&mut self, name: &str) -> Result<()> {
        info!("rmdir() called with name: {name:?}");
        let name = FileName::new(name)?;
        let mut dir = self.read_dir(self.curr_dir)?;
        let (slot, target) = match self.lookup(&dir, &name)? {
            (slot, Node::Directory(target, contents)) => {
                if !contents.is_empty() {
                    return Err(FsError::DirectoryNotEmpty);
                }
                (slot, target)
            }
            (_, Node::File(..)) => return Err(FsError::NotADirectory),
        };

        self.store.reclaim_block(target.block())?;
        dir.remove(slot);
        self.write_dir(self.curr_dir, &dir)
    }

    /// list the contents of the current directory, in slot order
    pub fn ls(&self) -> Result<Vec<Listing>> {
        info!("ls() called");
        let dir = self.read_dir(self.curr_dir)?;
        dir.entries()
            .map(|entry| -> Result<Listing> {
                let kind = match self.read_node(entry.block) {
                    Ok(node) => Some(node.kind()),
                    Err(e @ FsError::Corrupted { .. }) => {
                        warn!("ls() lists {} without a kind: {e}", entry.name);
                        None
                    }
                    Err(e) => return Err(e),
                };
                Ok(Listing {
                    name: entry.name.clone(),
                    kind,
                })
            })
            .collect()
    }
}

/// file commands
impl<S: BlockStore> FileSys<S> {
    /// create an empty data file
    pub fn create(&mut self, name: &str) -> Result<()> {
        info!("create() called with name: {name:?}");
        let name = FileName::new(name)?;
        let mut dir = self.read_dir(self.curr_dir)?;
        if dir.is_full() {
            return Err(FsError::DirectoryFull);
        }
        if dir.find(&name).is_some() {
            return Err(FsError::FileExists);
        }

        let block = self.allocate()?;
        self.store.write_block(block, &Inode::new().encode()?)?;
        dir.insert(name, block)?;
        self.write_dir(self.curr_dir, &dir)?;
        debug!("inode created at block {block}");
        Ok(())
    }

    /// append data to a data file
    ///
    /// running out of blocks part way keeps what was already written
    pub fn append(&mut self, name: &str, data: &[u8]) -> Result<()> {
        info!(
            "append() called with name: {name:?} and {} bytes",
            data.len()
        );
        let (file, mut inode) = self.open_file(name)?;
        if inode.size() + data.len() > MAX_FILE_SIZE {
            return Err(FsError::FileTooLarge);
        }

        let written = self.write_data(&mut inode, data);
        // the inode records every byte that made it to disk
        self.write_inode(file, &inode)?;
        written
    }

    /// read a whole data file
    pub fn cat(&self, name: &str) -> Result<Vec<u8>> {
        info!("cat() called with name: {name:?}");
        let (_, inode) = self.open_file(name)?;
        self.read_data(&inode, 0)
    }

    /// read the last `n` bytes of a data file, or all of it when it is shorter
    pub fn tail(&self, name: &str, n: usize) -> Result<Vec<u8>> {
        info!("tail() called with name: {name:?} and n: {n}");
        let (_, inode) = self.open_file(name)?;
        let start = inode.size().saturating_sub(n);
        self.read_data(&inode, start)
    }

    /// delete a data file and every block it owns
    pub fn rm(&mut self, name: &str) -> Result<()> {
        info!("rm() called with name: {name:?}");
        let name = FileName::new(name)?;
        let mut dir = self.read_dir(self.curr_dir)?;
        let (slot, file, inode) = match self.lookup(&dir, &name)? {
            (slot, Node::File(file, inode)) => (slot, file, inode),
            (_, Node::Directory(..)) => return Err(FsError::IsADirectory),
        };

        for block in inode.data_blocks() {
            self.store.reclaim_block(block)?;
        }
        self.store.reclaim_block(file.block())?;
        dir.remove(slot);
        self.write_dir(self.curr_dir, &dir)
    }

    /// display stats about file or directory
    pub fn stat(&self, name: &str) -> Result<Stat> {
        info!("stat() called with name: {name:?}");
        let name = FileName::new(name)?;
        let dir = self.read_dir(self.curr_dir)?;
        let stat = match self.lookup(&dir, &name)? {
            (_, Node::Directory(target, _)) => Stat::Directory {
                name,
                block: target.block(),
            },
            (_, Node::File(file, inode)) => Stat::File {
                inode_block: file.block(),
                size: inode.size(),
                num_blocks: inode.block_count(),
                first_block: inode.first_block(),
            },
        };
        Ok(stat)
    }
}

/// helpers
impl<S: BlockStore> FileSys<S> {
    fn read_node(&self, block: BlockId) -> Result<Node> {
        let raw = self.store.read_block(block)?;
        Node::decode(block, &raw)
    }

    fn read_dir(&self, dir: DirRef) -> Result<DirBlock> {
        let raw = self.store.read_block(dir.block())?;
        Ok(DirBlock::decode(&raw)?)
    }

    fn write_dir(&mut self, dir: DirRef, contents: &DirBlock) -> Result<()> {
        self.store.write_block(dir.block(), &contents.encode()?)?;
        Ok(())
    }

    fn write_inode(&mut self, file: FileRef, inode: &Inode) -> Result<()> {
        self.store.write_block(file.block(), &inode.encode()?)?;
        Ok(())
    }

    /// the first slot called `name`, and what it points at
    fn lookup(&self, dir: &DirBlock, name: &FileName) -> Result<(usize, Node)> {
        let (slot, block) = dir.find(name).ok_or(FsError::NotFound)?;
        Ok((slot, self.read_node(block)?))
    }

    /// look a data file up in the current directory
    fn open_file(&self, name: &str) -> Result<(FileRef, Inode)> {
        let name = FileName::new(name)?;
        let dir = self.read_dir(self.curr_dir)?;
        match self.lookup(&dir, &name)? {
            (_, Node::File(file, inode)) => Ok((file, inode)),
            (_, Node::Directory(..)) => Err(FsError::IsADirectory),
        }
    }

    fn allocate(&mut self) -> Result<BlockId> {
        self.store.get_free_block()?.ok_or(FsError::DiskFull)
    }

    /// fill the free tail of the last data block, then as many new blocks as it takes
    fn write_data(&mut self, inode: &mut Inode, mut data: &[u8]) -> Result<()> {
        while !data.is_empty() {
            let (block, space) = match inode.last_block() {
                Some(block) if inode.tail_space() > 0 => (block, inode.tail_space()),
                _ => {
                    let block = self.allocate()?;
                    inode.add_block(block)?;
                    (block, BLOCK_SIZE)
                }
            };
            let offset = BLOCK_SIZE - space;
            let len = space.min(data.len());

            let mut raw = self.store.read_block(block)?;
            raw[offset..offset + len].copy_from_slice(&data[..len]);
            self.store.write_block(block, &raw)?;

            inode.increment_size(len);
            data = &data[len..];
        }
        Ok(())
    }

    /// the file's bytes from `start` to the end, reading each block once
    fn read_data(&self, inode: &Inode, start: usize) -> Result<Vec<u8>> {
        let wanted = inode.size() - start;
        let mut content = Vec::with_capacity(wanted);
        let mut offset = start % BLOCK_SIZE;
        for block in inode.data_blocks().skip(start / BLOCK_SIZE) {
            if content.len() == wanted {
                break;
            }
            let raw = self.store.read_block(block)?;
            let len = (BLOCK_SIZE - offset).min(wanted - content.len());
            content.extend_from_slice(&raw[offset..offset + len]);
            offset = 0;
        }
        Ok(content)
    }
}
