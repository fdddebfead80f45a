//! mount a filesystem image and run the shell on it
use std::{
    io::{self, BufRead, IsTerminal, Write},
    path::Path,
};

use log::info;

use crate::{
    fs::{BasicFileSys, FileSys, ImageDisk, NUM_BLOCKS},
    mkfs::mkfs,
    shell::Shell,
};

/// mount the image at `image_path` and read commands from stdin until it ends;
/// a missing image is created with [NUM_BLOCKS] blocks first
pub fn mount<P>(image_path: P) -> anyhow::Result<()>
where
    P: AsRef<Path>,
{
    let stdin = io::stdin();
    let interactive = stdin.is_terminal();
    run_session(image_path, stdin.lock(), &mut io::stdout().lock(), interactive)
}

/// one mount/shell/unmount cycle over the given input and output
pub fn run_session<P, R, W>(
    image_path: P,
    input: R,
    out: &mut W,
    interactive: bool,
) -> anyhow::Result<()>
where
    P: AsRef<Path>,
    R: BufRead,
    W: Write,
{
    let image_path = image_path.as_ref();
    if !image_path.exists() {
        info!(
            "{} does not exist, creating it with {NUM_BLOCKS} blocks",
            image_path.display()
        );
        mkfs(image_path, NUM_BLOCKS)?;
    }

    let fs = FileSys::mount(BasicFileSys::new(ImageDisk::open(image_path)?))?;
    let mut shell = Shell::new(fs);
    if interactive {
        shell = shell.interactive();
    }
    shell.run(input, out)?;
    shell.into_inner().unmount()?;
    Ok(())
}
