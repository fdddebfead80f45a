//! create our filesystem
use std::path::Path;

use anyhow::anyhow;
use byte_unit::{Byte, ByteUnit};
use log::info;

use crate::{
    fs::{BasicFileSys, ImageDisk, BLOCK_SIZE, MAX_BLOCK_COUNT, MIN_BLOCK_COUNT},
    utils::fs_size_calculator,
};

/// create a new filesystem,given the path of the image file and its block count
/// # Params
/// - `image_file_path`: the path of the image file, which must not exist yet
/// - `block_count`: the number of blocks in the filesystem
///
/// # Return
/// an [anyhow::Result] type to indicate whether the operation is successful
pub fn mkfs<P>(image_file_path: P, block_count: usize) -> anyhow::Result<()>
where
    P: AsRef<Path>,
{
    // the superblock and the root directory need a block each,
    // and the free block bitmap has to fit in the superblock
    if !(MIN_BLOCK_COUNT..=MAX_BLOCK_COUNT).contains(&block_count) {
        return Err(anyhow!(format!(
            "Block count must be between {MIN_BLOCK_COUNT} ({}) and {MAX_BLOCK_COUNT} ({}) for block size {}, got {block_count}",
            Byte::from_bytes(fs_size_calculator::image_size(MIN_BLOCK_COUNT) as _)
                .get_appropriate_unit(true),
            Byte::from_bytes(fs_size_calculator::image_size(MAX_BLOCK_COUNT) as _)
                .get_appropriate_unit(true),
            Byte::from_bytes(BLOCK_SIZE as _).get_adjusted_unit(ByteUnit::B),
        )));
    }

    let image_file_path = image_file_path.as_ref();
    let mut store = BasicFileSys::new(ImageDisk::create(image_file_path, block_count)?);
    store.format()?;
    info!(
        "created {} with {block_count} blocks ({})",
        image_file_path.display(),
        Byte::from_bytes(fs_size_calculator::image_size(block_count) as _)
            .get_appropriate_unit(true)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        fs::{BlockDevice, FileSys},
        utils::init_test_environment::fresh_image_path,
    };

    #[test]
    fn test_mkfs() {
        let tmp_file = fresh_image_path("mkfs");
        let block_count = 128;
        mkfs(&tmp_file, block_count).unwrap();

        // test if the image has the right size
        let disk = ImageDisk::open(&tmp_file).unwrap();
        assert_eq!(disk.block_count(), block_count);
        assert_eq!(
            std::fs::metadata(&tmp_file).unwrap().len(),
            fs_size_calculator::image_size(block_count)
        );

        // test if root directory "/" is created correctly
        let fs = FileSys::mount(BasicFileSys::new(disk)).unwrap();
        assert!(fs.ls().unwrap().is_empty());
        assert_eq!(fs.store().free_blocks().unwrap(), block_count - 2);
        drop(fs);

        // an existing image is never overwritten
        assert!(mkfs(&tmp_file, block_count).is_err());

        // remove test file
        std::fs::remove_file(&tmp_file).unwrap()
    }

    #[test]
    fn test_mkfs_block_count_bounds() {
        let tmp_file = fresh_image_path("mkfs_bounds");
        let err = mkfs(&tmp_file, MIN_BLOCK_COUNT - 1).unwrap_err();
        assert!(err.to_string().starts_with("Block count must be between"));
        assert!(mkfs(&tmp_file, MAX_BLOCK_COUNT + 1).is_err());
        // nothing was created
        assert!(!tmp_file.exists());
    }
}
