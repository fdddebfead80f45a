use clap::Parser;

use crate::fs::NUM_BLOCKS;

#[derive(Parser, Debug, PartialEq)]
#[command(author, version, about, long_about)]
pub enum BlockFsCli {
    /// create a new file system image
    Mkfs(MkfsArgs),
    /// mount a file system image and open a shell on it
    Mount(MountArgs),
}
///make a new fs subcommand
#[derive(clap::Args, Debug, PartialEq)]
#[command(author, version, about = "make a new file system")]
pub struct MkfsArgs {
    /// the path of the file system image file
    #[clap(short = 'p', long)]
    pub image_file_path: String,
    /// the number of blocks in the file system
    #[clap(short, long, default_value_t = NUM_BLOCKS)]
    pub block_count: usize,
}

/// mount a fs subcommand
#[derive(clap::Args, Debug, PartialEq)]
#[command(author, version, about = "mount a file system and run the shell")]
pub struct MountArgs {
    /// the path of the file system image file, created when missing
    #[clap(short = 'p', long)]
    pub image_file_path: String,
}

/// test the `BlockFsCli` struct
/// test `mkfs` subcommand
#[cfg(test)]
mod mkfs_parse_args_tests {
    use super::*;
    /// test short parameter form
    #[test]
    fn test_short_parameter_form() {
        let args = BlockFsCli::parse_from(["blockfs", "mkfs", "-p", "test", "-b", "64"]);
        assert_eq!(
            args,
            BlockFsCli::Mkfs(MkfsArgs {
                image_file_path: "test".to_string(),
                block_count: 64,
            })
        );
    }
    /// test long parameter form
    #[test]
    fn test_long_parameter_form() {
        let image_file_path_name = concat!("--", "image-file-path");
        let args = BlockFsCli::parse_from([
            "blockfs",
            "mkfs",
            image_file_path_name,
            "test",
            "--block-count",
            "2048",
        ]);
        assert_eq!(
            args,
            BlockFsCli::Mkfs(MkfsArgs {
                image_file_path: "test".to_string(),
                block_count: 2048,
            })
        );
    }
    /// the block count falls back to the default image size
    #[test]
    fn test_default_block_count() {
        let args = BlockFsCli::parse_from(["blockfs", "mkfs", "-p", "test"]);
        assert_eq!(
            args,
            BlockFsCli::Mkfs(MkfsArgs {
                image_file_path: "test".to_string(),
                block_count: NUM_BLOCKS,
            })
        );
    }
    #[test]
    fn test_missing_image_path() {
        assert!(BlockFsCli::try_parse_from(["blockfs", "mkfs", "-b", "64"]).is_err());
    }
}
