use blockfs::cli_interface::BlockFsCli;
use clap::Parser;
/// a CLI interface to users to choose create our filesystem,
/// or mount it and work on it through the shell.
///
/// The latter reads commands from stdin until it ends or `quit` is given.
fn main() -> anyhow::Result<()> {
    env_logger::builder().format_timestamp_nanos().init();
    let args = BlockFsCli::parse();
    match args {
        BlockFsCli::Mkfs(args) => {
            //create a new file system
            blockfs::mkfs::mkfs(args.image_file_path, args.block_count)?;
        }
        BlockFsCli::Mount(args) => {
            //if it is a `mount` subcommand
            blockfs::mount::mount(args.image_file_path)?;
        }
    }
    Ok(())
}
