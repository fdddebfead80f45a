//! command line arguments of the `blockfs` binary
mod cli_struct;
pub use cli_struct::*;
