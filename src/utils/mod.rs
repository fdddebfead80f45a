pub mod digest;
pub mod fs_size_calculator;
#[cfg(test)]
pub mod init_test_environment;
pub mod traits;
