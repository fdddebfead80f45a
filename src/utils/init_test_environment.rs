use std::path::PathBuf;

pub const DEFAULT_TEST_IMAGE_DIR: &str = "/tmp";

/// a path for a test image under [DEFAULT_TEST_IMAGE_DIR],
/// with any image a previous run left behind removed
pub fn fresh_image_path(test_name: &str) -> PathBuf {
    let image_path = PathBuf::from(DEFAULT_TEST_IMAGE_DIR).join(format!("blockfs_{test_name}.img"));
    if image_path.exists() {
        std::fs::remove_file(&image_path).expect("Failed to remove old test image");
    }
    image_path
}
