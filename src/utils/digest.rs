use anyhow::Context;
use bincode::config;
use serde::Serialize;

/// cacluate [blake3] hash of a serilizeable object, over its bincode encoding
pub fn digest<T: Serialize>(t: &T) -> anyhow::Result<[u8; 32]> {
    let config = config::legacy();
    let encoded = bincode::serde::encode_to_vec(t, config).context("encode for digest failed")?;
    Ok(*blake3::hash(&encoded).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_depends_on_content() {
        let a = digest(&(1u32, vec![1u8, 2, 3])).unwrap();
        let b = digest(&(1u32, vec![1u8, 2, 3])).unwrap();
        let c = digest(&(1u32, vec![1u8, 2, 4])).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
