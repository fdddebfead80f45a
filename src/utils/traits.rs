use anyhow::anyhow;
use serde::{de::DeserializeOwned, Serialize};

/// Trait for digesting an object which stores digest in the object itself
pub trait DigestInSelf {
    fn digest(&mut self);
    fn verify_digest(&mut self) -> bool;
}

/// Trait for serializing and deserializing an object which stores digest in the object itself
/// # Note
/// This trait is implemented for types implementing
/// [Serialize] and [DeserializeOwned] and [DigestInSelf]
pub trait SerializeAndDigest: Serialize + DeserializeOwned + DigestInSelf {
    /// serialize into a [Vec](std::vec::Vec), refreshing the digest first
    fn serialize(&mut self) -> anyhow::Result<Vec<u8>> {
        self.digest();
        let config = bincode::config::legacy();
        bincode::serde::encode_to_vec(&*self, config).map_err(|e| e.into())
    }

    /// deserialize from a slice, trailing bytes are ignored
    /// # Returns
    /// A tuple containing the deserialized object and the number of bytes read
    fn deserialize(buf: &[u8]) -> anyhow::Result<(Self, usize)> {
        // a garbage length prefix must not turn into a huge allocation
        let config = bincode::config::legacy().with_limit::<{ 1 << 20 }>();
        let (mut object, bytes_read): (Self, usize) =
            bincode::serde::decode_from_slice(buf, config)?;
        if !object.verify_digest() {
            Err(anyhow!("deserialized object digest verification failed"))
        } else {
            Ok((object, bytes_read))
        }
    }
}
