//! Per-object encryption applied while writing.

use std::sync::Arc;

use md5::{Digest, Md5};

use super::{Protection, StreamCipher};

/// Encrypts the strings and streams of individual objects.
///
/// Holds the document key and the injected cipher; each call derives the
/// object key from the object number.
pub struct EncryptionWriteHandler {
    /// The document encryption key
    encryption_key: Vec<u8>,
    cipher: Arc<dyn StreamCipher>,
}

impl EncryptionWriteHandler {
    /// Create a handler from a key and cipher.
    pub fn new(encryption_key: Vec<u8>, cipher: Arc<dyn StreamCipher>) -> Self {
        Self {
            encryption_key,
            cipher,
        }
    }

    /// Create a handler from document protection settings.
    pub fn from_protection(protection: &Protection) -> Self {
        Self::new(protection.document_key.clone(), Arc::clone(&protection.cipher))
    }

    /// Derive the object-specific encryption key.
    ///
    /// MD5 over the document key, the low three bytes of the object number and
    /// the two bytes of the generation number, all little-endian, truncated to
    /// `min(n + 5, 16)` bytes.
    pub fn derive_object_key(&self, obj_num: u32, gen_num: u16) -> Vec<u8> {
        let mut hasher = Md5::new();
        hasher.update(&self.encryption_key);
        hasher.update(&obj_num.to_le_bytes()[..3]);
        hasher.update(gen_num.to_le_bytes());
        let hash = hasher.finalize();

        let key_length = (self.encryption_key.len() + 5).min(16);
        hash[..key_length].to_vec()
    }

    /// Encrypt a string for a specific object.
    pub fn encrypt_string(&self, data: &[u8], obj_num: u32, gen_num: u16) -> Vec<u8> {
        let key = self.derive_object_key(obj_num, gen_num);
        self.cipher.apply(&key, data)
    }

    /// Encrypt a stream for a specific object.
    pub fn encrypt_stream(&self, data: &[u8], obj_num: u32, gen_num: u16) -> Vec<u8> {
        let key = self.derive_object_key(obj_num, gen_num);
        self.cipher.apply(&key, data)
    }
}

impl std::fmt::Debug for EncryptionWriteHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionWriteHandler")
            .field("key_len", &self.encryption_key.len())
            .finish_non_exhaustive()
    }
}
