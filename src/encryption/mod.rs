//! Document encryption seam.
//!
//! The generator does not ship a cipher. Callers inject one through
//! [`StreamCipher`]; the writer derives a per-object key from the document key
//! and pushes every string and stream payload through it.
//!
//! The encryption dictionary follows the Standard security handler layout
//! (`/Filter /Standard /V 1 /R 2`). The owner and user entries are computed by
//! the caller together with the document key.

use std::fmt;
use std::sync::Arc;

mod write_handler;

pub use write_handler::EncryptionWriteHandler;

/// Keyed stream cipher applied to string and stream payloads.
///
/// `object_key` is already derived for the object being written.
pub trait StreamCipher: Send + Sync {
    /// Transform `data` with the given per-object key.
    fn apply(&self, object_key: &[u8], data: &[u8]) -> Vec<u8>;
}

bitflags::bitflags! {
    /// User access permissions stored in the `/P` entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Permissions: u32 {
        /// Print the document
        const PRINT = 1 << 2;
        /// Modify contents
        const MODIFY = 1 << 3;
        /// Copy text and graphics
        const COPY = 1 << 4;
        /// Add or modify annotations and form fields
        const ANNOT_FORMS = 1 << 5;
    }
}

impl Permissions {
    /// Signed `/P` value for revision 2 of the Standard handler.
    ///
    /// Bits 7 and 8 are always set; every bit above the low byte is set.
    pub fn p_value(self) -> i32 {
        let protection = (192 | self.bits()) as i32;
        -((protection ^ 255) + 1)
    }
}

/// Encryption settings for a document.
#[derive(Clone)]
pub struct Protection {
    /// Injected cipher
    pub cipher: Arc<dyn StreamCipher>,
    /// Document encryption key
    pub document_key: Vec<u8>,
    /// `/O` entry
    pub owner_entry: Vec<u8>,
    /// `/U` entry
    pub user_entry: Vec<u8>,
    /// Granted permissions
    pub permissions: Permissions,
}

impl Protection {
    /// Bundle a cipher with precomputed Standard handler values.
    pub fn new(
        cipher: Arc<dyn StreamCipher>,
        document_key: Vec<u8>,
        owner_entry: Vec<u8>,
        user_entry: Vec<u8>,
        permissions: Permissions,
    ) -> Self {
        Self {
            cipher,
            document_key,
            owner_entry,
            user_entry,
            permissions,
        }
    }
}

impl fmt::Debug for Protection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Protection")
            .field("document_key_len", &self.document_key.len())
            .field("permissions", &self.permissions)
            .finish_non_exhaustive()
    }
}
