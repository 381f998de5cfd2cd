// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Canonical document fingerprints.

use serde::Serialize;

use crate::StoreError;

/// A 32-byte BLAKE3 hash of a document's canonical CBOR encoding.
///
/// The `Display` impl renders lowercase hex for logs and audit output.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct DocumentHash(pub [u8; 32]);

impl std::fmt::Display for DocumentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Fingerprint any serializable document.
///
/// Documents keep their tag sets sorted and their attachment lists in
/// insertion order, so the CBOR encoding is canonical and equal fingerprints
/// mean byte-for-byte equal documents.
///
/// # Errors
///
/// Returns [`StoreError::Codec`] if the document cannot be encoded.
pub fn fingerprint<T: Serialize + ?Sized>(document: &T) -> Result<DocumentHash, StoreError> {
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(document, &mut bytes)
        .map_err(|err| StoreError::Codec(err.to_string()))?;
    Ok(DocumentHash(*blake3::hash(&bytes).as_bytes()))
}
