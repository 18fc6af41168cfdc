//! Record metadata and the additional data that binds data-key blinding to
//! it.
//!
//! A payload key is only decryptable for the local pseudonym and the bound
//! metadata entries it was blinded under; `key_blinding_additional_data`
//! computes the context bytes that make that binding. Three generations of
//! the computation exist; only V3 is produced for new writes, V1 and V2 are
//! accepted for legacy reads.

use std::collections::BTreeMap;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CryptoError;
use crate::pseudonym::LocalPseudonym;

const NONCE_BYTES: usize = 12;

/// Method by which payloads are encrypted and how their metadata is
/// cryptographically bound into key blinding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncryptionScheme {
    /// Legacy scheme relying on an unstable structured serialization of the
    /// metadata. Accepted for reads only; the encoding is frozen.
    V1,
    /// Stable serialization of timestamp and tag.
    V2,
    /// Binds the local pseudonym and the bound metadata entries, and moves
    /// the inversion from unblinding to blinding.
    V3,
}

/// The scheme used for new writes.
pub const LATEST_SCHEME: EncryptionScheme = EncryptionScheme::V3;

impl EncryptionScheme {
    pub fn tag(&self) -> u64 {
        match self {
            EncryptionScheme::V1 => 0,
            EncryptionScheme::V2 => 1,
            EncryptionScheme::V3 => 2,
        }
    }

    pub fn from_tag(tag: u64) -> Result<Self, CryptoError> {
        match tag {
            0 => Ok(EncryptionScheme::V1),
            1 => Ok(EncryptionScheme::V2),
            2 => Ok(EncryptionScheme::V3),
            other => Err(CryptoError::UnknownScheme(other)),
        }
    }
}

/// Extra metadata entry; its payload may be in plaintext or encrypted form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataXEntry {
    payload: Vec<u8>,
    store_encrypted: bool,
    is_encrypted: bool,
    bound: bool,
}

impl MetadataXEntry {
    /// Entry as read back from storage.
    pub fn from_stored(payload: impl Into<Vec<u8>>, encrypted: bool, bound: bool) -> Self {
        MetadataXEntry {
            payload: payload.into(),
            store_encrypted: encrypted,
            is_encrypted: encrypted,
            bound,
        }
    }

    /// Fresh plaintext entry.
    pub fn from_plaintext(plaintext: impl Into<Vec<u8>>, store_encrypted: bool, bound: bool) -> Self {
        MetadataXEntry {
            payload: plaintext.into(),
            store_encrypted,
            is_encrypted: false,
            bound,
        }
    }

    pub fn store_encrypted(&self) -> bool {
        self.store_encrypted
    }

    pub fn is_encrypted(&self) -> bool {
        self.is_encrypted
    }

    /// Whether this entry participates in key-blinding additional data.
    pub fn bound(&self) -> bool {
        self.bound
    }

    /// Payload in the form it is stored in. Requires `prepare_for_store`
    /// when the entry wants encryption at rest.
    pub fn payload_for_store(&self) -> Result<&[u8], CryptoError> {
        if self.store_encrypted && !self.is_encrypted {
            return Err(CryptoError::MetadataEntryState("not encrypted yet"));
        }
        Ok(&self.payload)
    }

    /// Decrypted payload. Requires `prepare_plaintext` first.
    pub fn plaintext(&self) -> Result<&[u8], CryptoError> {
        if self.is_encrypted {
            return Err(CryptoError::MetadataEntryState("not decrypted yet"));
        }
        Ok(&self.payload)
    }

    /// A copy with the payload encrypted, if this entry wants encryption at
    /// rest. The stored form is `nonce ∥ ciphertext`.
    pub fn prepare_for_store(
        &self,
        aes_key: &[u8; 32],
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<Self, CryptoError> {
        let mut result = self.clone();
        if result.store_encrypted && !result.is_encrypted {
            let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(aes_key));
            let mut nonce = [0u8; NONCE_BYTES];
            rng.fill_bytes(&mut nonce);
            let ciphertext = cipher
                .encrypt(Nonce::from_slice(&nonce), result.payload.as_slice())
                .map_err(|_| CryptoError::Aead)?;
            result.payload = nonce.iter().copied().chain(ciphertext).collect();
            result.is_encrypted = true;
        }
        Ok(result)
    }

    /// A copy with the payload decrypted.
    pub fn prepare_plaintext(&self, aes_key: &[u8; 32]) -> Result<Self, CryptoError> {
        let mut result = self.clone();
        if result.is_encrypted {
            if result.payload.len() < NONCE_BYTES {
                return Err(CryptoError::Aead);
            }
            let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(aes_key));
            let plaintext = {
                let (nonce, ciphertext) = result.payload.split_at(NONCE_BYTES);
                cipher
                    .decrypt(Nonce::from_slice(nonce), ciphertext)
                    .map_err(|_| CryptoError::Aead)?
            };
            result.payload = plaintext;
            result.is_encrypted = false;
        }
        Ok(result)
    }
}

/// The additional data to bind into a data-key blinding, and whether the
/// blinding uses the inverse of the derived component.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyBlindingAdditionalData {
    pub content: Vec<u8>,
    pub invert_component: bool,
}

/// Metadata of one stored record.
///
/// `extra` is a sorted map: V3 additional data iterates entries in
/// ascending key order, and that order must be stable across processes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Milliseconds since the Unix epoch at blinding time.
    pub blinding_timestamp: u64,
    pub tag: String,
    pub encryption_scheme: EncryptionScheme,
    pub original_payload_entry_id: Option<String>,
    pub extra: BTreeMap<String, MetadataXEntry>,
}

impl Metadata {
    pub fn new(tag: impl Into<String>, blinding_timestamp: u64) -> Self {
        Metadata {
            blinding_timestamp,
            tag: tag.into(),
            encryption_scheme: LATEST_SCHEME,
            original_payload_entry_id: None,
            extra: BTreeMap::new(),
        }
    }

    /// A copy holding only the entries that are bound into key blinding.
    pub fn bound_only(&self) -> Self {
        Metadata {
            blinding_timestamp: self.blinding_timestamp,
            tag: self.tag.clone(),
            encryption_scheme: self.encryption_scheme,
            original_payload_entry_id: None,
            extra: self
                .extra
                .iter()
                .filter(|(_, entry)| entry.bound())
                .map(|(name, entry)| (name.clone(), entry.clone()))
                .collect(),
        }
    }

    /// A copy with every entry decrypted.
    pub fn decrypt(&self, aes_key: &[u8; 32]) -> Result<Self, CryptoError> {
        let mut result = self.clone();
        for entry in result.extra.values_mut() {
            *entry = entry.prepare_plaintext(aes_key)?;
        }
        Ok(result)
    }

    /// A copy with every entry in its storable form.
    pub fn prepare_for_store(
        &self,
        aes_key: &[u8; 32],
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<Self, CryptoError> {
        let mut result = self.clone();
        for entry in result.extra.values_mut() {
            *entry = entry.prepare_for_store(aes_key, rng)?;
        }
        Ok(result)
    }

    /// Compute the additional data binding this metadata (and, from V3 on,
    /// the local pseudonym) into the data-key blinding.
    pub fn key_blinding_additional_data(
        &self,
        local_pseudonym: &LocalPseudonym,
    ) -> Result<KeyBlindingAdditionalData, CryptoError> {
        match self.encryption_scheme {
            EncryptionScheme::V1 => {
                let mut hasher = Sha256::new();
                hasher.update(local_pseudonym.pack());
                hasher.update(self.legacy_v1_bytes());
                Ok(KeyBlindingAdditionalData {
                    content: hasher.finalize().to_vec(),
                    invert_component: false,
                })
            }
            EncryptionScheme::V2 => {
                let mut content = Vec::new();
                content.extend_from_slice(&EncryptionScheme::V2.tag().to_be_bytes());
                content.extend_from_slice(&self.blinding_timestamp.to_be_bytes());
                content.extend_from_slice(&(self.tag.len() as u64).to_be_bytes());
                content.extend_from_slice(self.tag.as_bytes());
                Ok(KeyBlindingAdditionalData {
                    content,
                    invert_component: false,
                })
            }
            EncryptionScheme::V3 => {
                let mut content = Vec::new();
                content.extend_from_slice(&EncryptionScheme::V3.tag().to_be_bytes());
                content.extend_from_slice(&self.blinding_timestamp.to_be_bytes());
                content.extend_from_slice(&(self.tag.len() as u64).to_be_bytes());
                content.extend_from_slice(self.tag.as_bytes());
                content.extend_from_slice(&local_pseudonym.pack());

                // For backwards compatibility nothing more is appended when
                // there are no bound entries. Iteration is in ascending key
                // order.
                for (name, entry) in &self.extra {
                    if !entry.bound() {
                        continue;
                    }
                    let payload = entry.payload_for_store()?;
                    content.extend_from_slice(&(name.len() as u64).to_be_bytes());
                    content.extend_from_slice(name.as_bytes());
                    content.extend_from_slice(&(payload.len() as u64).to_be_bytes());
                    content.extend_from_slice(payload);
                    content.push(entry.store_encrypted() as u8);
                }

                Ok(KeyBlindingAdditionalData {
                    content,
                    invert_component: true,
                })
            }
        }
    }

    /// Frozen legacy encoding feeding the V1 digest. Must never change:
    /// deployments still reading V1 blobs depend on it bit-for-bit.
    fn legacy_v1_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.blinding_timestamp.to_be_bytes());
        out.extend_from_slice(&(self.tag.len() as u64).to_be_bytes());
        out.extend_from_slice(self.tag.as_bytes());
        match &self.original_payload_entry_id {
            Some(id) => {
                out.push(1);
                out.extend_from_slice(&(id.len() as u64).to_be_bytes());
                out.extend_from_slice(id.as_bytes());
            }
            None => out.push(0),
        }
        for (name, entry) in &self.extra {
            out.extend_from_slice(&(name.len() as u64).to_be_bytes());
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(&(entry.payload.len() as u64).to_be_bytes());
            out.extend_from_slice(&entry.payload);
            out.push(entry.store_encrypted as u8);
            out.push(entry.bound as u8);
        }
        out
    }
}
