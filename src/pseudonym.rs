//! The wrapper types the pipeline hands around: polymorphic and local
//! pseudonyms, their encrypted forms, and encrypted payload keys.
//!
//! Wrapping enforces the validity invariants once, at the boundary: a
//! pseudonym is never the identity element and an encryption wrapped as a
//! pseudonym or key never carries a zero public key.

use rand::{CryptoRng, RngCore};

use crate::curve::{GroupElement, Scalar, PACKED_BYTES};
use crate::elgamal::{Encryption, ENCRYPTION_PACKED_BYTES};
use crate::error::CryptoError;

/// Anything that can stand at the input of a pseudonym translation step.
pub trait AsEncryptedPseudonym {
    fn encryption(&self) -> &Encryption;
}

/// A recipient-local pseudonym: the non-identity group element obtained by
/// fully translating and decrypting a polymorphic pseudonym. Stable per
/// (recipient, identifier).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalPseudonym(GroupElement);

impl LocalPseudonym {
    pub fn new(point: GroupElement) -> Result<Self, CryptoError> {
        if point.is_identity() {
            return Err(CryptoError::InvalidPseudonym);
        }
        Ok(LocalPseudonym(point))
    }

    /// A uniformly random local pseudonym.
    pub fn random(rng: &mut (impl RngCore + CryptoRng)) -> Self {
        loop {
            let point = GroupElement::random(rng);
            if !point.is_identity() {
                return LocalPseudonym(point);
            }
        }
    }

    pub fn point(&self) -> &GroupElement {
        &self.0
    }

    pub fn pack(&self) -> [u8; PACKED_BYTES] {
        self.0.pack()
    }

    pub fn from_packed(packed: &[u8; PACKED_BYTES]) -> Result<Self, CryptoError> {
        Self::new(GroupElement::from_packed(packed)?)
    }

    pub fn to_text(&self) -> String {
        self.0.to_text()
    }

    pub fn from_text(text: &str) -> Result<Self, CryptoError> {
        Self::new(GroupElement::from_text(text)?)
    }

    /// Re-encrypt this pseudonym under `pk`, e.g. for storage at a server
    /// that should not see it in the clear.
    pub fn encrypt(
        &self,
        pk: &GroupElement,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<EncryptedLocalPseudonym, CryptoError> {
        EncryptedLocalPseudonym::new(Encryption::encrypt(pk, &self.0, rng)?)
    }
}

/// A participant's polymorphic pseudonym: the ElGamal encryption, under the
/// master pseudonym public key, of the hash-to-point of their stable
/// identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PolymorphicPseudonym(Encryption);

impl PolymorphicPseudonym {
    pub fn new(encryption: Encryption) -> Result<Self, CryptoError> {
        if encryption.y.is_identity() {
            return Err(CryptoError::InvalidPseudonym);
        }
        Ok(PolymorphicPseudonym(encryption))
    }

    /// Encrypt an identifier with fresh randomness. Two calls on the same
    /// identifier yield different ciphertexts with equal decryption.
    pub fn from_identifier(
        master_public_key: &GroupElement,
        identifier: &[u8],
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<Self, CryptoError> {
        let point = GroupElement::hash_to_point(identifier);
        Self::new(Encryption::encrypt(master_public_key, &point, rng)?)
    }

    pub fn rerandomize(
        &self,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<Self, CryptoError> {
        Self::new(self.0.rerandomize(rng)?)
    }

    pub fn pack(&self) -> [u8; ENCRYPTION_PACKED_BYTES] {
        self.0.pack()
    }

    pub fn from_packed(packed: &[u8]) -> Result<Self, CryptoError> {
        Self::new(Encryption::from_packed(packed)?)
    }

    pub fn to_text(&self) -> String {
        self.0.to_text()
    }

    pub fn from_text(text: &str) -> Result<Self, CryptoError> {
        Self::new(Encryption::from_text(text)?)
    }
}

impl AsEncryptedPseudonym for PolymorphicPseudonym {
    fn encryption(&self) -> &Encryption {
        &self.0
    }
}

/// An encrypted local pseudonym, as produced by the translator pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EncryptedLocalPseudonym(Encryption);

impl EncryptedLocalPseudonym {
    pub fn new(encryption: Encryption) -> Result<Self, CryptoError> {
        if encryption.y.is_identity() {
            return Err(CryptoError::InvalidPseudonym);
        }
        Ok(EncryptedLocalPseudonym(encryption))
    }

    /// Decrypt with the recipient's reconstructed private key.
    pub fn decrypt(&self, sk: &Scalar) -> Result<LocalPseudonym, CryptoError> {
        LocalPseudonym::new(self.0.decrypt(sk)?)
    }

    pub fn rerandomize(
        &self,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<Self, CryptoError> {
        Self::new(self.0.rerandomize(rng)?)
    }

    pub fn pack(&self) -> [u8; ENCRYPTION_PACKED_BYTES] {
        self.0.pack()
    }

    pub fn from_packed(packed: &[u8]) -> Result<Self, CryptoError> {
        Self::new(Encryption::from_packed(packed)?)
    }

    pub fn to_text(&self) -> String {
        self.0.to_text()
    }

    pub fn from_text(text: &str) -> Result<Self, CryptoError> {
        Self::new(Encryption::from_text(text)?)
    }
}

impl AsEncryptedPseudonym for EncryptedLocalPseudonym {
    fn encryption(&self) -> &Encryption {
        &self.0
    }
}

/// A symmetric payload key, encoded as a group element and ElGamal-encrypted
/// for its recipient.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EncryptedKey(Encryption);

impl EncryptedKey {
    pub fn new(encryption: Encryption) -> Result<Self, CryptoError> {
        encryption.checked()?;
        Ok(EncryptedKey(encryption))
    }

    /// Encrypt a key point under `pk`.
    pub fn encrypt_key(
        pk: &GroupElement,
        key_point: &GroupElement,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<Self, CryptoError> {
        Ok(EncryptedKey(Encryption::encrypt(pk, key_point, rng)?))
    }

    pub fn encryption(&self) -> &Encryption {
        &self.0
    }

    /// Decrypt to the 32-byte symmetric key: the packed form of the
    /// decrypted group element.
    pub fn decrypt(&self, sk: &Scalar) -> Result<[u8; PACKED_BYTES], CryptoError> {
        Ok(self.0.decrypt(sk)?.pack())
    }

    pub fn pack(&self) -> [u8; ENCRYPTION_PACKED_BYTES] {
        self.0.pack()
    }

    pub fn from_packed(packed: &[u8]) -> Result<Self, CryptoError> {
        Self::new(Encryption::from_packed(packed)?)
    }

    pub fn to_text(&self) -> String {
        self.0.to_text()
    }

    pub fn from_text(text: &str) -> Result<Self, CryptoError> {
        Self::new(Encryption::from_text(text)?)
    }
}
