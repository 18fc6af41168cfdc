//! Polymorphic pseudonymization and key-translation core.
//!
//! Participant identifiers never appear in the clear at the storage layer:
//! they travel as ElGamal-encrypted curve points ("polymorphic pseudonyms")
//! that each party translates, one RSK step at a time, into an encrypted
//! pseudonym local to the receiving user group. Payload keys follow the same
//! pattern, with a metadata-bound blinding in between. No single party holds
//! enough material to link pseudonyms across groups or to decrypt on its
//! own: decryption keys come from multiplying the key components of every
//! translating server.

pub mod cache;
pub mod curve;
pub mod elgamal;
pub mod error;
pub mod keys;
pub mod metadata;
pub mod proofs;
pub mod pseudonym;
pub mod recipient;
pub mod serde_hex;
pub mod service;
pub mod translator;

#[cfg(test)]
pub mod test_utils;

pub use cache::{CacheMetrics, RskCache};
pub use curve::{GroupElement, Scalar, ScalarMultTable};
pub use elgamal::Encryption;
pub use error::{CryptoError, ErrorCategory};
pub use keys::{KeyDomain, KeyFactorSecret, SystemKeys};
pub use metadata::{
    EncryptionScheme, KeyBlindingAdditionalData, Metadata, MetadataXEntry, LATEST_SCHEME,
};
pub use proofs::{RSKProof, RSKVerifiers, ScalarMultProof};
pub use pseudonym::{
    AsEncryptedPseudonym, EncryptedKey, EncryptedLocalPseudonym, LocalPseudonym,
    PolymorphicPseudonym,
};
pub use recipient::{PartyKind, Recipient, RekeyRecipient, ReshuffleRecipient};
pub use service::{
    handle_key_component, translate_batch, AuthorizationPolicy, KeyComponentResponse, Signatory,
    TicketTranslationRequest, VerifiersResponse,
};
pub use translator::{DataTranslator, KeyFactors, PseudonymTranslator, SharedRng, TranslatorKeys};
