//! Pseudonym translation: reshuffle + rekey steps turning polymorphic
//! pseudonyms into recipient-local encrypted pseudonyms.

use rand::{CryptoRng, RngCore};

use crate::cache::RskCache;
use crate::curve::{GroupElement, Scalar};
use crate::elgamal::Encryption;
use crate::error::CryptoError;
use crate::proofs::{RSKProof, RSKVerifiers};
use crate::pseudonym::{AsEncryptedPseudonym, EncryptedLocalPseudonym};
use crate::recipient::{Recipient, RekeyRecipient, ReshuffleRecipient};
use crate::translator::{derive_key_factor, KeyFactors, SharedRng, TranslatorKeys};

const LOG_TARGET: &str = "transcrypt::translator::pseudonym";

/// Translator for the pseudonym domain.
///
/// Immutable after construction and cheap to clone; the embedded CPRNG is
/// internally synchronized, so a single instance may serve all threads.
#[derive(Clone)]
pub struct PseudonymTranslator {
    keys: TranslatorKeys,
    cache: &'static RskCache,
    rng: SharedRng,
}

impl std::fmt::Debug for PseudonymTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PseudonymTranslator").finish_non_exhaustive()
    }
}

impl PseudonymTranslator {
    pub fn new(keys: TranslatorKeys) -> Self {
        PseudonymTranslator {
            keys,
            cache: RskCache::global(),
            rng: SharedRng::from_entropy(),
        }
    }

    /// Replace the CPRNG, for deterministic test seeding.
    pub fn with_rng(mut self, rng: SharedRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn keys(&self) -> &TranslatorKeys {
        &self.keys
    }

    /// Derive the pseudonymization key factor for a recipient.
    pub fn generate_reshuffle_factor(
        &self,
        recipient: &ReshuffleRecipient,
    ) -> Result<Scalar, CryptoError> {
        let secret = self
            .keys
            .reshuffle
            .as_ref()
            .ok_or(CryptoError::MissingSecret("reshuffle"))?;
        Ok(derive_key_factor(
            secret,
            self.keys.domain,
            recipient.kind.tag(),
            &recipient.payload,
        ))
    }

    /// Derive the encryption key factor for a recipient.
    pub fn generate_rekey_factor(&self, recipient: &RekeyRecipient) -> Scalar {
        derive_key_factor(
            &self.keys.rekey,
            self.keys.domain,
            recipient.kind.tag(),
            &recipient.payload,
        )
    }

    /// Derive both factors at once.
    pub fn generate_key_factors(&self, recipient: &Recipient) -> Result<KeyFactors, CryptoError> {
        Ok(KeyFactors {
            reshuffle: self.generate_reshuffle_factor(&recipient.reshuffle())?,
            rekey: self.generate_rekey_factor(&recipient.rekey()),
        })
    }

    /// One RSK translation step towards `recipient`, without proof.
    pub fn translate_step(
        &self,
        encrypted: &impl AsEncryptedPseudonym,
        recipient: &Recipient,
    ) -> Result<EncryptedLocalPseudonym, CryptoError> {
        let factors = self.generate_key_factors(recipient)?;
        let translated = self.rng.with(|rng| {
            self.cache
                .rsk(encrypted.encryption(), &factors.reshuffle, &factors.rekey, rng)
        })?;
        EncryptedLocalPseudonym::new(translated)
    }

    /// One RSK translation step towards `recipient`, with a proof of
    /// correctness.
    pub fn certified_translate_step(
        &self,
        encrypted: &impl AsEncryptedPseudonym,
        recipient: &Recipient,
    ) -> Result<(EncryptedLocalPseudonym, RSKProof), CryptoError> {
        self.rng
            .with(|rng| self.certified_translate_step_with_rng(encrypted, recipient, rng))
    }

    /// Certified step with explicit randomness, for deterministic tests.
    pub fn certified_translate_step_with_rng(
        &self,
        encrypted: &impl AsEncryptedPseudonym,
        recipient: &Recipient,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<(EncryptedLocalPseudonym, RSKProof), CryptoError> {
        let factors = self.generate_key_factors(recipient)?;
        let (translated, proof) = RSKProof::certified_rsk(
            encrypted.encryption(),
            &factors.reshuffle,
            &factors.rekey,
            rng,
        )?;
        tracing::debug!(target: LOG_TARGET, kind = ?recipient.kind, "certified translation step");
        Ok((EncryptedLocalPseudonym::new(translated)?, proof))
    }

    /// Check a translation proof produced by a peer translator.
    pub fn check_translation_proof(
        &self,
        pre: &impl AsEncryptedPseudonym,
        post: &impl AsEncryptedPseudonym,
        proof: &RSKProof,
        verifiers: &RSKVerifiers,
    ) -> Result<(), CryptoError> {
        proof.verify(pre.encryption(), post.encryption(), verifiers)
    }

    /// Static public data for verifying this translator's RSK proofs for a
    /// recipient. Computed once per recipient; cacheable.
    pub fn compute_translation_proof_verifiers(
        &self,
        recipient: &Recipient,
        master_public_key: &GroupElement,
    ) -> Result<RSKVerifiers, CryptoError> {
        let factors = self.generate_key_factors(recipient)?;
        Ok(RSKVerifiers::compute(
            &factors.reshuffle,
            &factors.rekey,
            master_public_key,
        ))
    }

    /// Rerandomize-and-reshuffle only, leaving the recipient key unchanged.
    pub fn reshuffle_step(
        &self,
        encrypted: &impl AsEncryptedPseudonym,
        recipient: &ReshuffleRecipient,
    ) -> Result<Encryption, CryptoError> {
        let z = self.generate_reshuffle_factor(recipient)?;
        self.rng
            .with(|rng| encrypted.encryption().rerandomize_reshuffle(&z, rng))
    }

    /// Rerandomize-and-rekey only, leaving the pseudonym unchanged.
    pub fn rekey_step(
        &self,
        encrypted: &impl AsEncryptedPseudonym,
        recipient: &RekeyRecipient,
    ) -> Result<Encryption, CryptoError> {
        let k = self.generate_rekey_factor(recipient);
        self.rng
            .with(|rng| self.cache.rerandomize_rekey(encrypted.encryption(), &k, rng))
    }

    /// This party's multiplicative share of the recipient's private
    /// decryption key.
    pub fn generate_key_component(&self, recipient: &RekeyRecipient) -> Scalar {
        self.generate_rekey_factor(recipient) * self.keys.master_private_key_share
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{KeyDomain, KeyFactorSecret};
    use crate::pseudonym::PolymorphicPseudonym;
    use crate::test_utils::test_rng;
    use rand::{CryptoRng, RngCore};

    fn translator(rng: &mut (impl RngCore + CryptoRng), share: Scalar) -> PseudonymTranslator {
        PseudonymTranslator::new(TranslatorKeys {
            domain: KeyDomain::Pseudonym,
            reshuffle: Some(KeyFactorSecret::random(rng)),
            rekey: KeyFactorSecret::random(rng),
            master_private_key_share: share,
        })
        .with_rng(SharedRng::seeded(7))
    }

    #[test]
    fn key_factors_deterministic_across_clones() {
        let mut rng = test_rng();
        let share = Scalar::random(&mut rng);
        let translator = translator(&mut rng, share);
        let clone = translator.clone();
        let recipient = Recipient::for_user("GroupA", "User1");
        assert_eq!(
            translator.generate_key_factors(&recipient).unwrap().rekey,
            clone.generate_key_factors(&recipient).unwrap().rekey
        );
        assert_eq!(
            translator.generate_key_factors(&recipient).unwrap().reshuffle,
            clone.generate_key_factors(&recipient).unwrap().reshuffle
        );
    }

    #[test]
    fn translate_step_requires_reshuffle_secret() {
        let mut rng = test_rng();
        let share = Scalar::random(&mut rng);
        let mut keys = TranslatorKeys {
            domain: KeyDomain::Pseudonym,
            reshuffle: None,
            rekey: KeyFactorSecret::random(&mut rng),
            master_private_key_share: share,
        };
        let translator = PseudonymTranslator::new(keys.clone());
        let master_pub = GroupElement::base_mult(&share);
        let polymorph =
            PolymorphicPseudonym::from_identifier(&master_pub, b"PEP1234", &mut rng).unwrap();
        let recipient = Recipient::for_user("GroupA", "User1");

        assert_eq!(
            translator.translate_step(&polymorph, &recipient).unwrap_err(),
            CryptoError::MissingSecret("reshuffle")
        );
        // The rekey-only step still works without the reshuffle secret.
        translator
            .rekey_step(&polymorph, &recipient.rekey())
            .unwrap();

        keys.reshuffle = Some(KeyFactorSecret::random(&mut rng));
        let translator = PseudonymTranslator::new(keys);
        translator.translate_step(&polymorph, &recipient).unwrap();
    }

    #[test]
    fn translate_step_changes_ciphertext() {
        let mut rng = test_rng();
        let share = Scalar::random(&mut rng);
        let translator = translator(&mut rng, share);
        let master_pub = GroupElement::base_mult(&share);
        let polymorph =
            PolymorphicPseudonym::from_identifier(&master_pub, b"PEP1234", &mut rng).unwrap();
        let recipient = Recipient::for_user("GroupA", "User1");

        let translated = translator.translate_step(&polymorph, &recipient).unwrap();
        assert_ne!(translated.encryption(), polymorph.encryption());
    }

    #[test]
    fn key_component_is_factor_times_share() {
        let mut rng = test_rng();
        let share = Scalar::random(&mut rng);
        let translator = translator(&mut rng, share);
        let recipient = Recipient::for_user("GroupA", "User1").rekey();
        let component = translator.generate_key_component(&recipient);
        assert_eq!(
            component,
            translator.generate_rekey_factor(&recipient) * share
        );
        assert_ne!(component, Scalar::one());
    }
}
