//! Data-key translation: metadata-bound blinding plus rekey steps on
//! encrypted payload keys.

use crate::cache::RskCache;
use crate::curve::Scalar;
use crate::elgamal::Encryption;
use crate::error::CryptoError;
use crate::recipient::RekeyRecipient;
use crate::translator::{derive_key_factor, SharedRng, TranslatorKeys};

const LOG_TARGET: &str = "transcrypt::translator::data";

/// Translator for the data-key domain.
///
/// The reshuffle slot of the keys doubles as the blinding secret; a
/// translator without it (the transcryptor) can only perform rekey-only
/// steps and rejects `blind` / `unblind_and_translate`.
#[derive(Clone)]
pub struct DataTranslator {
    keys: TranslatorKeys,
    cache: &'static RskCache,
    rng: SharedRng,
}

impl DataTranslator {
    pub fn new(keys: TranslatorKeys) -> Self {
        DataTranslator {
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

    /// Whether this translator can blind (an access-manager-class
    /// translator) or not (transcryptor-class).
    pub fn can_blind(&self) -> bool {
        self.keys.reshuffle.is_some()
    }

    /// The blinding key factor bound to `additional_data`.
    pub fn blinding_key_factor(&self, additional_data: &[u8]) -> Result<Scalar, CryptoError> {
        let secret = self
            .keys
            .reshuffle
            .as_ref()
            .ok_or(CryptoError::MissingSecret("blinding"))?;
        let mut input = Vec::with_capacity(secret.hmac_key().len() + additional_data.len());
        input.extend_from_slice(secret.hmac_key());
        input.extend_from_slice(additional_data);
        Ok(Scalar::short_hash_from_bytes(&input))
    }

    /// Blind an encrypted key, multiplying the underlying key by the
    /// blinding factor (or its inverse when `invert` is set, which moves
    /// the inversion cost from unblinding to blinding).
    pub fn blind(
        &self,
        encrypted: &Encryption,
        additional_data: &[u8],
        invert: bool,
    ) -> Result<Encryption, CryptoError> {
        let factor = self.blinding_key_factor(additional_data)?;
        let factor = if invert { factor.invert() } else { factor };
        self.rng
            .with(|rng| encrypted.rerandomize_reshuffle(&factor, rng))
    }

    /// Reverse a blinding and apply the rekey step towards `recipient` in
    /// one pass.
    pub fn unblind_and_translate(
        &self,
        blinded: &Encryption,
        additional_data: &[u8],
        invert: bool,
        recipient: &RekeyRecipient,
    ) -> Result<Encryption, CryptoError> {
        let factor = self.blinding_key_factor(additional_data)?;
        // Undo whatever blind() multiplied in.
        let unblind = if invert { factor } else { factor.invert() };
        let unblinded = blinded.reshuffle(&unblind)?;
        tracing::debug!(target: LOG_TARGET, kind = ?recipient.kind, "unblind and translate");
        self.translate_step(&unblinded, recipient)
    }

    /// Rerandomize-and-rekey step towards `recipient`; the path taken by
    /// translators that do not blind.
    pub fn translate_step(
        &self,
        encrypted: &Encryption,
        recipient: &RekeyRecipient,
    ) -> Result<Encryption, CryptoError> {
        let k = self.generate_rekey_factor(recipient);
        self.rng
            .with(|rng| self.cache.rerandomize_rekey(encrypted, &k, rng))
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

    /// This party's multiplicative share of the recipient's private
    /// decryption key.
    pub fn generate_key_component(&self, recipient: &RekeyRecipient) -> Scalar {
        self.generate_rekey_factor(recipient) * self.keys.master_private_key_share
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::GroupElement;
    use crate::keys::{KeyDomain, KeyFactorSecret};
    use crate::test_utils::test_rng;
    use rand::{CryptoRng, RngCore};

    fn translator(
        rng: &mut (impl RngCore + CryptoRng),
        share: Scalar,
        with_blinding: bool,
    ) -> DataTranslator {
        DataTranslator::new(TranslatorKeys {
            domain: KeyDomain::Data,
            reshuffle: with_blinding.then(|| KeyFactorSecret::random(rng)),
            rekey: KeyFactorSecret::random(rng),
            master_private_key_share: share,
        })
        .with_rng(SharedRng::seeded(11))
    }

    #[test]
    fn blind_multiplies_by_the_bound_factor() {
        let mut rng = test_rng();
        let master_sk = Scalar::random(&mut rng);
        let master_pub = GroupElement::base_mult(&master_sk);
        let share = Scalar::random(&mut rng);
        let am = translator(&mut rng, share, true);

        let data = GroupElement::random(&mut rng);
        let encrypted = Encryption::encrypt(&master_pub, &data, &mut rng).unwrap();
        let blinded = am.blind(&encrypted, b"AD_A", false).unwrap();

        let factor = am.blinding_key_factor(b"AD_A").unwrap();
        assert_eq!(
            blinded.decrypt(&master_sk).unwrap(),
            data.mult(&factor)
        );
    }

    #[test]
    fn blind_with_invert_multiplies_by_the_inverse() {
        let mut rng = test_rng();
        let master_sk = Scalar::random(&mut rng);
        let master_pub = GroupElement::base_mult(&master_sk);
        let share = Scalar::random(&mut rng);
        let am = translator(&mut rng, share, true);

        let data = GroupElement::random(&mut rng);
        let encrypted = Encryption::encrypt(&master_pub, &data, &mut rng).unwrap();
        let blinded = am.blind(&encrypted, b"AD_A", true).unwrap();

        let factor = am.blinding_key_factor(b"AD_A").unwrap();
        assert_eq!(
            blinded.decrypt(&master_sk).unwrap(),
            data.mult(&factor.invert())
        );
    }

    #[test]
    fn blinding_factor_depends_on_additional_data() {
        let mut rng = test_rng();
        let share = Scalar::random(&mut rng);
        let am = translator(&mut rng, share, true);
        assert_ne!(
            am.blinding_key_factor(b"AD_A").unwrap(),
            am.blinding_key_factor(b"AD_B").unwrap()
        );
    }

    #[test]
    fn transcryptor_class_rejects_blinding() {
        let mut rng = test_rng();
        let master_sk = Scalar::random(&mut rng);
        let master_pub = GroupElement::base_mult(&master_sk);
        let share = Scalar::random(&mut rng);
        let ts = translator(&mut rng, share, false);
        assert!(!ts.can_blind());

        let data = GroupElement::random(&mut rng);
        let encrypted = Encryption::encrypt(&master_pub, &data, &mut rng).unwrap();
        let recipient = RekeyRecipient::for_user("User1");

        assert_eq!(
            ts.blind(&encrypted, b"AD_A", true).unwrap_err(),
            CryptoError::MissingSecret("blinding")
        );
        assert_eq!(
            ts.unblind_and_translate(&encrypted, b"AD_A", true, &recipient)
                .unwrap_err(),
            CryptoError::MissingSecret("blinding")
        );
        // Rekey-only translation still works.
        ts.translate_step(&encrypted, &recipient).unwrap();
    }
}
