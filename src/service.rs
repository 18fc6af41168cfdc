//! Typed interface surface towards the RPC layer.
//!
//! The core never parses certificates or touches the wire: the RPC layer
//! verifies the caller, hands in a `Signatory`, and converts the typed
//! results (and errors, per their category) into wire responses.

use serde::{Deserialize, Serialize};

use crate::curve::{GroupElement, Scalar};
use crate::error::CryptoError;
use crate::proofs::RSKVerifiers;
use crate::pseudonym::EncryptedLocalPseudonym;
use crate::recipient::{PartyKind, Recipient};
use crate::translator::{DataTranslator, PseudonymTranslator};

const LOG_TARGET: &str = "transcrypt::service";

/// The already-verified caller of a request: its party kind, user group
/// (for users) and identity bytes (certificate fingerprint or similar).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Signatory {
    pub kind: PartyKind,
    pub user_group: Option<String>,
    pub identity: Vec<u8>,
}

impl Signatory {
    /// The recipient descriptor this signatory translates to by convention:
    /// users pseudonymize per group and rekey per identity, servers use
    /// their canonical name for both.
    pub fn recipient(&self) -> Result<Recipient, CryptoError> {
        match self.kind {
            PartyKind::User => {
                let group = self
                    .user_group
                    .as_deref()
                    .ok_or(CryptoError::BadEncoding("recipient descriptor"))?;
                Ok(Recipient::for_user(group, self.identity.clone()))
            }
            kind => {
                Recipient::for_server(kind).ok_or(CryptoError::BadEncoding("recipient descriptor"))
            }
        }
    }
}

/// Resolves signatories to recipients and decides data access. Implemented
/// by the authorization layer; the default recipient mapping is the
/// conventional one.
pub trait AuthorizationPolicy {
    fn recipient_for(&self, signatory: &Signatory) -> Result<Recipient, CryptoError> {
        signatory.recipient()
    }

    /// Whether the signatory may receive the data-domain key component.
    fn grants_data_access(&self, signatory: &Signatory) -> bool;
}

/// Response to a key-component request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeyComponentResponse {
    pub pseudonym_component: Scalar,
    pub data_component: Option<Scalar>,
}

/// Handle a key-component request for a verified signatory. The pseudonym
/// component is always returned; the data component only when the policy
/// grants data access.
pub fn handle_key_component(
    signatory: &Signatory,
    policy: &dyn AuthorizationPolicy,
    pseudonym_translator: &PseudonymTranslator,
    data_translator: &DataTranslator,
) -> Result<KeyComponentResponse, CryptoError> {
    let recipient = policy.recipient_for(signatory)?;
    let rekey = recipient.rekey();
    let data_access = policy.grants_data_access(signatory);
    tracing::info!(
        target: LOG_TARGET,
        kind = ?signatory.kind,
        data_access,
        "key component request"
    );
    Ok(KeyComponentResponse {
        pseudonym_component: pseudonym_translator.generate_key_component(&rekey),
        data_component: data_access.then(|| data_translator.generate_key_component(&rekey)),
    })
}

/// A batch of encrypted pseudonyms from a prior translator, to be advanced
/// one step towards `recipient`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TicketTranslationRequest {
    pub encrypted: Vec<EncryptedLocalPseudonym>,
    pub recipient: Recipient,
}

/// Translate a batch element-wise. One failing element invalidates only
/// itself; the caller decides how to report partial failure.
pub fn translate_batch(
    translator: &PseudonymTranslator,
    request: &TicketTranslationRequest,
) -> Vec<Result<EncryptedLocalPseudonym, CryptoError>> {
    tracing::info!(
        target: LOG_TARGET,
        batch = request.encrypted.len(),
        kind = ?request.recipient.kind,
        "ticket translation request"
    );
    request
        .encrypted
        .iter()
        .map(|encrypted| translator.translate_step(encrypted, &request.recipient))
        .collect()
}

/// The proof verifiers for the three translating servers, computed once at
/// startup and served to clients.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct VerifiersResponse {
    pub access_manager: RSKVerifiers,
    pub storage_facility: RSKVerifiers,
    pub transcryptor: RSKVerifiers,
}

impl VerifiersResponse {
    pub fn compute(
        translator: &PseudonymTranslator,
        master_public_key: &GroupElement,
    ) -> Result<Self, CryptoError> {
        let for_server = |kind: PartyKind| -> Result<RSKVerifiers, CryptoError> {
            let recipient =
                Recipient::for_server(kind).expect("translating servers have canonical names");
            translator.compute_translation_proof_verifiers(&recipient, master_public_key)
        };
        Ok(VerifiersResponse {
            access_manager: for_server(PartyKind::AccessManager)?,
            storage_facility: for_server(PartyKind::StorageFacility)?,
            transcryptor: for_server(PartyKind::Transcryptor)?,
        })
    }
}
