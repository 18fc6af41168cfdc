use thiserror::Error;

/// Which audience an error is meant for when it crosses the service boundary.
///
/// Encoding and integrity failures are caused by the caller's input and may be
/// reported back to them; configuration and programming failures are the
/// operator's problem and must not leak details to end users.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    Encoding,
    Integrity,
    Configuration,
    Programming,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("value is not a canonical {0} encoding")]
    BadEncoding(&'static str),

    #[error("public key is the identity element")]
    ZeroPublicKey,

    #[error("pseudonym is the identity element or carries a zero public key")]
    InvalidPseudonym,

    #[error("zero-knowledge proof verification failed")]
    InvalidProof,

    #[error("translator has no {0} secret")]
    MissingSecret(&'static str),

    #[error("unknown encryption scheme tag {0}")]
    UnknownScheme(u64),

    #[error("metadata entry payload is {0}")]
    MetadataEntryState(&'static str),

    #[error("authenticated encryption failed")]
    Aead,
}

impl CryptoError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CryptoError::BadEncoding(_) => ErrorCategory::Encoding,
            CryptoError::ZeroPublicKey
            | CryptoError::InvalidPseudonym
            | CryptoError::InvalidProof
            | CryptoError::Aead => ErrorCategory::Integrity,
            CryptoError::MissingSecret(_) | CryptoError::UnknownScheme(_) => {
                ErrorCategory::Configuration
            }
            CryptoError::MetadataEntryState(_) => ErrorCategory::Programming,
        }
    }

    /// Whether the error may be surfaced to the requesting user as-is.
    pub fn user_visible(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Encoding | ErrorCategory::Integrity
        )
    }
}
