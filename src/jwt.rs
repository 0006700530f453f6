//! JWT signature verification.
//!
//! Only the HS256 signature is checked here. Time-based claims are left to
//! [`crate::auth::claims`], so an expired but authentic token still verifies
//! and can drive the refresh flow.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Algorithm, DecodingKey};

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Verifies tokens signed with a shared secret.
#[derive(Clone)]
pub struct Verifier {
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier")
            .field("algorithm", &ALGORITHM)
            .finish_non_exhaustive()
    }
}

impl Verifier {
    /// Create a verifier for the given secret. An empty secret is refused.
    pub fn new(secret: &[u8]) -> Result<Self, JwtError> {
        if secret.is_empty() {
            return Err(JwtError::InvalidKey);
        }

        Ok(Self {
            decoding_key: DecodingKey::from_secret(secret),
        })
    }

    /// Check the token signature and return the raw claims payload.
    /// The payload itself is not interpreted here.
    pub fn verify(&self, token: &str) -> Result<Vec<u8>, JwtError> {
        let header = jsonwebtoken::decode_header(token).map_err(JwtError::Decoding)?;
        if header.alg != ALGORITHM {
            return Err(JwtError::UnsupportedAlgorithm(header.alg));
        }

        let (message, signature) = token.rsplit_once('.').ok_or(JwtError::Malformed)?;
        let (_, payload) = message.split_once('.').ok_or(JwtError::Malformed)?;
        if payload.contains('.') {
            return Err(JwtError::Malformed);
        }

        let valid = jsonwebtoken::crypto::verify(
            signature,
            message.as_bytes(),
            &self.decoding_key,
            ALGORITHM,
        )
        .map_err(JwtError::Decoding)?;
        if !valid {
            return Err(JwtError::InvalidSignature);
        }

        URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| JwtError::Malformed)
    }
}

/// Errors that can occur while verifying a token.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// The secret cannot be used to build a verifier
    #[error("Invalid verification key")]
    InvalidKey,
    /// Header or signature could not be decoded
    #[error("Failed to decode token: {0}")]
    Decoding(jsonwebtoken::errors::Error),
    #[error("Unsupported algorithm {0:?}")]
    UnsupportedAlgorithm(Algorithm),
    #[error("Invalid token signature")]
    InvalidSignature,
    /// Token is not three dot-separated segments, or the payload is not base64url
    #[error("Malformed token")]
    Malformed,
}
