//! Crypto-layer error taxonomy.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    #[error("Proof verification failed: {0}")]
    Verification(String),
}

impl CryptoError {
    pub fn invalid_key(why: impl Into<String>) -> Self {
        Self::InvalidKey(why.into())
    }

    pub fn verification(why: impl Into<String>) -> Self {
        Self::Verification(why.into())
    }
}
