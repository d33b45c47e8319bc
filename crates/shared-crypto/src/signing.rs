//! Tiered proof signing.
//!
//! The signer tries Ed25519 first, falls back to HMAC-SHA256, and returns
//! `None` when neither key is configured or usable. Signing is advisory:
//! a misconfigured key degrades to the next tier instead of failing the
//! request that triggered it.

use crate::errors::CryptoError;
use crate::hashing::sha256_hex;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use shared_types::{now_iso, Proof};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// Key material for proof signing. Either field may be absent.
#[derive(Debug, Clone, Default)]
pub struct SignerKeys {
    /// Base64-encoded 32-byte Ed25519 seed.
    pub ed25519_seed_b64: Option<String>,
    /// Shared secret for the HMAC fallback tier.
    pub hmac_secret: Option<String>,
}

impl SignerKeys {
    /// Read keys from `EG_ED25519_SEED_B64` and `EG_HMAC_SECRET`.
    /// Blank values count as absent.
    pub fn from_env() -> Self {
        Self {
            ed25519_seed_b64: env_nonempty("EG_ED25519_SEED_B64"),
            hmac_secret: env_nonempty("EG_HMAC_SECRET"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ed25519_seed_b64.is_none() && self.hmac_secret.is_none()
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Sign `canonical` with the strongest configured tier.
///
/// Returns `None` when no tier produced a proof. Never errors: a bad seed
/// falls through to HMAC, a bad secret falls through to unsigned.
pub fn maybe_sign(keys: &SignerKeys, canonical: &str) -> Option<Proof> {
    let digest = sha256_hex(canonical.as_bytes());
    if let Some(seed_b64) = &keys.ed25519_seed_b64 {
        if let Some(proof) = sign_ed25519(seed_b64, canonical, &digest) {
            return Some(proof);
        }
    }
    if let Some(secret) = &keys.hmac_secret {
        if let Some(proof) = sign_hmac(secret, canonical, &digest) {
            return Some(proof);
        }
    }
    None
}

fn sign_ed25519(seed_b64: &str, canonical: &str, digest: &str) -> Option<Proof> {
    let seed = Zeroizing::new(B64.decode(seed_b64).ok()?);
    let seed: &[u8; 32] = seed.as_slice().try_into().ok()?;
    let key = SigningKey::from_bytes(seed);
    let sig = key.sign(canonical.as_bytes());
    Some(Proof::Ed25519 {
        ts: now_iso(),
        canonical_sha256: digest.to_string(),
        public_key_b64: B64.encode(key.verifying_key().as_bytes()),
        signature_b64: B64.encode(sig.to_bytes()),
    })
}

fn sign_hmac(secret: &str, canonical: &str, digest: &str) -> Option<Proof> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(canonical.as_bytes());
    Some(Proof::HmacSha256 {
        ts: now_iso(),
        canonical_sha256: digest.to_string(),
        mac_b64: B64.encode(mac.finalize().into_bytes()),
    })
}

/// Check `proof` against `canonical`. HMAC proofs need the shared secret;
/// Ed25519 proofs carry their own verifying key.
pub fn verify_proof(
    proof: &Proof,
    canonical: &str,
    hmac_secret: Option<&str>,
) -> Result<(), CryptoError> {
    let digest = sha256_hex(canonical.as_bytes());
    if proof.canonical_sha256() != digest {
        return Err(CryptoError::verification("canonical hash mismatch"));
    }
    match proof {
        Proof::Ed25519 {
            public_key_b64,
            signature_b64,
            ..
        } => {
            let pk_bytes = B64
                .decode(public_key_b64)
                .map_err(|e| CryptoError::invalid_key(format!("public key: {e}")))?;
            let pk_bytes: &[u8; 32] = pk_bytes
                .as_slice()
                .try_into()
                .map_err(|_| CryptoError::invalid_key("public key must be 32 bytes"))?;
            let pk = VerifyingKey::from_bytes(pk_bytes)
                .map_err(|e| CryptoError::invalid_key(format!("public key: {e}")))?;
            let sig_bytes = B64
                .decode(signature_b64)
                .map_err(|e| CryptoError::verification(format!("signature: {e}")))?;
            let sig = Signature::from_slice(&sig_bytes)
                .map_err(|e| CryptoError::verification(format!("signature: {e}")))?;
            pk.verify(canonical.as_bytes(), &sig)
                .map_err(|_| CryptoError::verification("signature does not match"))
        }
        Proof::HmacSha256 { mac_b64, .. } => {
            let secret =
                hmac_secret.ok_or_else(|| CryptoError::invalid_key("no HMAC secret provided"))?;
            let expected = B64
                .decode(mac_b64)
                .map_err(|e| CryptoError::verification(format!("mac: {e}")))?;
            let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
                .map_err(|e| CryptoError::invalid_key(e.to_string()))?;
            mac.update(canonical.as_bytes());
            let actual = mac.finalize().into_bytes();
            if bool::from(actual.as_slice().ct_eq(&expected)) {
                Ok(())
            } else {
                Err(CryptoError::verification("mac does not match"))
            }
        }
    }
}

/// Constant-time string comparison for bearer tokens and secrets.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
