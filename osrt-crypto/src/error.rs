use thiserror::Error;

/// Errors surfaced by the Keccak/address/signing/derivation primitives.
///
/// Cryptographic failures are propagated to callers unchanged — there is no
/// JSON envelope at this layer, only at the surfaces that sit in front of a
/// wire boundary (see `osrt-identity` and `osrt-gateway`).
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("failed to obtain secure randomness")]
    RandomFailed,

    #[error("signing failed: {0}")]
    SigningFailed(String),

    #[error("address recovery failed: {0}")]
    AddressRecoveryFailed(String),
}
