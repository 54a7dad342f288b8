use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to read secret store slot {service}/{account}: {source}")]
    SecretReadFailed {
        service: String,
        account: String,
        source: String,
    },

    #[error("failed to write secret store slot {service}/{account}: {source}")]
    SecretWriteFailed {
        service: String,
        account: String,
        source: String,
    },
}

/// Failure modes for `AccessKeyValidator::validate`. The caller-facing
/// behaviour is a uniform unauthorized response — callers should not
/// surface which variant tripped to the bearer of the key.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidatorError {
    #[error("no account configured")]
    NoAccount,

    #[error("signer is not whitelisted")]
    NotWhitelisted,

    #[error("access key has been revoked")]
    Revoked,

    #[error("counter has already been used (replay)")]
    ReplayedCounter,

    #[error("signature is invalid")]
    BadSignature,
}
