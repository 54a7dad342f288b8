pub mod address;
pub mod derive;
pub mod error;
pub mod keccak;
pub mod master_key;
pub mod signing;

pub use address::Address;
pub use error::CryptoError;
pub use master_key::MasterKeyGuard;
