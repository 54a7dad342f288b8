pub mod counter;
pub mod error;
pub mod revocation;
pub mod secret_store;
pub mod validator;
pub mod whitelist;

pub use counter::CounterStore;
pub use error::{StoreError, ValidatorError};
pub use revocation::{RevocationSnapshot, RevocationStore};
pub use secret_store::{FileSecretStore, InMemorySecretStore, SecretStore};
pub use validator::AccessKeyValidator;
pub use whitelist::WhitelistStore;
