//! Secret storage
//!
//! The sales feed persists its bearer token through a `SecretStore`. The store
//! is injected by the caller; two implementations ship with the crate.

mod store;

pub use store::{FileSecretStore, InMemorySecretStore, SecretStore};
