//! `tradepost-infra` — store implementations behind the domain traits.
//!
//! In-memory implementations are intended for tests/dev; a document-database
//! backing is the deployment concern of the surrounding product.

pub mod audit_store;
pub mod credential_store;

pub use audit_store::InMemoryAuditStore;
pub use credential_store::{
    CredentialStore, CredentialStoreError, InMemoryCredentialStore, UserRecord,
};
