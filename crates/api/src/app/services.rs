//! Infrastructure wiring: stores, verifier, and the audit logger.
//!
//! Every collaborator is injected here at construction — components hold
//! `Arc` handles and have no process-wide lifecycle of their own, so tests
//! can assemble the same graph around fakes or seeded stores.

use std::sync::Arc;

use tradepost_audit::{AuditLoggerConfig, SecurityAuditLogger};
use tradepost_auth::{Hs256TokenVerifier, TokenVerifier};
use tradepost_infra::{InMemoryAuditStore, InMemoryCredentialStore};

use crate::config::AppConfig;

pub struct AppServices {
    pub config: AppConfig,
    pub credentials: Arc<InMemoryCredentialStore>,
    pub audit_store: Arc<InMemoryAuditStore>,
    pub logger: Arc<SecurityAuditLogger>,
    pub verifier: Arc<dyn TokenVerifier>,
}

pub fn build_services(config: AppConfig) -> AppServices {
    let credentials = Arc::new(InMemoryCredentialStore::new());
    let audit_store = Arc::new(InMemoryAuditStore::new());

    // The credential store doubles as the role directory (admin
    // re-verification) and the session-watermark source (revocation).
    let logger = Arc::new(SecurityAuditLogger::new(
        audit_store.clone(),
        credentials.clone(),
        AuditLoggerConfig::default(),
    ));

    let verifier: Arc<dyn TokenVerifier> = Arc::new(Hs256TokenVerifier::new(
        config.jwt_secret.as_bytes(),
        credentials.clone(),
    ));

    AppServices {
        config,
        credentials,
        audit_store,
        logger,
        verifier,
    }
}
