//! `tradepost-auth` — pure authentication/authorization boundary (zero-trust).
//!
//! This crate is intentionally decoupled from HTTP and storage. The API layer
//! adapts verified tokens into a [`Principal`], asks [`decide`] whether a
//! route requirement is satisfied, and runs the password policy/history
//! checks during credential changes.

pub mod claims;
pub mod decide;
pub mod history;
pub mod password;
pub mod permissions;
pub mod principal;
pub mod requirement;
pub mod token;

pub use claims::{IdentityClaims, TokenValidationError, validate_claims};
pub use decide::{Decision, DenyReason, decide};
pub use history::{ChangeDenied, HISTORY_CAPACITY, PasswordHistory, PasswordRecord, can_change};
pub use password::{PasswordCheck, PasswordHashError, PasswordViolation};
pub use permissions::{Permission, role_permissions};
pub use principal::{Principal, PrincipalAttrs, Role};
pub use requirement::{AttrPredicate, Requirement};
pub use token::{Hs256TokenVerifier, SessionWatermark, TokenVerifier, VerifyError};
