//! `hosteldesk-auth` — pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP, the identity provider and
//! the record store: it only decides, given already-verified attributes.

pub mod authorize;
pub mod claims;
pub mod principal;
pub mod resolve;
pub mod roles;

pub use authorize::{Action, AuthzError, authorize, can_perform};
pub use claims::{AuthClaims, AuthorizationClaims, TokenValidationError, validate_claims};
pub use principal::{Affiliation, Principal};
pub use resolve::{RecordAuthorization, resolve_authorization};
pub use roles::Role;
