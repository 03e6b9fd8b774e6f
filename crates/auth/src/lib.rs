//! `essentials-auth` — authentication/authorization boundary.
//!
//! This crate is decoupled from HTTP and storage: it turns verified tokens into
//! principals and answers "may this principal do X inside organization Y".

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use authorize::{authorize, AuthzError, Principal};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtError, JwtValidator};
pub use permissions::Permission;
pub use principal::{OrganizationMembership, PrincipalId};
pub use roles::Role;
