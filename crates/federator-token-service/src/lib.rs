//! Token acquisition and verification for the federation data plane's external IdP
//! integration: a client-credentials fetch on the client side, JWKS-backed verification
//! plus claim extraction on the server side.

pub mod claims;
pub mod jwks;
pub mod service;

pub use claims::Claims;
pub use service::{IdpTokenService, TokenService};
