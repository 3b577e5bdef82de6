//! Authentication
//!
//! Tokens are issued elsewhere; this service only validates them:
//! - [`JwtService`] - HS256 bearer token validation
//! - [`CurrentUser`] - authenticated identity, extracted per request

pub mod extractor;
pub mod jwt;

pub use jwt::{Claims, CurrentUser, JwtConfig, JwtError, JwtService};
