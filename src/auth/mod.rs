//! Authentication for Stampbook
//!
//! Provides:
//! - JWT token validation (and issuing in dev mode)
//! - Identity provider with principal sign-in/sign-out events

pub mod identity;
pub mod jwt;

pub use identity::{IdentityProvider, Principal, PrincipalEvent};
pub use jwt::{extract_token_from_header, Claims, JwtValidator, TokenInput, TokenValidationResult};
