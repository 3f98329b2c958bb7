//! Credential hashing and bearer token handling.

pub mod password;
pub mod token;

pub use password::{PasswordError, PasswordHash, hash_password, verify_password};
pub use token::{IssuedToken, TokenError, TokenIssuer};
