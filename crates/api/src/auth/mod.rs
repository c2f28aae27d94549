//! Authentication primitives.
//!
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`jwt`] -- access tokens and single-purpose invite tokens.

pub mod jwt;
pub mod password;
