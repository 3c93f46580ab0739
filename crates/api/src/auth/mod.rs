//! Authentication primitives.
//!
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`jwt`] -- JWT access-token generation and validation.
//! - [`bootstrap`] -- first admin account on an empty database.

pub mod bootstrap;
pub mod jwt;
pub mod password;
