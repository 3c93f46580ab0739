//! Pure domain logic for the Hitlist task-distribution service.
//!
//! Nothing in this crate touches the database or performs I/O; the `db` and
//! `api` crates build on these types and rules.

pub mod access;
pub mod allocation;
pub mod answers;
pub mod assignment;
pub mod csv_batch;
pub mod error;
pub mod roles;
pub mod template;
pub mod types;
pub mod validation;
