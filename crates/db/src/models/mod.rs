//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - A `Deserialize` update DTO (all `Option` fields) for patches

pub mod assignment;
pub mod batch;
pub mod project;
pub mod task;
pub mod user;
pub mod worker_group;
pub mod worker_session;
