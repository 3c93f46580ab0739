//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument. Multi-statement operations
//! (batch creation, claims, submissions) run in a single transaction;
//! helpers they share take any `PgExecutor` so they can join it.

pub mod assignment_repo;
pub mod batch_repo;
pub mod project_repo;
pub mod task_repo;
pub mod user_repo;
pub mod worker_group_repo;
pub mod worker_session_repo;

pub use assignment_repo::{AssignmentRepo, ClaimActor};
pub use batch_repo::BatchRepo;
pub use project_repo::ProjectRepo;
pub use task_repo::TaskRepo;
pub use user_repo::UserRepo;
pub use worker_group_repo::WorkerGroupRepo;
pub use worker_session_repo::WorkerSessionRepo;
