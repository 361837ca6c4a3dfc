//! Sea-ORM entities. Every table carries a `status` flag used for soft deletes.

pub mod audit_log;
pub mod permission;
pub mod profile_user;
pub mod role;
pub mod role_permission;
pub mod user;
