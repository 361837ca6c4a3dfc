//! Row shapes returned by the admin API and their list allow-lists.
//!
//! | resource   | search (`search`/`q`/alias) | filters                                  | sortable                                 |
//! |------------|-----------------------------|------------------------------------------|------------------------------------------|
//! | user       | `email`                     | `status`, `role`, `roleId`, `createdAt`  | `id, email, status, createdAt, updatedAt` |
//! | role       | `name`                      | `status`, `createdAt`                    | `id, name, status, createdAt, updatedAt`  |
//! | permission | `name`                      | `status`, `createdAt`                    | `id, name, status, createdAt, updatedAt`  |

pub mod permission;
pub mod role;
pub mod user;

pub use permission::PermissionRow;
pub use role::{RolePermissionRow, RoleRow, RoleSummary};
pub use user::{ProfileRow, UserDetail, UserRow};
