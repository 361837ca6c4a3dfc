//! # rolecrate
//!
//! Role-based access control administration API on Axum and Sea-ORM.
//!
//! The core is the list pipeline shared by every admin listing:
//!
//! ```text
//! ?page=2&filters[status]=true&query=%7B%22search%22%3A%22ada%22%7D
//!        │
//!        ▼  filtering::ListParams::from_query   (embedded JSON, bracket folding, clamping)
//!        ▼  traits::ListResource::fetch_page    (allow-listed predicate + order, count + page)
//!        ▼  pagination::shape                   ({data, meta: {total, perPage, currentPage, lastPage}})
//! ```
//!
//! Around it sit the user, role and permission services, JWT authentication,
//! permission guards derived from `<verb>_admin_<module>` names, an audit
//! trail and a response stage rendering timestamps in a configured offset.

pub mod audit;
pub mod auth;
pub mod config;
pub mod entities;
pub mod errors;
pub mod filtering;
pub mod migration;
pub mod openapi;
pub mod pagination;
pub mod resources;
pub mod response;
pub mod routes;
pub mod seed;
pub mod services;
pub mod state;
pub mod traits;

pub use config::Config;
pub use errors::ApiError;
pub use routes::{build_app, build_router};
pub use state::AppState;
pub use traits::ListResource;
