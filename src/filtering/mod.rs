//! List query pipeline: raw query mapping → [`ListParams`] → storage predicates.
//!
//! ```text
//! raw query ─► embedded JSON merge ─► bracket folding ─► ListParams
//!                                                          │
//!            predicate + order (per resource) ◄────────────┘
//! ```

pub mod brackets;
pub mod conditions;
pub mod embedded;
pub mod parse;
pub mod query;
pub mod sort;

pub use embedded::{MergeOptions, OnError};
pub use query::{FilterValue, Filters, ListParams, QueryOptions, Scalar, SortDir};
