//! Audit trail for administrative mutations.
//!
//! ```text
//! request ─► audit layer ─► handler
//!              │ before snapshot (path id)
//!              │ after snapshot (response JSON)
//!              └─► tokio::spawn(AuditSink::log) ─► audit_logs
//! ```
//!
//! Logging never delays or fails the response; sink errors are only traced.

pub mod layer;
pub mod sink;

pub use layer::record;
pub use sink::{AuditEntry, AuditModule, AuditSink, DbAuditSink, MemoryAuditSink};
