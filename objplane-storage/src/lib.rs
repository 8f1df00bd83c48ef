//! Host capabilities consumed by the objplane engine.
//!
//! The engine never touches the host's database directly. Everything it needs
//! is expressed as a small set of traits the host implements:
//!
//! - [`RecordStore`]: resolve entity kinds, read and write entries
//! - [`Transactional`]: begin/commit/rollback one unit of work
//! - [`Authorizer`]: answer "may this principal do X at level L?"
//! - [`AuditSink`]: accept finalized [`OperationLog`] records
//!
//! `MemoryStore`, `MemoryAuthorizer` and the two audit sinks are complete
//! in-process implementations, used by tests and by hosts that embed the
//! engine without a database.

mod audit;
mod authorizer;
mod error;
mod memory;
mod store;

pub use audit::{AuditSink, AuditStatus, MemoryAuditSink, OperationLog, TracingAuditSink};
pub use authorizer::{Authorizer, MemoryAuthorizer};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use store::{RecordStore, Transactional};
