//! Database access layer.
//!
//! This module provides the plumbing every store operation goes through:
//! - Connection pool management
//! - Positional procedure arguments
//! - Procedure invocation and row consumption
//! - Row decoding and numeric normalization
//! - Thread liveness probing

pub mod invoker;
pub mod liveness;
pub mod mapper;
pub mod params;
pub mod pool;

pub use invoker::{Partial, ProcedureInvoker, RowCursor};
pub use liveness::{LivenessProbe, LockFile, LockFileProbe};
pub use params::{ProcArg, ProcedureCall};
pub use pool::{ConnectionPoolManager, PoolPolicy};
