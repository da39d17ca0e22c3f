//! # Cluster Control
//!
//! Facade over the external cluster control service, the per-key session
//! cache it dispatches through, and an in-memory platform implementation.

pub mod facade;
pub mod memory;
pub mod service;
pub mod session;

pub use facade::{shared_stream_name, ClusterControlFacade};
pub use memory::{CallPhase, InMemoryClusterService, InMemorySession, RecordedCall};
pub use service::{ClusterSession, SessionFactory};
pub use session::{ServiceSessionKey, SessionBootstrap, SessionCache};
