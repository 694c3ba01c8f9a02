//! Backend Handler capability interface (spec §4.6): the generic
//! record/change-set schema, the `BackendHandler` trait every concrete
//! SDK adapter implements, a registry keyed by provider identity, and the
//! one adapter this core ships — an in-memory mock.

pub mod handler;
pub mod mock;
pub mod record;

pub use handler::{BackendError, BackendHandler, BackendRegistry};
pub use mock::MockBackend;
pub use record::{ApplyError, ChangeOp, ChangeOutcome, ChangeSet, Record, RecordKey, RecordType, RecordValue};
