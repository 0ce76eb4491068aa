//! Sync adapter between the store and the remote to-do collection.
//!
//! - [`writes`]: the reducer issuing one remote write per to-do request
//! - [`feed`]: the change feed subscription dispatching `SetAll`

pub mod feed;
pub mod writes;

pub use feed::{decode_document, decode_snapshot, SyncAdapter, SyncSubscription};
pub use writes::{new_todo_fields, SyncReducer, COMPLETED_FIELD, TEXT_FIELD};
