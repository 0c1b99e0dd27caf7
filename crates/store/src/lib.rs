//! Durable state for forumbot.
//!
//! Each namespace is one UTF-8 JSON file, atomically replaced on every write
//! (`kv`). On top of that sit the two domain stores: the user registry
//! (`users`) and the per-user dialog namespace holding survey state, draft
//! answers, and the pending prompt message reference (`dialogs`). Completed
//! surveys are appended to a CSV tabular log (`feedback_log`).
//!
//! Consistency is process-local: saves within one process are serialized per
//! namespace, and an advisory file lock is taken during writes where the
//! platform supports one. Two separate processes doing load-mutate-save on
//! the same namespace can still race last-writer-wins; strong cross-process
//! consistency is an explicit non-goal.

pub mod dialogs;
pub mod feedback_log;
pub mod kv;
pub mod users;

pub use dialogs::DialogStore;
pub use feedback_log::CsvFeedbackLog;
pub use kv::{JsonStore, StoreError};
pub use users::{UserRecord, UserRegistry};
