//! Pure, stateless clinic logic over in-memory snapshots.

pub mod contacts;
pub mod data;
pub mod queue;
pub mod schedule;
pub mod triage;

pub use contacts::ContactSummary;
pub use queue::{derive_status, filter_patients, ContactIndex, PatientStatus, QueueRow};
