#![forbid(unsafe_code)]

pub mod common;
pub mod event_log;
pub mod identity;
pub mod mutation;
pub mod settlement;
pub mod survivor;
pub mod timeline;

pub use common::{ContractViolation, LanternYear, ObjectId, Validate};
