#![forbid(unsafe_code)]

pub mod config;
pub mod dom;
pub mod endeavor;
pub mod fetch;
pub mod roster;
pub mod session;
pub mod sheet;
pub mod timeline;
pub mod transport;

pub use session::{SessionContext, SubmitMode, SurvivorLookup};
