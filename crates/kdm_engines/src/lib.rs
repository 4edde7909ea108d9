#![forbid(unsafe_code)]

pub mod attributes;
pub mod endeavor;
pub mod manageable;
pub mod notes;
pub mod roster;
pub mod timeline;
