//! CLI command implementations

pub mod cache;
pub mod inspect;
pub mod run;
