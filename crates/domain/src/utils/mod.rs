//! Shared helpers for the domain types

pub mod lenient;
pub mod version;

pub use version::version_tuple;
