//! Database query modules.

pub mod pictures;
