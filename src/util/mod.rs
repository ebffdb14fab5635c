//! File and display helpers.

pub mod atomic;
pub mod diff;
