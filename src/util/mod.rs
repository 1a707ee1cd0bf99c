//! Utility modules: bounded waits.

pub mod timeout;
