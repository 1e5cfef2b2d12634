//! Tracker module - Pending changes per entity between flushes.

mod change_tracker;

pub use change_tracker::*;
