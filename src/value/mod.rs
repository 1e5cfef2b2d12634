//! Value module - In-memory representation of structured documents.
//!
//! [`Value`] is what gets stored; [`Patch`] is what callers hand to a merge.

mod patch;
mod value;

pub use patch::*;
pub use value::*;
