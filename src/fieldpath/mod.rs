//! Field path module - Addresses values inside nested documents.
//!
//! A [`Path`] names one location (`.instructions.cooking.Oven`), and a
//! [`Set`] collects the locations a merge or a flush touched.

mod path;
mod set;

pub use path::*;
pub use set::*;
