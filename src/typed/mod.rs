//! Typed module - Operations on values that need their declared shape.
//!
//! This module provides validation against a [`Schema`](crate::schema::Schema)
//! and the [`Comparison`] view of a change set.

mod comparison;
mod validation;

pub use comparison::*;
pub use validation::*;
