//! Session module - Explicit context, sessions and entity handles.
//!
//! A [`Context`] carries the schema, the storage and the configuration.
//! Sessions opened from it keep an identity map of live [`Entity`] values,
//! merge partial updates into them with [`Session::assign`] and write them
//! back on [`Session::flush`].

mod context;
mod entity;
mod session;


pub use context::*;
pub use entity::*;
pub use session::*;
