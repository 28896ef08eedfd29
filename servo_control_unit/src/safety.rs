//! Safety module root.
//!
//! Command sanitization against current, position and velocity bounds.

pub mod sanitize;
