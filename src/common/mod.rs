//! Common types, traits, and error definitions for lattice_planner
//!
//! This module provides the foundational building blocks shared by the
//! planning pipeline and the tracking controllers.

pub mod types;
pub mod traits;
pub mod error;
pub mod trajectory;

pub use types::*;
pub use traits::*;
pub use error::*;
pub use trajectory::*;
