//! Spiral path solver
//!
//! Connects two oriented, curvature-tagged poses with a path whose curvature
//! is a polynomial in arc length: cubic for lattice-to-lattice edges,
//! quintic when the start curvature derivatives must be matched as well.

pub mod path;
pub mod polynomial;
pub mod quadrature;
pub mod solver;

pub use path::{PathSample, SpiralPath};
pub use polynomial::{BoundaryConditions, SpiralKind, SpiralParams};
pub use solver::{initial_guess, SpiralSolver};
