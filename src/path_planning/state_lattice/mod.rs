//! State lattice
//!
//! Discretizes the road ahead into stations (along the lane) and latitudes
//! (across it). Every node is a candidate goal pose following the lane
//! heading, with curvature corrected for its lateral offset.

pub mod lattice;

pub use lattice::{offset_curvature, Connectivity, Lattice, LatticeConfig, LatticeNode};
