//! Gridflow Core -- shared identifiers and deterministic arithmetic.
//!
//! Every other gridflow crate builds on the types defined here:
//!
//! - [`id`] -- slotmap keys for grid entities and newtype ids for networks,
//!   resource grades and catalog building kinds.
//! - [`fixed`] -- Q32.32 fixed-point quantities used for capacities, rates,
//!   buffers and stored volume, plus the f64 boundary conversions.

pub mod fixed;
pub mod id;
