//! # Parameter Bounds
//!
//! Bounds constraints for fit parameters. A fit either runs unbounded or with
//! one [`FitBounds`] pair (lower vector, upper vector) shared by every starting
//! point; [`BoundsTransform`] maps between the optimizer's unbounded internal
//! space and the bounded external space the model sees.

pub mod bounds;

pub use bounds::{Bounds, BoundsError, BoundsTransform, FitBounds};
