//! Tests for fitting decay models to lag coefficients

mod complex;
mod exponential;
mod multistart;
