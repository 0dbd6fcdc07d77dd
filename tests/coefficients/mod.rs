//! Tests for lag coefficient estimation

mod stationary_mean;
