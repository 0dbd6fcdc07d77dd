//! Tests for the uncertainty of fitted parameters

mod covariance_tests;
