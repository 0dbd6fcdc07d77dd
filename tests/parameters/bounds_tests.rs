//! Tests for bounds used by bounded fits

use mre_rs::parameters::{Bounds, BoundsError, BoundsTransform, FitBounds};
use mre_rs::{FitFunction, MreError};
use ndarray::array;
use std::f64::{INFINITY, NEG_INFINITY};

#[test]
fn test_bounds_transform_round_trips() {
    // For unbounded parameters, internal and external values should be the same
    let unbounded = BoundsTransform::new(Bounds::unbounded());
    assert_eq!(unbounded.to_internal(10.0).unwrap(), 10.0);
    assert_eq!(unbounded.to_external(15.0), 15.0);

    for bounds in [
        Bounds::new(5.0, INFINITY).unwrap(),
        Bounds::new(NEG_INFINITY, 15.0).unwrap(),
        Bounds::new(0.0, 20.0).unwrap(),
    ] {
        let transform = BoundsTransform::new(bounds);
        let internal = transform.to_internal(10.0).unwrap();
        assert_ne!(internal, 10.0);
        assert!((transform.to_external(internal) - 10.0).abs() < 1e-10);
    }

    let transform = BoundsTransform::new(Bounds::new(0.0, 20.0).unwrap());
    for &value in &[0.0, 1.0, 5.0, 10.0, 15.0, 19.0, 20.0] {
        let internal = transform.to_internal(value).unwrap();
        assert!((transform.to_external(internal) - value).abs() < 1e-10);
    }
}

#[test]
fn test_any_internal_value_maps_inside() {
    let transform = BoundsTransform::new(Bounds::new(0.002, 0.05).unwrap());
    for i in -50..=50 {
        let external = transform.to_external(i as f64 * 0.37);
        assert!((0.002..=0.05).contains(&external));
    }

    let lower = BoundsTransform::new(Bounds::new(5.0, INFINITY).unwrap());
    for i in -50..=50 {
        assert!(lower.to_external(i as f64 * 3.1) >= 5.0);
    }
}

#[test]
fn test_fit_bounds_layouts() {
    let from_rows = FitBounds::from_rows(&array![[5.0, 0.0], [5000.0, 1.0]]).unwrap();
    let from_pairs = FitBounds::from_pairs(&[(5.0, 5000.0), (0.0, 1.0)]).unwrap();
    assert_eq!(from_rows, from_pairs);
    assert_eq!(from_rows.len(), 2);
    assert_eq!(from_rows.get(1), Some(Bounds { min: 0.0, max: 1.0 }));
    assert_eq!(from_rows.get(2), None);

    assert!(matches!(
        FitBounds::from_rows(&array![[0.0, 1.0]]),
        Err(BoundsError::InvalidLayout { rows: 1, cols: 2 })
    ));
    assert!(matches!(
        FitBounds::from_pairs(&[(1.0, 0.0)]),
        Err(BoundsError::InvalidBounds { .. })
    ));
    assert!(matches!(
        FitBounds::new(array![0.0, 0.0], array![1.0]),
        Err(BoundsError::LengthMismatch { lower: 2, upper: 1 })
    ));
}

#[test]
fn test_check_against_complex_defaults() {
    let bounds = FitFunction::Complex.default_fitbnds().unwrap();
    let grid = FitFunction::Complex.default_fitpars().unwrap();
    for row in grid.outer_iter() {
        assert!(bounds.check(row).is_ok());
    }

    let mut outside = grid.row(0).to_owned();
    outside[6] = 0.5;
    let err: MreError = bounds.check(outside.view()).unwrap_err().into();
    assert!(matches!(err, MreError::Bounds(BoundsError::ValueOutsideBounds { .. })));
}
