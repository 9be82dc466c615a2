//! Unit tests for burst averaging and normalization

use crate::common::{MockError, assert_float_eq, create_initialized_driver};
use qmc5883::calibration::BURST_LEN;
use qmc5883::registers::{OUT_X_M, OUT_Y_M, OUT_Z_M};
use qmc5883::{AxisBounds, BurstAverage, Error, Range};

#[test]
fn test_read_raw_exact_average_of_constant_input() {
    let (mut driver, interface) = create_initialized_driver();
    driver.set_burst_average(BurstAverage::Exact);
    interface.set_axis_data(100, -50, 200);

    let raw = driver.read_raw().unwrap();

    assert_eq!(raw.x, 100.0);
    assert_eq!(raw.y, -50.0);
    assert_eq!(raw.z, 200.0);
}

#[test]
fn test_read_raw_legacy_divisor() {
    let (mut driver, interface) = create_initialized_driver();
    assert_eq!(driver.burst_average(), BurstAverage::Legacy);
    interface.set_axis_data(100, -50, 200);

    let raw = driver.read_raw().unwrap();

    // Ten samples summed, divided by the fixed legacy divisor of 9
    assert_eq!(raw.x, 1000.0 / 9.0);
    assert_eq!(raw.y, -500.0 / 9.0);
    assert_eq!(raw.z, 2000.0 / 9.0);
}

#[test]
fn test_divisor_is_independent_of_values() {
    for value in [-32768i16, -1234, -1, 0, 1, 9, 4095, 32767] {
        let (mut driver, interface) = create_initialized_driver();
        interface.set_axis_data(value, value, value);

        let legacy = driver.read_raw().unwrap();
        let expected = (f32::from(value) * 10.0) / 9.0;
        assert_float_eq(legacy.x, expected, expected.abs() * 1e-6 + 1e-6);

        driver.set_burst_average(BurstAverage::Exact);
        let exact = driver.read_raw().unwrap();
        assert_eq!(exact.x, f32::from(value));
    }
}

#[test]
fn test_burst_reads_every_axis_ten_times() {
    let (mut driver, interface) = create_initialized_driver();
    interface.set_axis_data(1, 2, 3);

    driver.read_raw().unwrap();
    assert_eq!(interface.axis_read_count(OUT_X_M), BURST_LEN);
    assert_eq!(interface.axis_read_count(OUT_Y_M), BURST_LEN);
    assert_eq!(interface.axis_read_count(OUT_Z_M), BURST_LEN);

    interface.clear_operations();
    driver.read_normalize().unwrap();
    assert_eq!(interface.axis_read_count(OUT_X_M), BURST_LEN);
    assert_eq!(interface.axis_read_count(OUT_Y_M), BURST_LEN);
    assert_eq!(interface.axis_read_count(OUT_Z_M), BURST_LEN);
}

#[test]
fn test_axes_are_big_endian_signed() {
    let (mut driver, interface) = create_initialized_driver();
    driver.set_burst_average(BurstAverage::Exact);
    interface.set_axis_data(-2, 0x0102, i16::MIN);

    let raw = driver.read_raw().unwrap();
    assert_eq!(raw.x, -2.0);
    assert_eq!(raw.y, 258.0);
    assert_eq!(raw.z, -32768.0);
}

#[test]
fn test_read_raw_seeds_calibration_from_average() {
    let (mut driver, interface) = create_initialized_driver();
    driver.set_burst_average(BurstAverage::Exact);
    assert!(!driver.calibration().is_seeded());

    // Individual samples vary, but nothing is tracked until the average seeds
    let mut sequence = Vec::new();
    for _ in 0..5 {
        sequence.push([0, -100, 50]);
        sequence.push([200, 100, 150]);
    }
    interface.set_axis_sequence(sequence);

    let raw = driver.read_raw().unwrap();
    assert_eq!(raw.x, 100.0);
    assert_eq!(raw.y, 0.0);
    assert_eq!(raw.z, 100.0);

    let bounds = driver.calibration().bounds().unwrap();
    assert_eq!(bounds.x, AxisBounds { min: 100.0, max: 100.0 });
    assert_eq!(bounds.y, AxisBounds { min: 0.0, max: 0.0 });
    assert_eq!(bounds.z, AxisBounds { min: 100.0, max: 100.0 });
}

#[test]
fn test_read_raw_expands_with_every_sample_once_seeded() {
    let (mut driver, interface) = create_initialized_driver();
    driver.set_burst_average(BurstAverage::Exact);

    interface.set_axis_data(10, 10, 10);
    driver.read_raw().unwrap();

    interface.set_axis_sequence(vec![[-20, 10, 10], [30, 10, 10], [10, 5, 40]]);
    driver.read_raw().unwrap();

    let bounds = driver.calibration().bounds().unwrap();
    assert_eq!(bounds.x, AxisBounds { min: -20.0, max: 30.0 });
    assert_eq!(bounds.y, AxisBounds { min: 5.0, max: 10.0 });
    assert_eq!(bounds.z, AxisBounds { min: 10.0, max: 40.0 });
}

#[test]
fn test_read_normalize_first_call_zero_span() {
    let (mut driver, interface) = create_initialized_driver();
    driver.set_range(Range::Ga2).unwrap();
    interface.set_axis_data(100, -50, 200);

    let norm = driver.read_normalize().unwrap();

    // min == max after seeding, so every axis lands on the output midpoint
    assert_eq!(norm.x, 0.0);
    assert_eq!(norm.y, 0.0);
    assert_eq!(norm.z, 0.0);
    assert!(!norm.x.is_nan() && !norm.y.is_nan() && !norm.z.is_nan());
}

#[test]
fn test_read_normalize_uses_range_scale_factor() {
    let (mut driver, interface) = create_initialized_driver();
    driver.set_burst_average(BurstAverage::Exact);
    driver.set_range(Range::Ga2).unwrap();
    interface.set_axis_data(100, -50, 200);

    driver.read_normalize().unwrap();
    let bounds = driver.calibration().bounds().unwrap();
    assert_float_eq(bounds.x.min, 122.0, 1e-2);
    assert_float_eq(bounds.y.min, -61.0, 1e-2);
    assert_float_eq(bounds.z.min, 244.0, 1e-2);

    driver.reset_calibration();
    driver.set_range(Range::Ga8).unwrap();
    driver.read_normalize().unwrap();
    let bounds = driver.calibration().bounds().unwrap();
    assert_float_eq(bounds.x.min, 435.0, 1e-2);
    assert_float_eq(bounds.y.min, -217.5, 1e-2);
    assert_float_eq(bounds.z.min, 870.0, 1e-2);
}

#[test]
fn test_read_normalize_legacy_seed_value() {
    let (mut driver, interface) = create_initialized_driver();
    driver.set_range(Range::Ga2).unwrap();
    interface.set_axis_data(100, 0, 0);

    driver.read_normalize().unwrap();
    let bounds = driver.calibration().bounds().unwrap();
    assert_float_eq(bounds.x.max, 1220.0 / 9.0, 1e-2);
}

#[test]
fn test_read_normalize_maps_into_tracked_range() {
    let (mut driver, interface) = create_initialized_driver();
    driver.set_burst_average(BurstAverage::Exact);
    driver.set_range(Range::Ga2).unwrap();

    interface.set_axis_data(100, 100, 100);
    driver.read_normalize().unwrap();

    interface.set_axis_data(200, 200, 200);
    let top = driver.read_normalize().unwrap();
    assert_float_eq(top.x, 360.0, 1e-2);

    interface.set_axis_data(150, 150, 150);
    let mid = driver.read_normalize().unwrap();
    assert_float_eq(mid.x, 0.0, 1e-2);

    interface.set_axis_data(100, 100, 100);
    let bottom = driver.read_normalize().unwrap();
    assert_float_eq(bottom.x, -360.0, 1e-2);
}

#[test]
fn test_read_normalize_does_not_expand_per_sample() {
    let (mut driver, interface) = create_initialized_driver();
    driver.set_burst_average(BurstAverage::Exact);
    driver.set_range(Range::Ga2).unwrap();

    interface.set_axis_data(0, 0, 0);
    driver.read_normalize().unwrap();

    // Samples straddle the seed but average back onto it
    let mut sequence = Vec::new();
    for _ in 0..5 {
        sequence.push([-100, -100, -100]);
        sequence.push([100, 100, 100]);
    }
    interface.set_axis_sequence(sequence);
    let norm = driver.read_normalize().unwrap();

    let bounds = driver.calibration().bounds().unwrap();
    assert_eq!(bounds.x, AxisBounds { min: 0.0, max: 0.0 });
    assert_eq!(norm.x, 0.0);
}

#[test]
fn test_normalized_output_stays_in_range() {
    let (mut driver, interface) = create_initialized_driver();
    driver.set_burst_average(BurstAverage::Exact);

    for value in [0i16, 500, -500, 250, 1000, -1000, 42] {
        interface.set_axis_data(value, -value, value / 2);
        let norm = driver.read_normalize().unwrap();
        for axis in [norm.x, norm.y, norm.z] {
            assert!(
                (-360.0 - 1e-3..=360.0 + 1e-3).contains(&axis),
                "normalized value {axis} out of range"
            );
        }
    }
}

#[test]
fn test_failed_burst_leaves_calibration_unseeded() {
    let (mut driver, interface) = create_initialized_driver();
    interface.set_axis_data(1, 2, 3);

    // Fail part-way through the burst
    interface.fail_read_after(7);
    let result = driver.read_raw();
    assert!(matches!(result, Err(Error::Bus(MockError::Communication))));
    assert!(!driver.calibration().is_seeded());

    interface.fail_next_read();
    assert!(driver.read_normalize().is_err());
    assert!(!driver.calibration().is_seeded());

    assert!(driver.read_raw().is_ok());
    assert!(driver.calibration().is_seeded());
}

#[test]
fn test_reset_calibration_reseeds() {
    let (mut driver, interface) = create_initialized_driver();
    driver.set_burst_average(BurstAverage::Exact);

    interface.set_axis_data(10, 10, 10);
    driver.read_raw().unwrap();
    interface.set_axis_data(50, 50, 50);
    driver.read_raw().unwrap();
    assert_eq!(driver.calibration().bounds().unwrap().x.max, 50.0);

    driver.reset_calibration();
    interface.set_axis_data(-5, -5, -5);
    driver.read_raw().unwrap();
    let bounds = driver.calibration().bounds().unwrap();
    assert_eq!(bounds.x, AxisBounds { min: -5.0, max: -5.0 });
}
