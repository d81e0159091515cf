use crate::estimator::GradientVector;

/// Closed travel range of the pointing actuator, in whole degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuatorRange {
    min: i32,
    max: i32,
}

impl ActuatorRange {
    /// Bounds are stored in ascending order whichever way they are passed.
    pub fn new(a: i32, b: i32) -> Self {
        ActuatorRange {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn min(&self) -> i32 {
        self.min
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    pub fn midpoint(&self) -> i32 {
        // Lies between min and max, so the narrowing cast is exact.
        (self.min as i64 + (self.max as i64 - self.min as i64) / 2) as i32
    }

    pub fn clamp(&self, angle: i32) -> i32 {
        angle.clamp(self.min, self.max)
    }
}

impl Default for ActuatorRange {
    fn default() -> Self {
        ActuatorRange { min: 0, max: 180 }
    }
}

/// Direction of the gradient in degrees, in (-180, 180].
///
/// A zero gradient has no direction and reads as exactly 0, and so does a
/// gradient poisoned by a NaN reading.
pub fn bearing_from_gradient(gradient: GradientVector) -> f32 {
    if gradient.is_zero() {
        return 0.0;
    }
    let bearing = gradient.gy.atan2(gradient.gx).to_degrees();
    if bearing.is_nan() {
        return 0.0;
    }
    // atan2(-0.0, x < 0) lands on -180, which belongs to the other end.
    let bearing = bearing.clamp(-180.0, 180.0);
    if bearing <= -180.0 {
        180.0
    } else {
        bearing
    }
}

/// Maps a bearing in [-180, 180] linearly onto `range`, rounding to the
/// nearest degree and saturating at the ends.
///
/// Bearings outside the domain saturate too; a NaN bearing is treated as 0.
pub fn map_to_actuator(bearing: f32, range: ActuatorRange) -> i32 {
    let bearing = if bearing.is_finite() {
        bearing
    } else if bearing.is_nan() {
        0.0
    } else {
        bearing.signum() * 180.0
    };

    let lo = range.min as f64;
    let hi = range.max as f64;
    let raw = lo + (bearing as f64 + 180.0) * (hi - lo) / 360.0;
    range.clamp(raw.clamp(lo, hi).round() as i32)
}

/// Bearing of `gradient` and the actuator position that points at it.
pub fn bearing_and_actuator_position(gradient: GradientVector, range: ActuatorRange) -> (f32, i32) {
    let bearing = bearing_from_gradient(gradient);
    (bearing, map_to_actuator(bearing, range))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn zero_gradient_points_at_zero() {
        let b = bearing_from_gradient(GradientVector::ZERO);
        assert_eq!(b.to_bits(), 0.0f32.to_bits());
        let b = bearing_from_gradient(GradientVector::new(-0.0, -0.0));
        assert_eq!(b.to_bits(), 0.0f32.to_bits());
    }

    #[test]
    fn cardinal_bearings() {
        assert_relative_eq!(bearing_from_gradient(GradientVector::new(1.0, 0.0)), 0.0);
        assert_relative_eq!(bearing_from_gradient(GradientVector::new(0.0, 2.0)), 90.0, epsilon = 1e-4);
        assert_relative_eq!(bearing_from_gradient(GradientVector::new(0.0, -2.0)), -90.0, epsilon = 1e-4);
        assert_relative_eq!(bearing_from_gradient(GradientVector::new(-5.0, 0.0)), 180.0, epsilon = 1e-4);
        assert_relative_eq!(bearing_from_gradient(GradientVector::new(1.0, 1.0)), 45.0, epsilon = 1e-4);
        assert_relative_eq!(bearing_from_gradient(GradientVector::new(-1.0, -1.0)), -135.0, epsilon = 1e-4);
    }

    #[test]
    fn nan_gradient_points_at_zero() {
        assert_eq!(bearing_from_gradient(GradientVector::new(f32::NAN, 1.0)), 0.0);
    }

    #[test]
    fn negative_zero_y_folds_to_plus_180() {
        let b = bearing_from_gradient(GradientVector::new(-3.0, -0.0));
        assert_eq!(b, 180.0);
    }

    #[test]
    fn bearing_stays_in_half_open_domain() {
        let mut angle = -std::f32::consts::PI;
        while angle <= std::f32::consts::PI {
            let g = GradientVector::new(angle.cos() * 7.0, angle.sin() * 7.0);
            let b = bearing_from_gradient(g);
            assert!(b > -180.0 && b <= 180.0, "bearing {b} out of domain");
            angle += 0.01;
        }
    }

    #[test]
    fn domain_ends_hit_range_ends() {
        let range = ActuatorRange::default();
        assert_eq!(map_to_actuator(-180.0, range), 0);
        assert_eq!(map_to_actuator(180.0, range), 180);
        assert_eq!(map_to_actuator(0.0, range), 90);
        assert_eq!(map_to_actuator(90.0, range), 135);
        assert_eq!(map_to_actuator(-90.0, range), 45);
    }

    #[test]
    fn rounds_to_nearest_degree() {
        let range = ActuatorRange::default();
        // -179 -> 0.5 rounds away from zero, -178.8 -> 0.6
        assert_eq!(map_to_actuator(-179.0, range), 1);
        assert_eq!(map_to_actuator(-178.8, range), 1);
        assert_eq!(map_to_actuator(-179.4, range), 0);
        assert_eq!(map_to_actuator(1.0, range), 91);
    }

    #[test]
    fn out_of_domain_bearings_saturate() {
        let range = ActuatorRange::default();
        assert_eq!(map_to_actuator(-200.0, range), 0);
        assert_eq!(map_to_actuator(200.0, range), 180);
        assert_eq!(map_to_actuator(f32::NEG_INFINITY, range), 0);
        assert_eq!(map_to_actuator(f32::INFINITY, range), 180);
        assert_eq!(map_to_actuator(f32::NAN, range), 90);

        let narrow = ActuatorRange::new(30, 150);
        for bearing in [-1e9, -200.0, -180.0, 0.0, 180.0, 200.0, 1e9] {
            let p = map_to_actuator(bearing, narrow);
            assert!((30..=150).contains(&p));
        }
    }

    #[test]
    fn mapping_is_monotonic() {
        let range = ActuatorRange::new(10, 170);
        let mut previous = i32::MIN;
        let mut bearing = -180.0f32;
        while bearing <= 180.0 {
            let p = map_to_actuator(bearing, range);
            assert!(p >= previous, "{bearing} mapped to {p} after {previous}");
            previous = p;
            bearing += 0.25;
        }
        assert_eq!(previous, 170);
    }

    #[test]
    fn reversed_bounds_are_reordered() {
        let range = ActuatorRange::new(180, 0);
        assert_eq!(range, ActuatorRange::default());
        assert_eq!(range.midpoint(), 90);
        assert_eq!(range.clamp(-4), 0);
    }

    #[test]
    fn widest_range_does_not_overflow() {
        let range = ActuatorRange::new(i32::MIN, i32::MAX);
        assert_eq!(range.midpoint(), -1);
        assert_eq!(map_to_actuator(-180.0, range), i32::MIN);
        assert_eq!(map_to_actuator(180.0, range), i32::MAX);
        assert!((map_to_actuator(0.0, range) as i64).abs() <= 1);
        assert_eq!(map_to_actuator(f32::INFINITY, range), i32::MAX);
    }

    #[test]
    fn single_point_range() {
        let range = ActuatorRange::new(45, 45);
        assert_eq!(map_to_actuator(-180.0, range), 45);
        assert_eq!(map_to_actuator(123.0, range), 45);
    }

    #[test]
    fn combined_mapping_for_fixture_gradient() {
        let (bearing, position) =
            bearing_and_actuator_position(GradientVector::new(3.401_36, 0.0), ActuatorRange::default());
        assert_eq!(bearing, 0.0);
        assert_eq!(position, 90);

        let (bearing, position) = bearing_and_actuator_position(GradientVector::ZERO, ActuatorRange::default());
        assert_eq!((bearing, position), (0.0, 90));
    }
}
