use serde::{Deserialize, Serialize};

/// Determinants smaller than this (in cm^2) mean the sensor triangle has
/// collapsed onto a line or a point.
pub const DEGENERATE_EPSILON: f32 = 1e-4;

/// Position of one light sensor in centimeters, relative to the mast center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorPosition {
    pub x: f32,
    pub y: f32,
}

impl SensorPosition {
    pub const fn new(x: f32, y: f32) -> Self {
        SensorPosition { x, y }
    }
}

/// The three fixed sensor positions, in the same order as the readings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorLayout {
    pub sensors: [SensorPosition; 3],
}

impl SensorLayout {
    pub const fn new(sensors: [SensorPosition; 3]) -> Self {
        SensorLayout { sensors }
    }

    /// x1(y2-y3) + x2(y3-y1) + x3(y1-y2), twice the signed triangle area.
    pub fn determinant(&self) -> f32 {
        let [p1, p2, p3] = self.sensors;
        p1.x * (p2.y - p3.y) + p2.x * (p3.y - p1.y) + p3.x * (p1.y - p2.y)
    }

    pub fn is_degenerate(&self) -> bool {
        self.determinant().abs() < DEGENERATE_EPSILON
    }
}

impl Default for SensorLayout {
    /// Right, top-left and bottom-left corners of the sensor board.
    fn default() -> Self {
        SensorLayout::new([
            SensorPosition::new(5.0, 1.0),
            SensorPosition::new(-9.7, 5.0),
            SensorPosition::new(-9.7, -4.5),
        ])
    }
}

/// One reading per sensor, taken in the same cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IlluminanceSample {
    pub lux: [f32; 3],
}

impl IlluminanceSample {
    pub const fn new(lux1: f32, lux2: f32, lux3: f32) -> Self {
        IlluminanceSample {
            lux: [lux1, lux2, lux3],
        }
    }

    pub fn average(&self) -> f32 {
        (self.lux[0] + self.lux[1] + self.lux[2]) / 3.0
    }
}

/// Spatial rate of change of illuminance, in lux per centimeter.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GradientVector {
    pub gx: f32,
    pub gy: f32,
}

impl GradientVector {
    pub const ZERO: GradientVector = GradientVector { gx: 0.0, gy: 0.0 };

    pub const fn new(gx: f32, gy: f32) -> Self {
        GradientVector { gx, gy }
    }

    pub fn magnitude(&self) -> f32 {
        self.gx.hypot(self.gy)
    }

    pub fn is_zero(&self) -> bool {
        self.gx == 0.0 && self.gy == 0.0
    }

    /// Unit vector in the same direction. A zero vector stays zero.
    pub fn normalized(self) -> GradientVector {
        let magnitude = self.magnitude();
        if magnitude > 0.0 {
            GradientVector::new(self.gx / magnitude, self.gy / magnitude)
        } else {
            GradientVector::ZERO
        }
    }
}

/// Fits the plane `lux = a*x + b*y + c` through the three readings and
/// returns `(a, b)`.
///
/// Three points determine the plane exactly, so this is Cramer's rule on the
/// 3x3 system rather than an iterative fit. A degenerate layout returns
/// [`GradientVector::ZERO`] whatever the readings are.
pub fn estimate_gradient(sample: &IlluminanceSample, layout: &SensorLayout) -> GradientVector {
    let denominator = layout.determinant();
    if denominator.abs() < DEGENERATE_EPSILON {
        return GradientVector::ZERO;
    }

    let [p1, p2, p3] = layout.sensors;
    let [lux1, lux2, lux3] = sample.lux;

    let gx = (lux1 * (p2.y - p3.y) + lux2 * (p3.y - p1.y) + lux3 * (p1.y - p2.y)) / denominator;
    let gy = (lux1 * (p3.x - p2.x) + lux2 * (p1.x - p3.x) + lux3 * (p2.x - p1.x)) / denominator;

    GradientVector::new(gx, gy)
}
