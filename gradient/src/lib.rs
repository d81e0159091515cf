// Light-field math for the tracker: planar gradient estimation from three
// point sensors, and the bearing/actuator mapping that turns it into a servo
// command. Everything here is a pure function of its arguments.

pub mod bearing;
pub mod estimator;

pub use bearing::{bearing_and_actuator_position, bearing_from_gradient, map_to_actuator, ActuatorRange};
pub use estimator::{
    estimate_gradient, GradientVector, IlluminanceSample, SensorLayout, SensorPosition,
    DEGENERATE_EPSILON,
};
