pub mod climate;
pub mod light;

pub use climate::{ClimateReading, ClimateSource, Dht11};
pub use light::{IlluminanceSource, LightTriad, LuxSensor, Tsl2561};
