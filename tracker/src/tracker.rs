use clock::{Stamp, Timestamp};
use datalog::{Logbook, Record};
use display::{Status, StatusDisplay};
use gradient::{bearing_and_actuator_position, estimate_gradient, GradientVector, IlluminanceSample};
use sensors::{ClimateReading, ClimateSource, IlluminanceSource};
use servo::AngleActuator;
use std::io::Write;

use crate::settings::TrackerSettings;

/// The hardware one tracker drives.
pub struct Rig<S, A, D, T, C, W> {
    pub light: S,
    pub servo: A,
    pub display: D,
    pub clock: T,
    pub climate: Option<C>,
    pub logbook: Logbook<W>,
}

/// Everything measured and decided in one control cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cycle {
    pub stamp: Stamp,
    pub sample: IlluminanceSample,
    pub gradient: GradientVector,
    pub bearing: f32,
    pub position: i32,
    pub average_lux: f32,
    pub climate: Option<ClimateReading>,
}

pub struct Tracker<S, A, D, T, C, W> {
    settings: TrackerSettings,
    rig: Rig<S, A, D, T, C, W>,
    cycles: u64,
    last_climate: Option<ClimateReading>,
}

impl<S, A, D, T, C, W> Tracker<S, A, D, T, C, W>
where
    S: IlluminanceSource,
    A: AngleActuator,
    D: StatusDisplay,
    T: Timestamp,
    C: ClimateSource,
    W: Write,
{
    pub fn new(settings: TrackerSettings, rig: Rig<S, A, D, T, C, W>) -> Self {
        if settings.layout.is_degenerate() {
            log::warn!(
                "Sensor layout is degenerate (determinant {}), servo will hold the center",
                settings.layout.determinant()
            );
        }
        Tracker {
            settings,
            rig,
            cycles: 0,
            last_climate: None,
        }
    }

    /// Runs one cycle: sample, estimate, aim the servo, then report.
    ///
    /// Only a servo failure aborts the cycle. Climate, display and log
    /// failures are logged and the cycle carries on without them.
    pub fn step(&mut self) -> anyhow::Result<Cycle> {
        let stamp = self.rig.clock.now();
        let sample = self.rig.light.read();
        log::debug!(
            "Lux: {:.2}, {:.2}, {:.2}",
            sample.lux[0],
            sample.lux[1],
            sample.lux[2]
        );

        let mut gradient = estimate_gradient(&sample, &self.settings.layout);
        if self.settings.normalize_gradient {
            gradient = gradient.normalized();
        }
        let (bearing, position) = bearing_and_actuator_position(gradient, self.settings.range);

        self.rig.servo.set_angle(position)?;
        log::info!("Gradient direction: {:.1} degrees", bearing);

        let climate = self.climate();

        let cycle = Cycle {
            stamp,
            sample,
            gradient,
            bearing,
            position,
            average_lux: sample.average(),
            climate,
        };

        let status = Status {
            bearing,
            average_lux: cycle.average_lux,
            climate,
        };
        if let Err(e) = self.rig.display.show(&status) {
            log::warn!("Display update failed: {:?}", e);
        }

        let record = Record {
            stamp,
            sample,
            bearing,
            position,
            climate,
        };
        if let Err(e) = self.rig.logbook.append(&record) {
            log::warn!("Failed to log data: {:?}", e);
        }

        Ok(cycle)
    }

    /// Reads the climate sensor when due, otherwise repeats the last reading.
    fn climate(&mut self) -> Option<ClimateReading> {
        let due = self.cycles % self.settings.climate_every.max(1) as u64 == 0;
        self.cycles += 1;
        let sensor = self.rig.climate.as_mut()?;
        if due {
            self.last_climate = match sensor.read_climate() {
                Ok(reading) => Some(reading),
                Err(e) => {
                    log::warn!("Climate reading failed: {:?}", e);
                    None
                }
            };
        }
        self.last_climate
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    pub fn rig(&self) -> &Rig<S, A, D, T, C, W> {
        &self.rig
    }

    pub fn rig_mut(&mut self) -> &mut Rig<S, A, D, T, C, W> {
        &mut self.rig
    }

    pub fn into_rig(self) -> Rig<S, A, D, T, C, W> {
        self.rig
    }
}
