// Configuration file sections. Every section has defaults matching the
// reference board, so a config file only needs the values it changes.

use gradient::{ActuatorRange, SensorLayout};
use serde::{Deserialize, Serialize};
use servo::PulseTiming;

/// Where the SD card is mounted. The config file and the data log both live
/// on the card, so the mount point cannot come from the config itself.
pub const MOUNT_POINT: &str = "/sdcard";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub geometry: SensorLayout,
    pub servo: ServoConfig,
    pub tracking: TrackingConfig,
    pub display: DisplayConfig,
    pub storage: StorageConfig,
    pub clock: ClockConfig,
    pub climate: ClimateConfig,
}

impl Config {
    pub fn from_toml(text: &str) -> anyhow::Result<Config> {
        Ok(toml::from_str(text)?)
    }

    pub fn tracker_settings(&self) -> TrackerSettings {
        TrackerSettings {
            layout: self.geometry,
            range: self.servo.range(),
            normalize_gradient: self.tracking.normalize_gradient,
            climate_every: climate_every(self.climate.min_interval_ms, self.tracking.update_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub name: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            name: "light-tracker".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServoConfig {
    pub min_angle: i32,
    pub max_angle: i32,
    pub start_angle: i32,
    pub min_pulse_us: u32,
    pub max_pulse_us: u32,
    pub period_us: u32,
}

impl Default for ServoConfig {
    fn default() -> Self {
        let timing = PulseTiming::default();
        ServoConfig {
            min_angle: 0,
            max_angle: 180,
            start_angle: 90,
            min_pulse_us: timing.min_pulse_us,
            max_pulse_us: timing.max_pulse_us,
            period_us: timing.period_us,
        }
    }
}

impl ServoConfig {
    pub fn range(&self) -> ActuatorRange {
        ActuatorRange::new(self.min_angle, self.max_angle)
    }

    pub fn timing(&self) -> PulseTiming {
        PulseTiming {
            min_pulse_us: self.min_pulse_us,
            max_pulse_us: self.max_pulse_us,
            period_us: self.period_us,
            ..PulseTiming::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub update_delay_ms: u64,
    /// Scale the gradient to unit length before mapping. Direction, and so
    /// the servo command, is unchanged.
    pub normalize_gradient: bool,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        TrackingConfig {
            update_delay_ms: 500,
            normalize_gradient: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub enabled: bool,
    pub address: u8,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            enabled: true,
            address: 0x3C,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub enabled: bool,
    pub file_name: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            enabled: true,
            file_name: "track.csv".into(),
        }
    }
}

impl StorageConfig {
    pub fn log_path(&self) -> String {
        format!("{}/{}", MOUNT_POINT, self.file_name.trim_start_matches('/'))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    pub rtc: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClimateConfig {
    pub enabled: bool,
    /// The DHT11 needs at least a second between conversions.
    pub min_interval_ms: u64,
}

impl Default for ClimateConfig {
    fn default() -> Self {
        ClimateConfig {
            enabled: false,
            min_interval_ms: 2000,
        }
    }
}

/// Cycles between climate reads so that reads are at least
/// `min_interval_ms` apart.
fn climate_every(min_interval_ms: u64, update_delay_ms: u64) -> u32 {
    if update_delay_ms == 0 {
        return 1;
    }
    min_interval_ms.div_ceil(update_delay_ms).clamp(1, u32::MAX as u64) as u32
}

/// The part of the configuration the control cycle needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerSettings {
    pub layout: SensorLayout,
    pub range: ActuatorRange,
    pub normalize_gradient: bool,
    /// Read the climate sensor on every n-th cycle and reuse the last reading
    /// in between.
    pub climate_every: u32,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Config::default().tracker_settings()
    }
}
