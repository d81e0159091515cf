use std::fs;
use std::path::Path;
use tracker::Config;

/// Reads `path` if it exists, otherwise falls back to the defaults compiled
/// into the firmware.
pub fn load(path: &Path) -> anyhow::Result<Config> {
    if path.exists() {
        let config_content = fs::read_to_string(path)?;
        let config = Config::from_toml(&config_content)?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    } else {
        let config = Config::from_toml(include_str!("../config.toml.example"))?;
        log::warn!("Using embedded default configuration");
        Ok(config)
    }
}

pub fn describe(config: &Config) {
    log::info!(
        "Device: {}, servo {}..{} deg, update every {} ms",
        config.device.name,
        config.servo.min_angle,
        config.servo.max_angle,
        config.tracking.update_delay_ms
    );
    log::info!(
        "Display: {}, climate: {}, rtc: {}, storage: {}",
        config.display.enabled,
        config.climate.enabled,
        config.clock.rtc,
        config.storage.enabled
    );
}
