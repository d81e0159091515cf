#[cfg(target_os = "espidf")]
mod config;

#[cfg(target_os = "espidf")]
use std::{
    fs::OpenOptions,
    io::{self, Write},
    path::Path,
    thread,
    time::Duration,
};

#[cfg(target_os = "espidf")]
use clock::{Clock, TimeSource, Uptime};
#[cfg(target_os = "espidf")]
use datalog::Logbook;
#[cfg(target_os = "espidf")]
use display::Oled;
#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    fs::fatfs::Fatfs,
    hal::{
        delay::Ets,
        gpio::{AnyIOPin, PinDriver},
        i2c::{I2cConfig, I2cDriver},
        ledc::{config::TimerConfig, LedcDriver, LedcTimerDriver, Resolution},
        peripherals::Peripherals,
        prelude::*,
        sd::{spi::SdSpiHostDriver, SdCardConfiguration, SdCardDriver},
        spi::{config::DriverConfig, Dma, SpiDriver},
    },
    io::vfs::MountedFatfs,
    log::EspLogger,
};
#[cfg(target_os = "espidf")]
use log::*;
#[cfg(target_os = "espidf")]
use sensors::{light::address, Dht11, LightTriad, Tsl2561};
#[cfg(target_os = "espidf")]
use servo::{AngleActuator, Servo};
#[cfg(target_os = "espidf")]
use tracker::{Rig, Tracker, MOUNT_POINT};

#[cfg(target_os = "espidf")]
#[no_mangle]
pub extern "C" fn __pender() {
    // Required by the embassy-time-driver feature; wake-ups are handled by
    // FreeRTOS.
}

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    // Required for ESP-IDF patches
    esp_idf_svc::sys::link_patches();
    EspLogger::initialize_default();

    let peripherals = Peripherals::take()?;
    let pins = peripherals.pins;

    // ======== SD card and configuration ========
    let spi = SpiDriver::new(
        peripherals.spi2,
        pins.gpio12, // SCK
        pins.gpio11, // MOSI
        Some(pins.gpio13), // MISO
        &DriverConfig::default().dma(Dma::Auto(4096)),
    )?;
    let card = match mount_sd_card(spi, pins.gpio10, MOUNT_POINT) {
        Ok(card) => {
            info!("SD card mounted at {}", MOUNT_POINT);
            Some(card)
        }
        Err(e) => {
            error!("SD card initialization failed: {:?}", e);
            None
        }
    };

    let config_path = Path::new(MOUNT_POINT).join("config.toml");
    let config = config::load(&config_path)?;
    config::describe(&config);

    // ======== I2C bus: light sensors, display, RTC ========
    let i2c_config = I2cConfig::new().baudrate(100_u32.kHz().into());
    let i2c = I2cDriver::new(peripherals.i2c0, pins.gpio8, pins.gpio9, &i2c_config)?;
    let bus: &'static _ = shared_bus::new_std!(I2cDriver = i2c)
        .ok_or_else(|| anyhow::anyhow!("I2C bus manager already created"))?;

    let mut lux_sensors = [
        Tsl2561::new(bus.acquire_i2c(), address::FLOAT),
        Tsl2561::new(bus.acquire_i2c(), address::LOW),
        Tsl2561::new(bus.acquire_i2c(), address::HIGH),
    ];
    for (i, sensor) in lux_sensors.iter_mut().enumerate() {
        sensor
            .init()
            .map_err(|e| anyhow::anyhow!("light sensor {} not found: {:?}", i + 1, e))?;
        info!("Light sensor {} ready at {:#04x}", i + 1, sensor.address());
    }
    let light = LightTriad::new(lux_sensors);

    let display = if config.display.enabled {
        match Oled::new(bus.acquire_i2c(), config.display.address) {
            Ok(oled) => Some(oled),
            Err(e) => {
                warn!("Continuing without display: {:?}", e);
                None
            }
        }
    } else {
        None
    };

    let clock = if config.clock.rtc {
        TimeSource::Rtc(Clock::new(bus.acquire_i2c()))
    } else {
        TimeSource::Uptime(Uptime::new())
    };

    // ======== Servo on LEDC, 50 Hz ========
    let timer = LedcTimerDriver::new(
        peripherals.ledc.timer0,
        &TimerConfig::new()
            .frequency(50.Hz().into())
            .resolution(Resolution::Bits14),
    )?;
    let pwm = LedcDriver::new(peripherals.ledc.channel0, &timer, pins.gpio18)?;
    let mut servo = Servo::new(pwm, config.servo.timing(), config.servo.range())?;
    servo.set_angle(config.servo.start_angle)?;
    info!("Servo at {} degrees", servo.angle());

    // ======== DHT11 on GPIO4 ========
    let climate = if config.climate.enabled {
        let line = PinDriver::input_output_od(pins.gpio4)?;
        match Dht11::new(line, Ets) {
            Ok(dht) => Some(dht),
            Err(e) => {
                warn!("Continuing without climate sensor: {:?}", e);
                None
            }
        }
    } else {
        None
    };

    // ======== Data log ========
    let logbook = match card.as_ref().filter(|_| config.storage.enabled) {
        Some(_) => match open_log(&config.storage.log_path()) {
            Ok(logbook) => logbook,
            Err(e) => {
                error!("Failed to open data log: {:?}", e);
                Logbook::new(Box::new(io::sink()) as Box<dyn Write>)
            }
        },
        None => Logbook::new(Box::new(io::sink()) as Box<dyn Write>),
    };

    let rig = Rig {
        light,
        servo,
        display,
        clock,
        climate,
        logbook,
    };
    let mut tracker = Tracker::new(config.tracker_settings(), rig);
    let delay = Duration::from_millis(config.tracking.update_delay_ms);

    info!("Tracking started");
    loop {
        if let Err(e) = tracker.step() {
            error!("Tracking cycle failed: {:?}", e);
        }
        thread::sleep(delay);
    }
}

/// Mounts the FAT card at `mount_point`. The returned guard unmounts on drop.
#[cfg(target_os = "espidf")]
fn mount_sd_card(
    spi: SpiDriver<'static>,
    cs: impl esp_idf_svc::hal::peripheral::Peripheral<P = impl esp_idf_svc::hal::gpio::OutputPin> + 'static,
    mount_point: &str,
) -> anyhow::Result<impl Sized> {
    let host = SdSpiHostDriver::new(
        spi,
        Some(cs),
        AnyIOPin::none(),
        AnyIOPin::none(),
        AnyIOPin::none(),
        None,
    )?;
    let card = SdCardDriver::new_spi(host, &SdCardConfiguration::new())?;
    Ok(MountedFatfs::mount(Fatfs::new_sdcard(0, card)?, mount_point, 4)?)
}

/// Appends to the log file, writing the column header only into a new or
/// empty file.
#[cfg(target_os = "espidf")]
fn open_log(path: &str) -> anyhow::Result<Logbook<Box<dyn Write>>> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let fresh = file.metadata()?.len() == 0;
    let out: Box<dyn Write> = Box::new(file);
    info!("Logging to {}", path);
    if fresh {
        Logbook::with_header(out)
    } else {
        Ok(Logbook::new(out))
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    eprintln!("light-tracker runs on ESP-IDF targets only; the libraries build and test on the host");
}
