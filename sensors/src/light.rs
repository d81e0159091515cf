use anyhow::anyhow;
use embedded_hal::i2c::I2c;
use gradient::IlluminanceSample;

/// Anything that produces one illuminance triple per tracking cycle.
pub trait IlluminanceSource {
    fn read(&mut self) -> IlluminanceSample;
}

/// A single light sensor.
pub trait LuxSensor {
    fn read_lux(&mut self) -> anyhow::Result<f32>;
}

/// Three lux sensors wired in the same order as the sensor layout.
///
/// A sensor that fails to answer is reported as 0 for that cycle; the other
/// two readings are still used.
pub struct LightTriad<L> {
    sensors: [L; 3],
}

impl<L: LuxSensor> LightTriad<L> {
    pub fn new(sensors: [L; 3]) -> Self {
        LightTriad { sensors }
    }

    pub fn sensors_mut(&mut self) -> &mut [L; 3] {
        &mut self.sensors
    }
}

impl<L: LuxSensor> IlluminanceSource for LightTriad<L> {
    fn read(&mut self) -> IlluminanceSample {
        let mut lux = [0.0; 3];
        for (i, sensor) in self.sensors.iter_mut().enumerate() {
            lux[i] = match sensor.read_lux() {
                Ok(v) => v,
                Err(e) => {
                    log::error!("Error reading light value from sensor {}: {:?}", i + 1, e);
                    0.0
                }
            };
        }
        log::debug!("Sensor readings (lux): {:.2}, {:.2}, {:.2}", lux[0], lux[1], lux[2]);
        IlluminanceSample { lux }
    }
}

/// I2C addresses selected by the ADDR pin.
pub mod address {
    pub const FLOAT: u8 = 0x39;
    pub const LOW: u8 = 0x29;
    pub const HIGH: u8 = 0x49;
}

/// Reported when either ADC channel is clipped.
pub const SATURATED_LUX: f32 = 65536.0;

const COMMAND: u8 = 0x80;
const WORD: u8 = 0x20;

const REG_CONTROL: u8 = 0x00;
const REG_TIMING: u8 = 0x01;
const REG_ID: u8 = 0x0A;
const REG_DATA0: u8 = 0x0C;
const REG_DATA1: u8 = 0x0E;

const POWER_ON: u8 = 0x03;
const POWER_OFF: u8 = 0x00;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gain {
    X1,
    X16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationTime {
    Ms13,
    Ms101,
    Ms402,
}

impl IntegrationTime {
    fn bits(self) -> u8 {
        match self {
            IntegrationTime::Ms13 => 0x00,
            IntegrationTime::Ms101 => 0x01,
            IntegrationTime::Ms402 => 0x02,
        }
    }

    /// Raw count at which the channel stops being linear.
    fn clip_threshold(self) -> u16 {
        match self {
            IntegrationTime::Ms13 => 4900,
            IntegrationTime::Ms101 => 37000,
            IntegrationTime::Ms402 => 65000,
        }
    }

    /// Factor that brings a count up to the 402 ms reference window.
    fn scale(self) -> f32 {
        match self {
            IntegrationTime::Ms13 => 322.0 / 11.0,
            IntegrationTime::Ms101 => 322.0 / 81.0,
            IntegrationTime::Ms402 => 1.0,
        }
    }
}

/// TSL2561 luminosity sensor (T/FN/CL package).
pub struct Tsl2561<I2C> {
    i2c: I2C,
    address: u8,
    gain: Gain,
    integration: IntegrationTime,
}

impl<I2C> Tsl2561<I2C>
where
    I2C: I2c,
{
    /// Defaults to 1x gain and the 13.7 ms window, suited to daylight.
    pub fn new(i2c: I2C, address: u8) -> Tsl2561<I2C> {
        Tsl2561 {
            i2c,
            address,
            gain: Gain::X1,
            integration: IntegrationTime::Ms13,
        }
    }

    pub fn with_timing(mut self, gain: Gain, integration: IntegrationTime) -> Self {
        self.gain = gain;
        self.integration = integration;
        self
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Checks the part number, powers the sensor up and applies the timing.
    pub fn init(&mut self) -> anyhow::Result<()> {
        let id = self.read_register(REG_ID)?;
        if !matches!(id >> 4, 0x0 | 0x1 | 0x4 | 0x5) {
            return Err(anyhow!(
                "device at {:#04x} is not a TSL2561 (id {:#04x})",
                self.address,
                id
            ));
        }
        self.write_register(REG_CONTROL, POWER_ON)?;
        let gain_bit = match self.gain {
            Gain::X1 => 0x00,
            Gain::X16 => 0x10,
        };
        self.write_register(REG_TIMING, gain_bit | self.integration.bits())?;
        log::info!("TSL2561 at {:#04x} initialized", self.address);
        Ok(())
    }

    pub fn power_off(&mut self) -> anyhow::Result<()> {
        self.write_register(REG_CONTROL, POWER_OFF)
    }

    /// Raw (broadband, infrared) ADC counts.
    pub fn channels(&mut self) -> anyhow::Result<(u16, u16)> {
        let broadband = self.read_word(REG_DATA0)?;
        let infrared = self.read_word(REG_DATA1)?;
        Ok((broadband, infrared))
    }

    fn read_register(&mut self, register: u8) -> anyhow::Result<u8> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(self.address, &[COMMAND | register], &mut buf)
            .map_err(|e| anyhow!("i2c read {:#04x}/{:#04x} failed: {:?}", self.address, register, e))?;
        Ok(buf[0])
    }

    fn read_word(&mut self, register: u8) -> anyhow::Result<u16> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(self.address, &[COMMAND | WORD | register], &mut buf)
            .map_err(|e| anyhow!("i2c read {:#04x}/{:#04x} failed: {:?}", self.address, register, e))?;
        Ok(u16::from_le_bytes(buf))
    }

    fn write_register(&mut self, register: u8, value: u8) -> anyhow::Result<()> {
        self.i2c
            .write(self.address, &[COMMAND | register, value])
            .map_err(|e| anyhow!("i2c write {:#04x}/{:#04x} failed: {:?}", self.address, register, e))
    }
}

impl<I2C> LuxSensor for Tsl2561<I2C>
where
    I2C: I2c,
{
    fn read_lux(&mut self) -> anyhow::Result<f32> {
        let (broadband, infrared) = self.channels()?;
        Ok(compute_lux(broadband, infrared, self.gain, self.integration))
    }
}

/// Datasheet empirical lux formula for the T/FN/CL package.
pub fn compute_lux(broadband: u16, infrared: u16, gain: Gain, integration: IntegrationTime) -> f32 {
    let clip = integration.clip_threshold();
    if broadband > clip || infrared > clip {
        return SATURATED_LUX;
    }
    if broadband == 0 {
        return 0.0;
    }

    let mut scale = integration.scale();
    if gain == Gain::X1 {
        scale *= 16.0;
    }
    let ch0 = broadband as f32 * scale;
    let ch1 = infrared as f32 * scale;
    let ratio = ch1 / ch0;

    let lux = if ratio <= 0.50 {
        0.0304 * ch0 - 0.062 * ch0 * ratio.powf(1.4)
    } else if ratio <= 0.61 {
        0.0224 * ch0 - 0.031 * ch1
    } else if ratio <= 0.80 {
        0.0128 * ch0 - 0.0153 * ch1
    } else if ratio <= 1.30 {
        0.00146 * ch0 - 0.00112 * ch1
    } else {
        0.0
    };
    lux.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use embedded_hal::i2c::{ErrorKind, ErrorType, Operation};

    struct FakeBus {
        address: u8,
        regs: [u8; 16],
        pointer: usize,
        writes: Vec<(u8, u8)>,
        fail: bool,
    }

    impl FakeBus {
        fn new(address: u8, id: u8, ch0: u16, ch1: u16) -> Self {
            let mut regs = [0u8; 16];
            regs[REG_ID as usize] = id;
            regs[0x0C..0x0E].copy_from_slice(&ch0.to_le_bytes());
            regs[0x0E..0x10].copy_from_slice(&ch1.to_le_bytes());
            FakeBus {
                address,
                regs,
                pointer: 0,
                writes: Vec::new(),
                fail: false,
            }
        }
    }

    impl ErrorType for FakeBus {
        type Error = ErrorKind;
    }

    impl I2c for FakeBus {
        fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), Self::Error> {
            if self.fail || address != self.address {
                return Err(ErrorKind::Other);
            }
            for op in operations {
                match op {
                    Operation::Write(bytes) => {
                        assert_eq!(bytes[0] & COMMAND, COMMAND, "command bit missing");
                        self.pointer = (bytes[0] & 0x0F) as usize;
                        if let Some(value) = bytes.get(1) {
                            self.writes.push((self.pointer as u8, *value));
                            self.regs[self.pointer] = *value;
                        }
                    }
                    Operation::Read(buf) => {
                        for (i, b) in buf.iter_mut().enumerate() {
                            *b = self.regs[(self.pointer + i) % 16];
                        }
                    }
                }
            }
            Ok(())
        }
    }

    struct Scripted(Vec<anyhow::Result<f32>>);

    impl LuxSensor for Scripted {
        fn read_lux(&mut self) -> anyhow::Result<f32> {
            self.0.remove(0)
        }
    }

    #[test]
    fn init_powers_on_and_sets_timing() {
        let bus = FakeBus::new(address::FLOAT, 0x50, 0, 0);
        let mut sensor = Tsl2561::new(bus, address::FLOAT).with_timing(Gain::X16, IntegrationTime::Ms402);
        sensor.init().unwrap();
        assert_eq!(sensor.i2c.writes, vec![(REG_CONTROL, POWER_ON), (REG_TIMING, 0x12)]);
    }

    #[test]
    fn power_off_clears_control_register() {
        let bus = FakeBus::new(address::FLOAT, 0x50, 0, 0);
        let mut sensor = Tsl2561::new(bus, address::FLOAT);
        sensor.init().unwrap();
        sensor.power_off().unwrap();
        assert_eq!(sensor.i2c.writes.last(), Some(&(REG_CONTROL, POWER_OFF)));
        assert_eq!(sensor.i2c.regs[REG_CONTROL as usize], POWER_OFF);
    }

    #[test]
    fn init_rejects_foreign_device() {
        let bus = FakeBus::new(address::LOW, 0xA0, 0, 0);
        let mut sensor = Tsl2561::new(bus, address::LOW);
        assert!(sensor.init().is_err());
    }

    #[test]
    fn reads_lux_from_both_channels() {
        let bus = FakeBus::new(address::HIGH, 0x50, 1000, 200);
        let mut sensor = Tsl2561::new(bus, address::HIGH).with_timing(Gain::X16, IntegrationTime::Ms402);
        assert_eq!(sensor.channels().unwrap(), (1000, 200));
        assert_relative_eq!(sensor.read_lux().unwrap(), 23.886, epsilon = 1e-2);
    }

    #[test]
    fn bus_failure_is_an_error() {
        let mut bus = FakeBus::new(address::FLOAT, 0x50, 1000, 200);
        bus.fail = true;
        let mut sensor = Tsl2561::new(bus, address::FLOAT);
        assert!(sensor.read_lux().is_err());
    }

    #[test]
    fn lux_formula_regions() {
        assert_eq!(compute_lux(0, 0, Gain::X1, IntegrationTime::Ms13), 0.0);
        assert_eq!(compute_lux(5000, 10, Gain::X1, IntegrationTime::Ms13), SATURATED_LUX);
        assert_eq!(compute_lux(100, 4901, Gain::X1, IntegrationTime::Ms13), SATURATED_LUX);
        // infrared-dominated light reads as dark
        assert_eq!(compute_lux(100, 200, Gain::X16, IntegrationTime::Ms402), 0.0);

        // ch1/ch0 = 0.7 -> 0.0128*ch0 - 0.0153*ch1
        assert_relative_eq!(
            compute_lux(1000, 700, Gain::X16, IntegrationTime::Ms402),
            12.8 - 10.71,
            epsilon = 1e-3
        );
        // 1x gain reads sixteen times brighter than 16x for the same counts
        let low = compute_lux(1000, 200, Gain::X16, IntegrationTime::Ms402);
        let high = compute_lux(1000, 200, Gain::X1, IntegrationTime::Ms402);
        assert_relative_eq!(high, low * 16.0, epsilon = 1e-2);
    }

    #[test]
    fn triad_substitutes_zero_for_failed_sensor() {
        let mut triad = LightTriad::new([
            Scripted(vec![Ok(120.0)]),
            Scripted(vec![Err(anyhow!("nack"))]),
            Scripted(vec![Ok(80.5)]),
        ]);
        let sample = triad.read();
        assert_eq!(sample.lux, [120.0, 0.0, 80.5]);
    }
}
