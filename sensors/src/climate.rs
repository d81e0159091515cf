use anyhow::anyhow;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateReading {
    /// Degrees celsius.
    pub temperature: f32,
    /// Relative humidity, percent.
    pub humidity: f32,
}

pub trait ClimateSource {
    fn read_climate(&mut self) -> anyhow::Result<ClimateReading>;
}

// Per-edge timeouts in microseconds. The longest legal phase is the 80 us
// response handshake.
const HANDSHAKE_TIMEOUT_US: u32 = 100;
const BIT_TIMEOUT_US: u32 = 90;
const BIT_SAMPLE_DELAY_US: u32 = 30;

/// DHT11 on a single open-drain data line.
pub struct Dht11<P, D> {
    pin: P,
    delay: D,
}

impl<P, D> Dht11<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    /// The line must idle high; the pin is released immediately.
    pub fn new(mut pin: P, delay: D) -> anyhow::Result<Self> {
        pin.set_high()
            .map_err(|e| anyhow!("dht11 pin release failed: {:?}", e))?;
        Ok(Dht11 { pin, delay })
    }

    fn read_frame(&mut self) -> anyhow::Result<[u8; 5]> {
        // Start signal: hold low for at least 18 ms, then release.
        self.pin
            .set_low()
            .map_err(|e| anyhow!("dht11 start pulse failed: {:?}", e))?;
        self.delay.delay_ms(20);
        self.pin
            .set_high()
            .map_err(|e| anyhow!("dht11 pin release failed: {:?}", e))?;

        self.wait_for(false, HANDSHAKE_TIMEOUT_US)?;
        self.wait_for(true, HANDSHAKE_TIMEOUT_US)?;
        self.wait_for(false, HANDSHAKE_TIMEOUT_US)?;

        let mut frame = [0u8; 5];
        for bit in 0..40 {
            self.wait_for(true, BIT_TIMEOUT_US)?;
            self.delay.delay_us(BIT_SAMPLE_DELAY_US);
            if self.level()? {
                frame[bit / 8] |= 0x80 >> (bit % 8);
                self.wait_for(false, BIT_TIMEOUT_US)?;
            }
        }
        Ok(frame)
    }

    fn level(&mut self) -> anyhow::Result<bool> {
        self.pin
            .is_high()
            .map_err(|e| anyhow!("dht11 pin read failed: {:?}", e))
    }

    fn wait_for(&mut self, high: bool, timeout_us: u32) -> anyhow::Result<()> {
        for _ in 0..timeout_us {
            if self.level()? == high {
                return Ok(());
            }
            self.delay.delay_us(1);
        }
        Err(anyhow!(
            "dht11 timed out waiting for line {}",
            if high { "high" } else { "low" }
        ))
    }
}

impl<P, D> ClimateSource for Dht11<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    fn read_climate(&mut self) -> anyhow::Result<ClimateReading> {
        let frame = self.read_frame()?;
        decode_frame(frame)
    }
}

/// Humidity integer/decimal, temperature integer/decimal, checksum.
pub fn decode_frame(frame: [u8; 5]) -> anyhow::Result<ClimateReading> {
    let sum = frame[..4].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    if sum != frame[4] {
        return Err(anyhow!(
            "dht11 checksum mismatch: computed {:#04x}, received {:#04x}",
            sum,
            frame[4]
        ));
    }

    let humidity = frame[0] as f32 + frame[1] as f32 / 10.0;
    let magnitude = frame[2] as f32 + (frame[3] & 0x7F) as f32 / 10.0;
    let temperature = if frame[3] & 0x80 != 0 { -magnitude } else { magnitude };
    Ok(ClimateReading {
        temperature,
        humidity,
    })
}
